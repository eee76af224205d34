pub use conn::{Connection, Endpoint, Protocol};
pub use record::{Info, Record, Role};
pub use timestamp::{Micros, Timestamp};

mod conn;
mod record;
mod timestamp;
