pub use collect::{listen, serve, Request};

mod collect;
