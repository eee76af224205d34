pub use config::Config;
pub use indicator::{Flows, Indicator};
pub use manager::Manager;
pub use sink::{Log, Sink};

mod config;
mod indicator;
mod manager;
mod sink;

#[cfg(test)]
mod test;
