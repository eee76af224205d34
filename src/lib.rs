pub mod args;
pub mod augment;
pub mod collect;
pub mod conn;
pub mod host;
pub mod manager;
pub mod resolve;
