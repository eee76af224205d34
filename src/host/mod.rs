pub use host::Host;

mod host;
