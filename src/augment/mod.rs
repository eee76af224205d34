pub use augment::Augment;
pub use object::{Container, IP, Object, Pod, Port, Service, ServicePort};

mod augment;
mod object;
