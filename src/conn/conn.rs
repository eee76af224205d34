use std::fmt;
use std::net::{IpAddr, SocketAddr};
use serde::{Serialize, Deserialize};

#[derive(Copy, Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Protocol {
    ICMP,
    TCP,
    UDP,
    Other(u16),
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct Endpoint {
    pub addr:  IpAddr,
    pub port:  u16,
    pub proto: Protocol,
}

/// A socket pair as observed by one collector: the local side is the
/// client container, the remote side is the numeric destination.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Connection {
    pub src:       IpAddr,
    pub container: String,
    pub dst:       Endpoint,
}

impl Endpoint {
    pub fn new(sa: SocketAddr, proto: Protocol) -> Self {
        Self {
            addr:  sa.ip(),
            port:  sa.port(),
            proto: proto,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::ICMP     => write!(f, "icmp"),
            Protocol::TCP      => write!(f, "tcp"),
            Protocol::UDP      => write!(f, "udp"),
            Protocol::Other(n) => write!(f, "proto-{}", n),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.addr {
            IpAddr::V4(ip) => write!(f, "{}:{}/{}",   ip, self.port, self.proto),
            IpAddr::V6(ip) => write!(f, "[{}]:{}/{}", ip, self.port, self.proto),
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}) -> {}", self.container, self.src, self.dst)
    }
}
