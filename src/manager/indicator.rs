use std::collections::HashMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use crate::conn::{Protocol, Timestamp};

/// Workload level edge of the communication graph.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Indicator {
    pub src:   String,
    pub dst:   String,
    pub port:  u16,
    pub proto: Protocol,
}

pub type Flows = HashMap<Indicator, Timestamp>;

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}:{}/{}", self.src, self.dst, self.port, self.proto)
    }
}
