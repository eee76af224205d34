use std::fmt;
use std::ops::Sub;
use serde::{Serialize, Deserialize};

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Micros(pub i64);

/// Most recent knowledge of a connection. `Open` sorts after every
/// closed time so that max() always picks the freshest evidence.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Timestamp {
    Closed(Micros),
    Open,
}

impl Micros {
    pub fn now() -> Self {
        let ts = time::get_time();
        Micros(ts.sec * 1_000_000 + i64::from(ts.nsec) / 1_000)
    }

    pub fn offset(self, delta: i64) -> Self {
        Micros(self.0.saturating_add(delta))
    }
}

impl Sub for Micros {
    type Output = i64;

    fn sub(self, rhs: Micros) -> i64 {
        self.0.saturating_sub(rhs.0)
    }
}

impl Timestamp {
    pub fn is_open(&self) -> bool {
        *self == Timestamp::Open
    }
}

impl fmt::Display for Micros {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Timestamp::Closed(ts) => write!(f, "closed at {}", ts),
            Timestamp::Open       => write!(f, "open"),
        }
    }
}
