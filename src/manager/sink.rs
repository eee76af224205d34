use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use log::{debug, info};
use crate::conn::Timestamp;
use super::{Flows, Indicator};

pub trait Sink: Send + Sync {
    fn publish(&self, flows: Arc<Flows>);
}

#[derive(Debug, Default)]
pub struct Log {
    dump: AtomicBool,
}

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dump(&self) {
        self.dump.store(true, Ordering::SeqCst);
    }
}

impl Sink for Log {
    fn publish(&self, flows: Arc<Flows>) {
        let open = flows.values().filter(|ts| ts.is_open()).count();
        info!("published {} flows ({} open)", flows.len(), open);

        if self.dump.swap(false, Ordering::SeqCst) {
            debug!("flow state:");
            let mut sorted = flows.iter().collect::<Vec<_>>();
            sorted.sort();
            sorted.into_iter().for_each(print);
        }
    }
}

fn print<'a>((indicator, ts): (&'a Indicator, &'a Timestamp)) {
    debug!("{}: {}", indicator, ts);
}
