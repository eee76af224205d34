use std::collections::HashMap;
use log::{debug, trace};
use parking_lot::Mutex;
use crate::conn::{Connection, Info, Micros, Role, Timestamp};

pub struct Host {
    name:  String,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    conns: HashMap<Connection, Timestamp>,
    last:  Micros,
}

impl Host {
    pub fn new(name: &str, now: Micros) -> Self {
        Self {
            name:  name.to_owned(),
            state: Mutex::new(State {
                conns: HashMap::new(),
                last:  now,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Merge one collector batch into the table.
    ///
    /// Close times are shifted by the difference between `now` and the
    /// collector's reported time. When `first` is set every connection
    /// already in the table is marked closed at the last time this host
    /// was heard from, since close events may have been lost while the
    /// collector was disconnected.
    pub fn process(&self, info: &Info, now: Micros, first: bool) {
        let offset  = now - info.time;
        let updated = updated(&self.name, info, offset);

        let mut state = self.state.lock();

        if first {
            let last = Timestamp::Closed(state.last);
            for ts in state.conns.values_mut() {
                *ts = last;
            }
        }

        trace!("{}: merging {} connections, offset {}us", self.name, updated.len(), offset);

        state.conns.extend(updated);
        state.last = now;
    }

    pub fn touch(&self, now: Micros) {
        self.state.lock().last = now;
    }

    pub fn last(&self) -> Micros {
        self.state.lock().last
    }

    pub fn connections(&self) -> HashMap<Connection, Timestamp> {
        self.state.lock().conns.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn updated(name: &str, info: &Info, offset: i64) -> Vec<(Connection, Timestamp)> {
    info.updated.iter().filter_map(|record| {
        match record.role {
            Some(Role::Client) => (),
            Some(role)         => {
                trace!("{}: ignoring {:?} connection", name, role);
                return None;
            }
            None               => {
                debug!("{}: skipping record without role", name);
                return None;
            }
        }

        let conn = match record.connection() {
            Some(conn) => conn,
            None       => {
                debug!("{}: skipping malformed record {:?}", name, record);
                return None;
            }
        };

        let ts = match record.closed() {
            Some(ts) => Timestamp::Closed(ts.offset(offset)),
            None     => Timestamp::Open,
        };

        Some((conn, ts))
    }).collect()
}
