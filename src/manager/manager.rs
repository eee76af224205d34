use std::collections::HashMap;
use std::hash::Hash;
use std::mem;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use crate::conn::{Connection, Micros, Timestamp};
use crate::host::Host;
use crate::resolve::{EndpointResolver, IdentityResolver, Lookup};
use super::{Config, Flows, Indicator, Sink};

pub struct Manager {
    hosts:     Mutex<HashMap<String, Arc<Host>>>,
    flows:     Mutex<Arc<Flows>>,
    idents:    Arc<dyn IdentityResolver>,
    endpoints: Arc<dyn EndpointResolver>,
    sink:      Option<Arc<dyn Sink>>,
    config:    Config,
    worker:    Mutex<Lifecycle>,
}

enum Lifecycle {
    Idle,
    Running(Worker),
    Stopped,
}

struct Worker {
    done:   Sender<()>,
    thread: JoinHandle<()>,
}

impl Manager {
    pub fn new(config: Config, idents: Arc<dyn IdentityResolver>, endpoints: Arc<dyn EndpointResolver>) -> Self {
        Self {
            hosts:     Mutex::new(HashMap::new()),
            flows:     Mutex::new(Arc::new(Flows::new())),
            idents:    idents,
            endpoints: endpoints,
            sink:      None,
            config:    config,
            worker:    Mutex::new(Lifecycle::Idle),
        }
    }

    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn register(&self, name: &str) -> Arc<Host> {
        let now  = Micros::now();
        let host = self.hosts.lock().entry(name.to_owned()).or_insert_with(|| {
            info!("registered collector {}", name);
            Arc::new(Host::new(name, now))
        }).clone();

        host.touch(now);
        host
    }

    pub fn hosts(&self) -> Vec<String> {
        self.hosts.lock().keys().cloned().collect()
    }

    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut worker = self.worker.lock();

        match *worker {
            Lifecycle::Idle       => (),
            Lifecycle::Running(_) => {
                warn!("enrichment already running");
                return Ok(());
            }
            Lifecycle::Stopped    => return Err(anyhow!("manager stopped")),
        }

        let interval = self.config.interval;
        if interval == Duration::from_secs(0) {
            return Err(anyhow!("invalid enrichment interval {:?}", interval));
        }

        let (done, stop) = bounded(0);
        let manager      = Arc::downgrade(self);

        let thread = thread::Builder::new().name("enrich".to_owned()).spawn(move || {
            run(manager, interval, stop);
            debug!("enrichment finished");
        })?;

        debug!("enrichment running every {:?}", interval);

        *worker = Lifecycle::Running(Worker { done, thread });

        Ok(())
    }

    /// Stop the enrichment worker and tear down the collector registry.
    /// A stopped manager cannot be started again; tables still held by
    /// open collector streams are detached and no longer snapshotted.
    pub fn stop(&self) {
        let worker = mem::replace(&mut *self.worker.lock(), Lifecycle::Stopped);

        if let Lifecycle::Running(Worker { done, thread }) = worker {
            drop(done);
            if thread.join().is_err() {
                error!("enrichment worker panicked");
            }
        }

        self.hosts.lock().clear();
    }

    pub fn flows(&self) -> Arc<Flows> {
        self.flows.lock().clone()
    }

    /// Copy every host table into one map. The registry lock is released
    /// before any host lock is taken and only one host is locked at a time.
    pub fn snapshot(&self) -> HashMap<Connection, Timestamp> {
        let hosts = self.hosts.lock().values().cloned().collect::<Vec<_>>();

        let mut conns = HashMap::new();
        for host in hosts {
            for (conn, ts) in host.connections() {
                newest(&mut conns, conn, ts);
            }
        }
        conns
    }

    pub fn enrich(&self) {
        let start = Instant::now();
        let conns = self.snapshot();

        let mut flows = Flows::new();
        for (conn, ts) in &conns {
            for indicator in self.indicators(conn) {
                newest(&mut flows, indicator, *ts);
            }
        }

        debug!("enriched {} connections into {} flows in {:?}", conns.len(), flows.len(), start.elapsed());

        // old map is freed outside the publish lock
        let flows = Arc::new(flows);
        let prev  = mem::replace(&mut *self.flows.lock(), flows.clone());
        drop(prev);

        if let Some(sink) = &self.sink {
            sink.publish(flows);
        }
    }

    fn indicators(&self, conn: &Connection) -> Vec<Indicator> {
        let src = match self.idents.resolve(&conn.container) {
            Some(src) => src,
            None      => {
                warn!("orphan container {}: no workload for {}", conn.container, conn);
                return Vec::new();
            }
        };

        let matches = self.endpoints.lookup(&conn.dst);

        if matches.is_empty() {
            debug!("unresolved destination {}", conn.dst);
        }

        let mut indicators = Vec::new();
        for Lookup { workload, ports } in matches {
            for port in ports {
                indicators.push(Indicator {
                    src:   src.clone(),
                    dst:   workload.clone(),
                    port:  port,
                    proto: conn.dst.proto,
                });
            }
        }
        indicators
    }
}

fn run(manager: Weak<Manager>, interval: Duration, stop: Receiver<()>) {
    let ticker = tick(interval);

    loop {
        let ready = select! {
            recv(ticker) -> _ => true,
            recv(stop)   -> _ => false,
        };

        let manager = match manager.upgrade() {
            Some(manager) if ready => manager,
            _                      => break,
        };

        manager.enrich();
    }
}

fn newest<K: Eq + Hash>(map: &mut HashMap<K, Timestamp>, key: K, ts: Timestamp) {
    map.entry(key).and_modify(|entry| {
        if *entry < ts {
            *entry = ts;
        }
    }).or_insert(ts);
}
