use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use anyhow::Result;
use parking_lot::Mutex;
use crate::conn::{Endpoint, Info, Micros, Protocol, Record, Role, Timestamp};
use crate::resolve::Lookup;
use super::{Config, Flows, Indicator, Manager, Sink};

fn record(container: &str, remote: &str, close: Option<i64>) -> Record {
    Record {
        container_id:    Some(container.to_owned()),
        local_address:   "10.0.1.1".parse().ok(),
        remote_address:  remote.parse().ok(),
        protocol:        Some(Protocol::TCP),
        role:            Some(Role::Client),
        close_timestamp: close.map(Micros),
    }
}

fn info(time: i64, updated: Vec<Record>) -> Info {
    Info {
        time:    Micros(time),
        updated: updated,
    }
}

fn endpoint(addr: &str) -> Result<Endpoint> {
    Ok(Endpoint::new(addr.parse()?, Protocol::TCP))
}

fn lookup(workload: &str, ports: &[u16]) -> Lookup {
    Lookup {
        workload: workload.to_owned(),
        ports:    ports.to_vec(),
    }
}

fn indicator(src: &str, dst: &str, port: u16) -> Indicator {
    Indicator {
        src:   src.to_owned(),
        dst:   dst.to_owned(),
        port:  port,
        proto: Protocol::TCP,
    }
}

fn manager(idents: &[(&str, &str)], endpoints: Vec<(Endpoint, Vec<Lookup>)>) -> Manager {
    build(Config::default(), idents, endpoints)
}

fn build(config: Config, idents: &[(&str, &str)], endpoints: Vec<(Endpoint, Vec<Lookup>)>) -> Manager {
    let idents = idents.iter().map(|(c, w)| {
        (c.to_string(), w.to_string())
    }).collect::<HashMap<_, _>>();
    let endpoints = endpoints.into_iter().collect::<HashMap<_, _>>();
    Manager::new(config, Arc::new(idents), Arc::new(endpoints))
}

#[test]
fn open_connection_published() -> Result<()> {
    let manager = manager(&[("C1", "D1")], vec![
        (endpoint("10.0.0.5:443")?, vec![lookup("D2", &[443])]),
    ]);

    let host = manager.register("H1");
    host.process(&info(100, vec![record("C1", "10.0.0.5:443", None)]), Micros(100), true);

    manager.enrich();

    let flows = manager.flows();
    assert_eq!(1, flows.len());
    assert_eq!(Some(&Timestamp::Open), flows.get(&indicator("D1", "D2", 443)));

    Ok(())
}

#[test]
fn close_replaces_open() -> Result<()> {
    let manager = manager(&[("C1", "D1")], vec![
        (endpoint("10.0.0.5:443")?, vec![lookup("D2", &[443])]),
    ]);

    let host = manager.register("H1");
    host.process(&info(100, vec![record("C1", "10.0.0.5:443", None)]), Micros(100), true);
    manager.enrich();

    host.process(&info(150, vec![record("C1", "10.0.0.5:443", Some(150))]), Micros(160), false);
    manager.enrich();

    let flows = manager.flows();
    assert_eq!(1, flows.len());
    assert_eq!(Some(&Timestamp::Closed(Micros(160))), flows.get(&indicator("D1", "D2", 443)));

    Ok(())
}

#[test]
fn freshest_wins() -> Result<()> {
    let manager = manager(&[("C1", "D1")], vec![
        (endpoint("10.0.0.5:443")?, vec![lookup("D2", &[443])]),
    ]);

    let host = manager.register("H1");
    host.process(&info(100, vec![record("C1", "10.0.0.5:443", Some(100))]), Micros(100), true);
    host.process(&info(200, vec![record("C1", "10.0.0.5:443", Some(200))]), Micros(200), false);
    manager.enrich();

    assert_eq!(Some(&Timestamp::Closed(Micros(200))), manager.flows().get(&indicator("D1", "D2", 443)));

    Ok(())
}

#[test]
fn coalesce_across_hosts() -> Result<()> {
    let manager = manager(&[("C1", "D1"), ("C2", "D1")], vec![
        (endpoint("10.0.0.5:443")?, vec![lookup("D2", &[443])]),
    ]);

    let h1 = manager.register("H1");
    let h2 = manager.register("H2");
    h1.process(&info(300, vec![record("C1", "10.0.0.5:443", Some(300))]), Micros(300), true);
    h2.process(&info(100, vec![record("C2", "10.0.0.5:443", Some(100))]), Micros(100), true);

    manager.enrich();

    let flows = manager.flows();
    assert_eq!(1, flows.len());
    assert_eq!(Some(&Timestamp::Closed(Micros(300))), flows.get(&indicator("D1", "D2", 443)));

    Ok(())
}

#[test]
fn fan_out() -> Result<()> {
    let manager = manager(&[("C1", "D1")], vec![
        (endpoint("10.96.0.10:443")?, vec![
            lookup("D2", &[443, 8443]),
            lookup("D3", &[443]),
        ]),
    ]);

    let host = manager.register("H1");
    host.process(&info(100, vec![record("C1", "10.96.0.10:443", Some(90))]), Micros(100), true);
    manager.enrich();

    let flows = manager.flows();
    let ts    = Timestamp::Closed(Micros(90));
    assert_eq!(3, flows.len());
    assert_eq!(Some(&ts), flows.get(&indicator("D1", "D2", 443)));
    assert_eq!(Some(&ts), flows.get(&indicator("D1", "D2", 8443)));
    assert_eq!(Some(&ts), flows.get(&indicator("D1", "D3", 443)));

    Ok(())
}

#[test]
fn idempotent_enrich() -> Result<()> {
    let manager = manager(&[("C1", "D1"), ("C2", "D4")], vec![
        (endpoint("10.0.0.5:443")?, vec![lookup("D2", &[443])]),
        (endpoint("10.0.0.6:80")?,  vec![lookup("D3", &[80, 8080])]),
    ]);

    let host = manager.register("H1");
    host.process(&info(100, vec![
        record("C1", "10.0.0.5:443", None),
        record("C2", "10.0.0.6:80",  Some(50)),
    ]), Micros(100), true);

    manager.enrich();
    let first = manager.flows();
    manager.enrich();
    let second = manager.flows();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
    assert_eq!(3, second.len());

    Ok(())
}

#[test]
fn orphan_skipped() -> Result<()> {
    let manager = manager(&[("C1", "D1")], vec![
        (endpoint("10.0.0.5:443")?, vec![lookup("D2", &[443])]),
    ]);

    let host = manager.register("H1");
    host.process(&info(100, vec![
        record("C1",     "10.0.0.5:443", None),
        record("orphan", "10.0.0.5:443", None),
    ]), Micros(100), true);
    manager.enrich();

    let flows = manager.flows();
    assert_eq!(1, flows.len());
    assert!(flows.contains_key(&indicator("D1", "D2", 443)));
    assert_eq!(2, manager.snapshot().len());

    Ok(())
}

#[test]
fn unresolved_destination() -> Result<()> {
    let manager = manager(&[("C1", "D1")], vec![
        (endpoint("10.0.0.5:443")?, vec![lookup("D2", &[443])]),
        (endpoint("10.0.0.9:80")?,  Vec::new()),
    ]);

    let host = manager.register("H1");
    host.process(&info(100, vec![
        record("C1", "10.0.0.9:80",   None),
        record("C1", "10.0.0.7:8080", None),
    ]), Micros(100), true);
    manager.enrich();

    assert!(manager.flows().is_empty());

    Ok(())
}

#[test]
fn register_idempotent() {
    let manager = manager(&[], Vec::new());

    let first = manager.register("H1");
    first.process(&info(100, vec![record("C1", "10.0.0.5:443", None)]), Micros(100), true);

    let second = manager.register("H1");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(1, second.len());
    assert_eq!(vec!["H1".to_owned()], manager.hosts());

    let other = manager.register("H2");
    assert!(!Arc::ptr_eq(&first, &other));
    assert!(other.is_empty());
    assert_eq!(2, manager.hosts().len());
}

#[test]
fn register_sets_last() {
    let manager = manager(&[], Vec::new());

    let before = Micros::now();
    let host   = manager.register("H1");
    assert!(host.last() >= before);
    assert!(host.last() <= Micros::now());
}

#[test]
fn snapshot_keeps_newest() {
    let manager = manager(&[], Vec::new());

    let h1 = manager.register("H1");
    let h2 = manager.register("H2");
    h1.process(&info(100, vec![record("C1", "10.0.0.5:443", Some(50))]), Micros(100), false);
    h2.process(&info(100, vec![record("C1", "10.0.0.5:443", Some(80))]), Micros(100), false);

    let snapshot = manager.snapshot();
    assert_eq!(1, snapshot.len());
    assert_eq!(Some(&Timestamp::Closed(Micros(80))), snapshot.values().next());
}

#[test]
fn concurrent_ingest() -> Result<()> {
    const HOSTS: usize = 8;
    const BATCHES: usize = 50;

    let mut idents = Vec::new();
    for h in 0..HOSTS {
        for b in 0..BATCHES {
            idents.push((format!("c-{}-{}", h, b), format!("w-{}", h)));
        }
    }
    let idents = idents.iter().map(|(c, w)| (c.as_str(), w.as_str())).collect::<Vec<_>>();

    let manager = Arc::new(manager(&idents, vec![
        (endpoint("10.0.0.5:443")?, vec![lookup("db", &[443])]),
    ]));

    let done = Arc::new(AtomicUsize::new(0));

    let threads = (0..HOSTS).map(|h| {
        let manager = manager.clone();
        let done    = done.clone();
        thread::spawn(move || {
            let host = manager.register(&format!("host-{}", h));
            for b in 0..BATCHES {
                let rec = record(&format!("c-{}-{}", h, b), "10.0.0.5:443", None);
                host.process(&info(b as i64, vec![rec]), Micros(b as i64), b == 0);
            }
            done.fetch_add(1, Ordering::SeqCst);
        })
    }).collect::<Vec<_>>();

    while done.load(Ordering::SeqCst) < HOSTS {
        manager.enrich();
    }

    for t in threads {
        assert!(t.join().is_ok());
    }

    assert_eq!(HOSTS * BATCHES, manager.snapshot().len());

    manager.enrich();
    let flows = manager.flows();
    assert_eq!(HOSTS, flows.len());
    for h in 0..HOSTS {
        assert_eq!(Some(&Timestamp::Open), flows.get(&indicator(&format!("w-{}", h), "db", 443)));
    }

    Ok(())
}

#[derive(Default)]
struct Capture {
    count: AtomicUsize,
    last:  Mutex<Option<Arc<Flows>>>,
}

impl Sink for Capture {
    fn publish(&self, flows: Arc<Flows>) {
        self.count.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(flows);
    }
}

#[test]
fn sink_receives_published() -> Result<()> {
    let sink    = Arc::new(Capture::default());
    let manager = manager(&[("C1", "D1")], vec![
        (endpoint("10.0.0.5:443")?, vec![lookup("D2", &[443])]),
    ]).sink(sink.clone());

    let host = manager.register("H1");
    host.process(&info(100, vec![record("C1", "10.0.0.5:443", None)]), Micros(100), true);
    manager.enrich();

    assert_eq!(1, sink.count.load(Ordering::SeqCst));
    let last = sink.last.lock().clone();
    assert!(last.map(|flows| Arc::ptr_eq(&flows, &manager.flows())).unwrap_or(false));

    Ok(())
}

#[test]
fn start_stop() -> Result<()> {
    let config  = Config { interval: Duration::from_millis(10) };
    let manager = Arc::new(build(config, &[("C1", "D1")], vec![
        (endpoint("10.0.0.5:443")?, vec![lookup("D2", &[443])]),
    ]));

    manager.start()?;
    manager.start()?;

    let host = manager.register("H1");
    host.process(&info(100, vec![record("C1", "10.0.0.5:443", None)]), Micros(100), true);

    let deadline = Instant::now() + Duration::from_secs(5);
    while manager.flows().is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    assert!(manager.flows().contains_key(&indicator("D1", "D2", 443)));

    manager.stop();
    manager.stop();

    assert!(manager.hosts().is_empty());
    assert_eq!(1, manager.flows().len());

    assert!(manager.start().is_err());
    assert!(manager.hosts().is_empty());

    Ok(())
}

#[test]
fn zero_interval_rejected() {
    let config  = Config { interval: Duration::from_secs(0) };
    let manager = Arc::new(build(config, &[], Vec::new()));

    assert!(manager.start().is_err());

    let config  = Config { interval: Duration::from_secs(60) };
    let manager = Arc::new(build(config, &[], Vec::new()));

    assert!(manager.start().is_ok());
    manager.stop();
}
