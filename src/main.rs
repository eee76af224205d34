use std::sync::Arc;
use anyhow::Result;
use clap::{App, load_yaml, value_t};
use env_logger::Builder;
use jemallocator::Jemalloc;
use log::{debug, error, info};
use log::LevelFilter::*;
use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1};
use signal_hook::iterator::Signals;
use tokio::runtime::Runtime;
use netgraph::args::{interval, objects};
use netgraph::augment::Augment;
use netgraph::collect;
use netgraph::manager::{Config, Log, Manager};

#[global_allocator]
static ALLOC: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    let yaml = load_yaml!("args.yml");
    let ver  = env!("CARGO_PKG_VERSION");
    let args = App::from_yaml(yaml).version(ver).get_matches();

    let addr     = value_t!(args, "addr",     String)?;
    let entities = value_t!(args, "entities", String)?;
    let interval = interval(value_t!(args, "interval", u64)?)?;
    let preload  = args.value_of("preload").map(String::from);

    let (module, level) = match args.occurrences_of("verbose") {
        0 => (Some(module_path!()), Info),
        1 => (Some(module_path!()), Debug),
        2 => (Some(module_path!()), Trace),
        _ => (None,                 Trace),
    };
    Builder::from_default_env().filter(module, level).init();

    info!("initializing netgraph {}", ver);

    let augment = Arc::new(Augment::new());
    if let Some(path) = preload {
        augment.update(objects(path)?);
    }

    let config = Config {
        interval: interval,
    };

    let sink    = Arc::new(Log::new());
    let manager = Manager::new(config, augment.clone(), augment.clone());
    let manager = Arc::new(manager.sink(sink.clone()));

    manager.start()?;

    let rt = Runtime::new()?;

    let manager2 = manager.clone();
    rt.spawn(async move {
        match collect::listen(addr, manager2).await {
            Ok(()) => debug!("collect finished"),
            Err(e) => error!("collect failed: {}", e),
        }
    });
    rt.spawn(augment.listen(entities));

    let mut signals = Signals::new(&[SIGINT, SIGTERM, SIGUSR1])?;
    for signal in signals.forever() {
        match signal {
            SIGINT | SIGTERM => break,
            SIGUSR1          => sink.dump(),
            _                => unreachable!(),
        }
    }

    info!("shutting down");

    manager.stop();
    drop(rt);

    Ok(())
}
