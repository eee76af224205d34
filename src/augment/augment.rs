use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use anyhow::Result;
use futures::prelude::*;
use log::{debug, error, info};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio_serde::{SymmetricallyFramed, formats::SymmetricalJson};
use tokio_util::codec::{FramedRead, LengthDelimitedCodec};
use crate::conn::Endpoint;
use crate::resolve::{EndpointResolver, IdentityResolver, Lookup};
use super::object::{Object, Pod, Service, IP};

/// Cluster entity store. Every update replaces the whole view, so
/// lookups only ever see one consistent generation of objects.
pub struct Augment {
    kube: Mutex<Kube>,
}

#[derive(Debug, Default)]
struct Kube {
    containers: HashMap<String, String>,
    endpoints:  HashMap<Endpoint, Vec<Lookup>>,
}

impl Augment {
    pub fn new() -> Self {
        Self {
            kube: Mutex::new(Kube::default()),
        }
    }

    pub fn update(&self, objs: Vec<Object>) {
        let mut kube = Kube::default();

        for o in objs {
            match o {
                Object::Pod(pod)     => kube.pod(pod),
                Object::Service(svc) => kube.service(svc),
            }
        }

        debug!("entities: {} containers, {} endpoints", kube.containers.len(), kube.endpoints.len());

        mem::swap(&mut *self.kube.lock(), &mut kube);
    }

    pub async fn listen(self: Arc<Self>, addr: String) {
        match listen(addr, self).await {
            Ok(()) => debug!("augment finished"),
            Err(e) => error!("augment failed: {}", e),
        }
    }
}

impl Default for Augment {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityResolver for Augment {
    fn resolve(&self, container: &str) -> Option<String> {
        self.kube.lock().containers.get(container).cloned()
    }
}

impl EndpointResolver for Augment {
    fn lookup(&self, endpoint: &Endpoint) -> Vec<Lookup> {
        self.kube.lock().endpoints.get(endpoint).cloned().unwrap_or_default()
    }
}

impl Kube {
    fn pod(&mut self, Pod { workload, ip, containers, .. }: Pod) {
        for c in containers {
            // host network pods share the node address
            if let IP::Pod(addr) = ip {
                for p in &c.ports {
                    let endpoint = Endpoint {
                        addr:  addr,
                        port:  p.port,
                        proto: p.protocol,
                    };
                    self.add(endpoint, &workload, p.port);
                }
            }
            self.containers.insert(c.id, workload.clone());
        }
    }

    fn service(&mut self, Service { ip, ports, workloads, .. }: Service) {
        for p in ports {
            let endpoint = Endpoint {
                addr:  ip,
                port:  p.port,
                proto: p.protocol,
            };
            for w in &workloads {
                self.add(endpoint, w, p.target);
            }
        }
    }

    fn add(&mut self, endpoint: Endpoint, workload: &str, port: u16) {
        let lookups = self.endpoints.entry(endpoint).or_insert_with(Vec::new);

        if let Some(l) = lookups.iter_mut().find(|l| l.workload == workload) {
            if !l.ports.contains(&port) {
                l.ports.push(port);
            }
            return;
        }

        lookups.push(Lookup {
            workload: workload.to_owned(),
            ports:    vec![port],
        });
    }
}

async fn listen(addr: String, augment: Arc<Augment>) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("listening for entities on {}", addr);
    loop {
        let (sock, addr) = listener.accept().await?;
        debug!("connection from {}", addr);
        let augment = augment.clone();

        tokio::spawn(async move {
            match client(sock, augment).await {
                Ok(()) => debug!("client {} finished", addr),
                Err(e) => error!("client {} error: {}", addr, e),
            }
        });
    }
}

async fn client(sock: TcpStream, augment: Arc<Augment>) -> Result<()> {
    let mut length = LengthDelimitedCodec::new();
    length.set_max_frame_length(32 * 1024 * 1024);
    let framed = FramedRead::new(sock, length);
    let format = SymmetricalJson::<Vec<Object>>::default();

    let mut codec = SymmetricallyFramed::new(framed, format);

    while let Some(objs) = codec.try_next().await? {
        augment.update(objs);
    }

    Ok(())
}
