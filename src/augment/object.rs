use std::net::IpAddr;
use serde::{Serialize, Deserialize};
use crate::conn::Protocol;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Object {
    Pod(Pod),
    Service(Service),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pod {
    pub name:       String,
    pub ns:         String,
    pub workload:   String,
    pub ip:         IP,
    pub containers: Vec<Container>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Service {
    pub name:      String,
    pub ns:        String,
    pub ip:        IpAddr,
    pub ports:     Vec<ServicePort>,
    pub workloads: Vec<String>,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ip")]
pub enum IP {
    Host(IpAddr),
    Pod(IpAddr),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Container {
    pub name:  String,
    pub id:    String,
    #[serde(default)]
    pub ports: Vec<Port>,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Port {
    pub port:     u16,
    pub protocol: Protocol,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ServicePort {
    pub port:     u16,
    pub target:   u16,
    pub protocol: Protocol,
}
