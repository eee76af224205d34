use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use crate::conn::Endpoint;

pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, container: &str) -> Option<String>;
}

/// Maps a destination endpoint to every workload that may be serving it.
/// An empty result means the endpoint is not known yet.
pub trait EndpointResolver: Send + Sync {
    fn lookup(&self, endpoint: &Endpoint) -> Vec<Lookup>;
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Lookup {
    pub workload: String,
    pub ports:    Vec<u16>,
}

impl IdentityResolver for HashMap<String, String> {
    fn resolve(&self, container: &str) -> Option<String> {
        self.get(container).cloned()
    }
}

impl EndpointResolver for HashMap<Endpoint, Vec<Lookup>> {
    fn lookup(&self, endpoint: &Endpoint) -> Vec<Lookup> {
        self.get(endpoint).cloned().unwrap_or_default()
    }
}
