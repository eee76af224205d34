use std::net::{IpAddr, SocketAddr};
use log::debug;
use serde::{Serialize, Deserialize, Deserializer};
use serde::de::DeserializeOwned;
use serde_json::Value;
use super::{Connection, Endpoint, Micros, Protocol};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Info {
    pub time:    Micros,
    #[serde(default, deserialize_with = "records")]
    pub updated: Vec<Record>,
}

/// One collector event. A field that is missing or fails to decode is
/// left empty so the rest of the batch still goes through.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "lenient")]
    pub container_id:    Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub local_address:   Option<IpAddr>,
    #[serde(default, deserialize_with = "lenient")]
    pub remote_address:  Option<SocketAddr>,
    #[serde(default, deserialize_with = "lenient")]
    pub protocol:        Option<Protocol>,
    #[serde(default, deserialize_with = "lenient")]
    pub role:            Option<Role>,
    #[serde(default, deserialize_with = "lenient")]
    pub close_timestamp: Option<Micros>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    Client,
    Server,
    #[serde(other)]
    Unknown,
}

impl Record {
    pub fn connection(&self) -> Option<Connection> {
        let container = self.container_id.as_ref().filter(|id| !id.is_empty())?;
        let src       = self.local_address?;
        let dst       = self.remote_address?;
        let proto     = self.protocol?;
        Some(Connection {
            src:       src,
            container: container.clone(),
            dst:       Endpoint::new(dst, proto),
        })
    }

    /// Collector close time, `None` while the connection is still open.
    pub fn closed(&self) -> Option<Micros> {
        match self.close_timestamp {
            Some(Micros(0)) => None,
            ts              => ts,
        }
    }
}

fn records<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Record>, D::Error> {
    let values = Vec::<Value>::deserialize(de)?;
    Ok(values.into_iter().filter_map(|value| {
        match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e)     => {
                debug!("skipping undecodable record: {}", e);
                None
            }
        }
    }).collect())
}

fn lenient<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(de)?;
    Ok(serde_json::from_value(value).ok())
}
