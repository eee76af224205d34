use std::fs;
use std::time::Duration;
use anyhow::Result;
use crate::augment::Object;

pub fn read(path: String) -> Result<Vec<u8>> {
    Ok(fs::read(&path).map_err(|e| {
        let msg  = format!("invalid argument '{}': {}", path, e);
        let kind = clap::ErrorKind::InvalidValue;
        clap::Error::with_description(&msg, kind)
    })?)
}

pub fn objects(path: String) -> Result<Vec<Object>> {
    let data = read(path.clone())?;
    Ok(serde_json::from_slice(&data).map_err(|e| {
        let msg  = format!("invalid entities in '{}': {}", path, e);
        let kind = clap::ErrorKind::InvalidValue;
        clap::Error::with_description(&msg, kind)
    })?)
}

pub fn interval(secs: u64) -> Result<Duration> {
    match secs {
        0 => {
            let msg  = "invalid argument 'interval': must be at least 1 second";
            let kind = clap::ErrorKind::InvalidValue;
            Err(clap::Error::with_description(msg, kind).into())
        }
        n => Ok(Duration::from_secs(n)),
    }
}
