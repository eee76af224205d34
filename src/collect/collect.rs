use std::sync::Arc;
use anyhow::{anyhow, Result};
use futures::prelude::*;
use log::{debug, error, info, warn};
use serde::{Serialize, Deserialize};
use tokio::net::{TcpListener, TcpStream};
use tokio_serde::{SymmetricallyFramed, formats::SymmetricalJson};
use tokio_util::codec::{FramedRead, LengthDelimitedCodec};
use crate::conn::{Info, Micros};
use crate::manager::Manager;

#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    Hello { host: String },
    Update(Info),
}

pub async fn listen(addr: String, manager: Arc<Manager>) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("listening for collectors on {}", addr);
    serve(listener, manager).await
}

pub async fn serve(listener: TcpListener, manager: Arc<Manager>) -> Result<()> {
    loop {
        let (sock, addr) = listener.accept().await?;
        debug!("connection from {}", addr);
        let manager = manager.clone();

        tokio::spawn(async move {
            match collector(sock, manager).await {
                Ok(()) => debug!("collector {} finished", addr),
                Err(e) => error!("collector {} error: {}", addr, e),
            }
        });
    }
}

async fn collector(sock: TcpStream, manager: Arc<Manager>) -> Result<()> {
    let mut length = LengthDelimitedCodec::new();
    length.set_max_frame_length(32 * 1024 * 1024);
    let framed = FramedRead::new(sock, length);
    let format = SymmetricalJson::<Request>::default();

    let mut codec = SymmetricallyFramed::new(framed, format);

    let host = match codec.try_next().await? {
        Some(Request::Hello { host }) => manager.register(&host),
        Some(Request::Update(..))     => return Err(anyhow!("update before hello")),
        None                          => return Ok(()),
    };

    // the first batch after a (re)connect may be missing close events
    let mut first = true;

    while let Some(req) = codec.try_next().await? {
        match req {
            Request::Update(info) => {
                host.process(&info, Micros::now(), first);
                first = false;
            }
            Request::Hello { host: name } => {
                warn!("{}: ignoring repeated hello as {}", host.name(), name);
            }
        }
    }

    Ok(())
}
