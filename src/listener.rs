//! Accepts connections for one protocol/port and spawns a `Relay` for each.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::relay;
use crate::sniff::Protocol;

pub struct Listener {
    protocol: Protocol,
    listener: TcpListener,
    config: Arc<Config>,
}

impl Listener {
    pub async fn bind(protocol: Protocol, config: Arc<Config>) -> std::io::Result<Self> {
        let addr = SocketAddr::from((config.local_ip, protocol.default_port()));
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, protocol = protocol.as_str(), "listening");
        Ok(Listener {
            protocol,
            listener,
            config,
        })
    }

    /// Accepts indefinitely, spawning a fresh `Relay` task per connection.
    /// Accept errors are logged and do not stop the loop.
    pub async fn serve(self) -> std::io::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    let protocol = self.protocol;
                    let config = Arc::clone(&self.config);
                    tokio::spawn(async move {
                        relay::serve(socket, peer_addr, protocol, config).await;
                    });
                }
                Err(e) => {
                    warn!(protocol = self.protocol.as_str(), error = %e, "accept failed");
                }
            }
        }
    }
}
