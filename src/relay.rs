//! Per-connection state machine: sniff, dial, then splice.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dial;
use crate::sniff::Protocol;

/// A one-shot `upstream_ready` latch: signalled exactly once, after both
/// upstream halves are usable, and safe for the upstream-to-client pump to
/// wait on before the dial has even started. Backed by a `Semaphore` rather
/// than a `Notify`, since `Notify::notify_waiters` only wakes waiters already
/// registered — a waiter that arrives after the signal would never see it.
/// A semaphore permit, once added, stays available for whoever acquires it.
struct UpstreamReady {
    semaphore: Semaphore,
}

impl UpstreamReady {
    fn new() -> Self {
        UpstreamReady {
            semaphore: Semaphore::new(0),
        }
    }

    fn signal(&self) {
        self.semaphore.add_permits(1);
    }

    async fn wait(&self) {
        self.semaphore
            .acquire()
            .await
            .expect("semaphore is never closed")
            .forget();
    }
}

/// Drives one accepted connection from first byte to teardown.
///
/// On return, all four sockets (client read/write, upstream read/write)
/// have been closed. The upstream pair may never have existed, if sniffing
/// or dialing failed.
pub async fn serve(
    client: TcpStream,
    peer_addr: SocketAddr,
    protocol: Protocol,
    config: Arc<Config>,
) {
    serve_to_port(client, peer_addr, protocol, config, protocol.default_port()).await
}

/// Same as `serve`, but dials the given port instead of the protocol's
/// default — lets tests point the dial at an ephemeral upstream listener.
async fn serve_to_port(
    client: TcpStream,
    peer_addr: SocketAddr,
    protocol: Protocol,
    config: Arc<Config>,
    dial_port: u16,
) {
    let (mut client_in, mut client_out) = client.into_split();

    let mut first_chunk = vec![0u8; config.pipe_chunk];
    let n = match client_in.read(&mut first_chunk).await {
        Ok(0) => {
            debug!(%peer_addr, "client closed before sending data");
            return;
        }
        Ok(n) => n,
        Err(error) => {
            debug!(%peer_addr, %error, "i/o error reading first chunk");
            return;
        }
    };
    first_chunk.truncate(n);

    let server_name = match protocol.sniff(&first_chunk) {
        Ok(name) => name,
        Err(error) => {
            debug!(%peer_addr, protocol = protocol.as_str(), %error, "sniff failed");
            return;
        }
    };

    let upstream = match dial::connect(&config.dial_policy, &server_name, dial_port).await {
        Ok(stream) => stream,
        Err(error) => {
            warn!(%peer_addr, %server_name, %error, "dial failed");
            return;
        }
    };

    info!(%peer_addr, %server_name, protocol = protocol.as_str(), "proxying connection");

    let (mut upstream_in, mut upstream_out) = upstream.into_split();
    let ready = Arc::new(UpstreamReady::new());

    // The first chunk is the first write on the upstream side; no client
    // byte before it may ever reach upstream ahead of it.
    if let Err(error) = upstream_out.write_all(&first_chunk).await {
        debug!(%peer_addr, %server_name, %error, "i/o error writing first chunk upstream");
        return;
    }
    ready.signal();

    let client_to_upstream = pump(&mut client_in, &mut upstream_out, None, config.pipe_chunk);
    let upstream_to_client = pump(
        &mut upstream_in,
        &mut client_out,
        Some(&ready),
        config.pipe_chunk,
    );

    tokio::join!(client_to_upstream, upstream_to_client);

    debug!(%peer_addr, %server_name, "connection closed");
}

/// Reads from `from` and writes to `to` until EOF or error, half-closing
/// `to` on exit. If `wait_for` is set, the pump blocks on the latch before
/// its first read (used by the upstream-to-client direction, which may
/// start running before the dial has completed). `chunk_size` sizes the read
/// buffer, same as the first-chunk read in `serve_to_port`.
async fn pump<R, W>(from: &mut R, to: &mut W, wait_for: Option<&UpstreamReady>, chunk_size: usize)
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    if let Some(ready) = wait_for {
        ready.wait().await;
    }

    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = match from.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        if to.write_all(&buf[..n]).await.is_err() {
            break;
        }
    }
    let _ = to.shutdown().await;
}
