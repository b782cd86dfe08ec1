//! Upstream dialing: direct TCP or via a SOCKS5 proxy.

use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;
use tokio_socks::TargetAddr;

use crate::config::DialPolicy;
use crate::error::DialError;

/// Opens an upstream connection to `(host, port)` per `policy`. Returns a
/// single `TcpStream`-like split pair by returning the underlying stream;
/// callers split it into read/write halves themselves.
pub async fn connect(policy: &DialPolicy, host: &str, port: u16) -> Result<TcpStream, DialError> {
    match policy {
        DialPolicy::Direct => TcpStream::connect((host, port))
            .await
            .map_err(|source| DialError::Direct {
                host: host.to_string(),
                port,
                source,
            }),

        DialPolicy::Socks5 {
            host: proxy_host,
            port: proxy_port,
            auth,
            remote_resolve,
        } => {
            let proxy_addr = (proxy_host.as_str(), *proxy_port);

            let target: TargetAddr<'static> = if *remote_resolve {
                TargetAddr::Domain(host.to_string().into(), port)
            } else {
                let resolved = tokio::net::lookup_host((host, port))
                    .await
                    .map_err(|source| DialError::Resolve {
                        host: host.to_string(),
                        source,
                    })?
                    .next()
                    .ok_or_else(|| DialError::Resolve {
                        host: host.to_string(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "no addresses returned",
                        ),
                    })?;
                TargetAddr::Ip(resolved)
            };

            let stream = match auth {
                Some(creds) => Socks5Stream::connect_with_password(
                    proxy_addr,
                    target,
                    &creds.username,
                    &creds.password,
                )
                .await,
                None => Socks5Stream::connect(proxy_addr, target).await,
            }
            .map_err(|source| DialError::Socks5 {
                host: host.to_string(),
                port,
                proxy: format!("{proxy_host}:{proxy_port}"),
                source,
            })?;

            Ok(stream.into_inner())
        }
    }
}
