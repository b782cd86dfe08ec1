/// Only `ConfigError` and bind failures are fatal to the process; everything
/// else is logged and the offending connection (or accept attempt) is torn
/// down.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },
    #[error("{field} must be set when SNIPY__PROXY=true")]
    MissingProxyField { field: &'static str },
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum SniffError {
    #[error("buffer too short to contain a {0}")]
    Truncated(&'static str),
    #[error("not a TLS ClientHello (first bytes were {0:02x?})")]
    NotTls([u8; 2]),
    #[error("ClientHello had no server_name extension")]
    NoServerName,
    #[error("no Host header found in request")]
    NoHostHeader,
    #[error("extracted server name was empty")]
    EmptyServerName,
}

#[derive(thiserror::Error, Debug)]
pub enum DialError {
    #[error("connecting directly to {host}:{port}: {source}")]
    Direct {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("dialing {host}:{port} via SOCKS5 proxy {proxy}: {source}")]
    Socks5 {
        host: String,
        port: u16,
        proxy: String,
        #[source]
        source: tokio_socks::Error,
    },
    #[error("resolving {host} for proxy-side local resolution: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
}
