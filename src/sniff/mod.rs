//! Stateless server-name extraction from a client's first flight of bytes.
//!
//! Sniffers never block and never own a socket: each is a pure function from
//! a byte buffer to a hostname or a `SniffError`.

pub mod http;
pub mod tls;

use crate::error::SniffError;

/// Which protocol-specific sniffer a `Listener` invokes: a tagged variant,
/// not a trait-object hierarchy — there are only ever two of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Tls,
}

impl Protocol {
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Tls => 443,
        }
    }

    pub fn sniff(self, buf: &[u8]) -> Result<String, SniffError> {
        let name = match self {
            Protocol::Http => http::sniff_host(buf)?,
            Protocol::Tls => tls::sniff_sni(buf)?,
        };
        if name.trim().is_empty() {
            return Err(SniffError::EmptyServerName);
        }
        Ok(name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Tls => "tls",
        }
    }
}
