//! TLS ClientHello SNI extraction.
//!
//! Operates on a single buffer — the first chunk read from the client —
//! instead of reassembling a full TLS record across reads (see DESIGN.md).

use crate::error::SniffError;

const TLS_HANDSHAKE_CONTENT_TYPE: u8 = 0x16;
const TLS_MAJOR_VERSION: u8 = 0x03;

// record header (5) + handshake header (4) + legacy_version (2) + random (32) = 43
const CLIENT_HELLO_PREFIX_LEN: usize = 0x2b;

const SNI_EXTENSION_TYPE: u16 = 0x0000;

/// Small cursor over an immutable byte slice; every read is bounds-checked
/// and turns a short buffer into `SniffError::Truncated` instead of a panic.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn skip(&mut self, n: usize) -> Result<(), SniffError> {
        if self.remaining() < n {
            return Err(SniffError::Truncated("ClientHello"));
        }
        self.pos += n;
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SniffError> {
        if self.remaining() < n {
            return Err(SniffError::Truncated("ClientHello"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, SniffError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, SniffError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }
}

/// Extracts the `server_name` from the first ClientHello in `buf`.
pub fn sniff_sni(buf: &[u8]) -> Result<String, SniffError> {
    if buf.len() < 2 || buf[0] != TLS_HANDSHAKE_CONTENT_TYPE || buf[1] != TLS_MAJOR_VERSION {
        let mut marker = [0u8; 2];
        marker[..buf.len().min(2)].copy_from_slice(&buf[..buf.len().min(2)]);
        return Err(SniffError::NotTls(marker));
    }

    let mut cur = Cursor::new(buf);
    cur.skip(CLIENT_HELLO_PREFIX_LEN)?;

    let session_id_len = cur.u8()? as usize;
    cur.skip(session_id_len)?;

    let cipher_suites_len = cur.u16()? as usize;
    // +2 accounts for compression_methods, which in practice is always the
    // fixed two bytes [0x01, 0x00] (one null method) — see original source.
    cur.skip(cipher_suites_len + 2)?;

    cur.skip(2)?; // extensions-total-length, unused: we stop at buffer end regardless

    loop {
        if cur.remaining() < 4 {
            break;
        }
        let ext_type = cur.u16()?;
        let ext_len = cur.u16()? as usize;
        let ext_data = cur.take(ext_len)?;

        if ext_type == SNI_EXTENSION_TYPE {
            // server_name_list length (2) + first entry's name type (1) + name length (2) = 5
            if ext_data.len() < 5 {
                return Err(SniffError::Truncated("server_name extension"));
            }
            let name = &ext_data[5..];
            return String::from_utf8(name.to_vec())
                .map_err(|_| SniffError::NoServerName);
        }
    }

    Err(SniffError::NoServerName)
}

/// Builds a minimal ClientHello carrying a single SNI extension naming
/// `host`, laid out the way
/// `other_examples/.../sniproxy-core-tests-protocol_tests.rs.rs`'s
/// `build_client_hello` helper does. `pub(crate)` so `relay`'s end-to-end
/// tests can reuse it.
#[cfg(test)]
pub(crate) fn client_hello_with_sni(host: &str) -> Vec<u8> {
    let host_bytes = host.as_bytes();
    let name_len = host_bytes.len() as u16;

    let mut sni_ext = Vec::new();
    let server_name_list_len = 1 + 2 + name_len; // name_type + name_len + name
    sni_ext.extend_from_slice(&server_name_list_len.to_be_bytes());
    sni_ext.push(0); // host_name type
    sni_ext.extend_from_slice(&name_len.to_be_bytes());
    sni_ext.extend_from_slice(host_bytes);

    let mut extensions = Vec::new();
    extensions.extend_from_slice(&0u16.to_be_bytes()); // extension type: server_name
    extensions.extend_from_slice(&(sni_ext.len() as u16).to_be_bytes());
    extensions.extend_from_slice(&sni_ext);

    let mut hello_body = Vec::new();
    hello_body.extend_from_slice(&[0x03, 0x03]); // legacy_version
    hello_body.extend_from_slice(&[0x42; 32]); // random
    hello_body.push(0); // session_id_length = 0
    hello_body.extend_from_slice(&2u16.to_be_bytes()); // cipher_suites_length
    hello_body.extend_from_slice(&[0xc0, 0x2f]); // one cipher suite
    hello_body.extend_from_slice(&[0x01, 0x00]); // compression methods
    hello_body.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
    hello_body.extend_from_slice(&extensions);

    let handshake_len = hello_body.len() as u32;
    let mut handshake = vec![0x01]; // ClientHello
    handshake.extend_from_slice(&handshake_len.to_be_bytes()[1..]); // 3-byte length
    handshake.extend_from_slice(&hello_body);

    let record_len = handshake.len() as u16;
    let mut record = vec![0x16, 0x03, 0x03];
    record.extend_from_slice(&record_len.to_be_bytes());
    record.extend_from_slice(&handshake);
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_sni_from_well_formed_hello() {
        let buf = client_hello_with_sni("example.com");
        assert_eq!(sniff_sni(&buf).unwrap(), "example.com");
    }

    #[test]
    fn round_trips_over_ascii_hostname_lengths() {
        for len in [1usize, 16, 63, 64, 253] {
            let host: String = "a".repeat(len - 1) + "b";
            let buf = client_hello_with_sni(&host);
            assert_eq!(sniff_sni(&buf).unwrap(), host);
        }
    }

    #[test]
    fn rejects_non_tls_first_bytes() {
        let buf = [0x00u8, 0x00, 0x00];
        assert!(matches!(sniff_sni(&buf), Err(SniffError::NotTls(_))));
    }

    #[test]
    fn rejects_single_byte_that_is_not_0x16() {
        let buf = [0x00u8];
        assert!(matches!(sniff_sni(&buf), Err(SniffError::NotTls(_))));
    }

    #[test]
    fn sni_exactly_at_buffer_boundary_still_succeeds() {
        // no trailing bytes after the extension
        let buf = client_hello_with_sni("example.com");
        assert_eq!(sniff_sni(&buf).unwrap(), "example.com");
    }

    #[test]
    fn missing_sni_extension_is_an_error() {
        // a hello with extensions-total-length 0: no SNI extension present
        let mut hello_body = vec![0x03, 0x03];
        hello_body.extend_from_slice(&[0x42; 32]);
        hello_body.push(0);
        hello_body.extend_from_slice(&2u16.to_be_bytes());
        hello_body.extend_from_slice(&[0xc0, 0x2f]);
        hello_body.extend_from_slice(&[0x01, 0x00]);
        hello_body.extend_from_slice(&0u16.to_be_bytes()); // extensions length = 0

        let handshake_len = hello_body.len() as u32;
        let mut handshake = vec![0x01];
        handshake.extend_from_slice(&handshake_len.to_be_bytes()[1..]);
        handshake.extend_from_slice(&hello_body);

        let record_len = handshake.len() as u16;
        let mut record = vec![0x16, 0x03, 0x03];
        record.extend_from_slice(&record_len.to_be_bytes());
        record.extend_from_slice(&handshake);

        assert!(matches!(sniff_sni(&record), Err(SniffError::NoServerName)));
    }
}
