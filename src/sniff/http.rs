//! HTTP/1.x `Host` header extraction.
//!
//! Scans header lines delimited by CRLF rather than relying on a regex that
//! requires a trailing `User-Agent` header to terminate the match, the way
//! `original_source/SniPy/Core.py`'s `SniServerHTTP.hostname_regex` did —
//! that regex only matched when a `User-Agent` header happened to follow,
//! which is not guaranteed.

use crate::error::SniffError;

pub fn sniff_host(buf: &[u8]) -> Result<String, SniffError> {
    // The request may be truncated mid-body; we only need complete header
    // lines, so work a line at a time and stop at the first blank line or
    // end of buffer.
    for line in buf.split(|&b| b == b'\n') {
        // Strip a trailing \r left over from splitting on \n alone.
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        if line.is_empty() {
            // blank line: end of headers, no Host header seen yet
            break;
        }

        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let (name, value) = line.split_at(colon);
        if !name.eq_ignore_ascii_case(b"host") {
            continue;
        }

        let value = &value[1..]; // drop the colon
        let value = std::str::from_utf8(value).map_err(|_| SniffError::NoHostHeader)?;
        let trimmed = value.trim_matches(|c: char| c == ' ' || c == '\t');
        return Ok(trimmed.to_string());
    }

    Err(SniffError::NoHostHeader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_host_from_typical_request() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\nUser-Agent: x\r\n\r\n";
        assert_eq!(sniff_host(req).unwrap(), "example.com");
    }

    #[test]
    fn host_header_last_before_blank_line_still_succeeds() {
        let req = b"GET /path HTTP/1.1\r\nAccept: */*\r\nHost: example.com\r\n\r\n";
        assert_eq!(sniff_host(req).unwrap(), "example.com");
    }

    #[test]
    fn matches_case_insensitively() {
        let req = b"GET / HTTP/1.1\r\nhOsT: example.com\r\n\r\n";
        assert_eq!(sniff_host(req).unwrap(), "example.com");
    }

    #[test]
    fn works_without_a_user_agent_header() {
        // The regex the original source used required a trailing User-Agent
        // header to terminate the Host capture group; this sniffer must not
        // depend on that.
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
        assert_eq!(sniff_host(req).unwrap(), "example.com");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let req = b"GET / HTTP/1.1\r\nHost:   example.com  \r\n\r\n";
        assert_eq!(sniff_host(req).unwrap(), "example.com");
    }

    #[test]
    fn no_host_header_is_an_error() {
        let req = b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\n";
        assert!(matches!(sniff_host(req), Err(SniffError::NoHostHeader)));
    }

    #[test]
    fn round_trips_with_arbitrary_path() {
        for (host, path) in [
            ("example.com", "/"),
            ("example.com", "/a/b/c?q=1"),
            ("sub.example.co.uk", "/"),
        ] {
            let req = format!("GET {path} HTTP/1.1\r\nHost: {host}\r\n\r\n");
            assert_eq!(sniff_host(req.as_bytes()).unwrap(), host);
        }
    }
}
