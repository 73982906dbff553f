//! Just enough HTTP to read a websocket upgrade request.

use std::collections::HashMap;

/// Returns the index right after the first `\r\n\r\n`, if the header block is complete.
///
/// ### Example
///
/// ```rust
/// use web_socket_server::http::find_header_end;
///
/// assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n\r\nrest"), Some(18));
/// assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n"), None);
/// ```
pub fn find_header_end(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// It represents an HTTP message with a request line and headers.
///
/// Header names are lower-cased, names and values are trimmed.
///
/// ### Example
///
/// ```rust
/// let bytes = "GET /chat HTTP/1.1\r\nHost: example.com:8000\r\nSec-WebSocket-Version: 13\r\n\r\n";
/// let http = web_socket_server::http::Http::parse(bytes);
///
/// assert_eq!(http.prefix, "GET /chat HTTP/1.1");
/// assert_eq!(http.get("host"), Some(&"example.com:8000".into()));
/// assert_eq!(http.get("sec-websocket-version"), Some(&"13".into()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Http {
    /// Prefix of the http message (e.g. `GET /chat HTTP/1.1`)
    pub prefix: String,
    ///  key-value pairs of http headers
    pub headers: HashMap<String, String>,
}

impl std::ops::Deref for Http {
    type Target = HashMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.headers
    }
}

impl std::ops::DerefMut for Http {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.headers
    }
}

impl Http {
    /// Parse a header block, lines without a `:` are skipped.
    pub fn parse(string: &str) -> Self {
        let mut lines = string.split("\r\n");
        let prefix = lines.next().unwrap_or_default().trim().to_owned();
        let mut headers = HashMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
            }
        }
        Self { prefix, headers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_upgrade_request() {
        let http = Http::parse(
            "GET /chat HTTP/1.1\r\n\
             Host: server.example.com\r\n\
             Upgrade:websocket\r\n\
             Sec-WebSocket-Key:   dGhlIHNhbXBsZSBub25jZQ==  \r\n\
             garbage line\r\n\
             Sec-WebSocket-Protocol: chat, superchat\r\n\r\n",
        );
        assert_eq!(http.prefix, "GET /chat HTTP/1.1");
        assert_eq!(http.len(), 4);
        assert_eq!(http["upgrade"], "websocket");
        assert_eq!(http["sec-websocket-key"], "dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(http["sec-websocket-protocol"], "chat, superchat");
    }

    #[test]
    fn header_end_split_across_reads() {
        let mut buf = b"GET / HTTP/1.1\r\nHost: a\r\n\r".to_vec();
        assert_eq!(find_header_end(&buf), None);
        buf.extend_from_slice(b"\n\x81");
        assert_eq!(find_header_end(&buf), Some(buf.len() - 1));
    }
}
