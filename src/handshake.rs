//! # Client handshake request
//!
//! A client sends a handshake request to the server. It includes the following information:
//!
//! ```yml
//! GET /chat HTTP/1.1
//! Host: example.com:8000
//! Upgrade: websocket
//! Connection: Upgrade
//! Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==
//! Sec-WebSocket-Version: 13
//! Sec-WebSocket-Protocol: chat
//! ```
//!
//! The server answers with `101 Switching Protocols` only when the version is `13` and
//! its own subprotocol is one of those offered by the client.

use crate::*;
use base64::{prelude::BASE64_STANDARD, Engine};
use sha1::{Digest, Sha1};
use std::collections::HashMap;

/// WebSocket magic string used during the WebSocket handshake
pub const MAGIC_STRING: &[u8; 36] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Create `Sec-WebSocket-Accept` key from `Sec-WebSocket-Key` http header value.
///
/// ### Example
///
/// ```rust
/// use web_socket_server::handshake::accept_key_from;
/// assert_eq!(accept_key_from("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[inline]
pub fn accept_key_from(sec_ws_key: impl AsRef<[u8]>) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(sec_ws_key.as_ref());
    sha1.update(MAGIC_STRING);
    BASE64_STANDARD.encode(sha1.finalize())
}

/// ## Server handshake response
///
/// ### Example
///
/// ```rust
/// let res = [
///     "HTTP/1.1 101 Switching Protocols",
///     "Upgrade: websocket",
///     "Connection: Upgrade",
///     "Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=",
///     "Sec-WebSocket-Protocol: chat",
///     "",
///     ""
/// ];
/// assert_eq!(web_socket_server::handshake::response("dGhlIHNhbXBsZSBub25jZQ==", "chat"), res.join("\r\n"));
/// ```
pub fn response(sec_ws_key: impl AsRef<[u8]>, protocol: &str) -> String {
    let key = accept_key_from(sec_ws_key);
    format!("HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {key}\r\nSec-WebSocket-Protocol: {protocol}\r\n\r\n")
}

/// Validate an upgrade request and build the response for it.
///
/// `headers` must have lower-cased names, as produced by [crate::http::Http::parse].
pub fn negotiate(headers: &HashMap<String, String>, protocol: &str) -> Result<String> {
    match headers.get("sec-websocket-version") {
        Some(version) if version == "13" => {}
        version => return Err(Error::UnsupportedVersion(version.cloned())),
    }
    let offered = headers
        .get("sec-websocket-protocol")
        .is_some_and(|list| list.split(',').any(|p| p.trim() == protocol));
    if !offered {
        return Err(Error::UnsupportedSubprotocol);
    }
    let Some(key) = headers.get("sec-websocket-key") else {
        return proto_err("missing sec-websocket-key header");
    };
    Ok(response(key, protocol))
}
