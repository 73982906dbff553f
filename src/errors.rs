use crate::CloseCode;
use std::{io, time::Duration};
use thiserror::Error;

/// Reasons a single connection is torn down.
///
/// None of them are recoverable: the connection is closed and the client is
/// expected to reconnect.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed header, unmasked client frame, non-zero reserved bits, etc...
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    #[error("unsupported websocket version: {0:?}")]
    UnsupportedVersion(Option<String>),

    #[error("unsupported websocket subprotocol")]
    UnsupportedSubprotocol,

    /// Declared, grown or accumulated payload length is above the configured cap.
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(u64),

    /// The handshake request did not terminate within the allowed number of bytes.
    #[error("handshake header exceeds {0} bytes")]
    HeaderTooLarge(usize),

    #[error("pong not received within {0:?}")]
    PongTimeout(Duration),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Status code carried by the close frame sent when this error ends an open connection.
    ///
    /// Transport errors return `None`, there is nobody left to tell.
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Error::ProtocolViolation(_) => Some(CloseCode::ProtocolError),
            Error::FrameTooLarge(_) => Some(CloseCode::MessageTooBig),
            Error::Io(_) => None,
            _ => Some(CloseCode::PolicyViolation),
        }
    }
}

pub(crate) fn proto_err<T>(msg: &'static str) -> Result<T> {
    Err(Error::ProtocolViolation(msg))
}
