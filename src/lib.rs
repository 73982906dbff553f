//! Server side of the WebSocket protocol ([RFC 6455](https://www.rfc-editor.org/rfc/rfc6455)).
//!
//! A [Connection] performs the opening handshake, decodes client frames as bytes
//! trickle in, reassembles fragmented messages and queues replies. It does no IO of its
//! own, [Connection::on_readable] / [Connection::on_writable] drive it over a non-blocking
//! `std::io` transport and [server::serve] over a tokio one.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use web_socket_server::{server, Config, DataType, Peer};
//!
//! # async fn run() -> std::io::Result<()> {
//! let config = Arc::new(Config::new("chat"));
//! let listener = TcpListener::bind("127.0.0.1:8080").await?;
//! loop {
//!     let (stream, _) = listener.accept().await?;
//!     let config = config.clone();
//!     tokio::spawn(server::serve(stream, config, |peer: &mut Peer, ty: DataType, data: &[u8]| {
//!         if ty == DataType::Text {
//!             peer.send(data.to_vec());
//!         }
//!     }));
//! }
//! # }
//! ```

mod close_code;
mod config;
mod connection;
mod errors;
mod fragment;
mod frame;
mod mask;
mod opcode;
mod pool;

pub mod handshake;
pub mod http;
pub mod message;
pub mod server;

pub use close_code::CloseCode;
pub use config::Config;
pub use connection::{Connection, Handler, Peer, Status};
pub use errors::{Error, Result};
pub use fragment::Fragments;
pub use frame::{Frame, MAX_HEADER_SIZE};
pub use mask::{apply_mask, rand_key};
pub use message::{CloseReason, Event, Message};
pub use opcode::Opcode;
pub use pool::BufferPool;

use errors::proto_err;

/// Kind of a complete data message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    Text,
    Binary,
}
