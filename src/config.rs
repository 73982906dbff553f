use std::time::Duration;

/// Per-server knobs, shared by every connection it accepts.
///
/// ### Example
///
/// ```rust
/// use web_socket_server::Config;
/// use std::time::Duration;
///
/// let mut config = Config::new("BeanScript");
/// config.ping_interval = Some(Duration::from_secs(20));
/// assert_eq!(config.pool_capacity, 30);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Subprotocol the client must offer in `Sec-WebSocket-Protocol`.
    pub protocol: String,

    /// Number of idle frames kept around per connection.
    ///
    /// Default: 30
    pub pool_capacity: usize,

    /// Payload capacity of a freshly allocated frame.
    ///
    /// Default: 256 KB
    pub default_buffer_size: usize,

    /// A recycled frame whose payload buffer grew beyond this is given a
    /// fresh `default_buffer_size` buffer instead.
    ///
    /// Default: 1 MB
    pub max_retained_buffer: usize,

    /// Hard cap of a single frame payload.
    ///
    /// Default: 32 MB
    pub max_frame_size: usize,

    /// Hard cap of a reassembled fragmented message.
    ///
    /// Default: 32 MB
    pub max_message_size: usize,

    /// Handshake requests longer than this are rejected.
    ///
    /// Default: 64 KB
    pub max_header_size: usize,

    /// How long to wait for a pong after sending a ping.
    ///
    /// Default: 30 seconds
    pub pong_wait: Duration,

    /// Send a ping after the peer has been silent this long.
    ///
    /// Default: `None` (only explicit pings)
    pub ping_interval: Option<Duration>,

    /// Size of the scratch buffer drivers read into.
    ///
    /// Default: 16 KB
    pub read_buffer_size: usize,
}

impl Config {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: "chat".into(),
            pool_capacity: 30,
            default_buffer_size: 256 * 1024,
            max_retained_buffer: 1024 * 1024,
            max_frame_size: 32 * 1024 * 1024,
            max_message_size: 32 * 1024 * 1024,
            max_header_size: 64 * 1024,
            pong_wait: Duration::from_secs(30),
            ping_interval: None,
            read_buffer_size: 16 * 1024,
        }
    }
}
