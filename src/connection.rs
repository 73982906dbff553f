use crate::{
    http::{find_header_end, Http},
    *,
};
use log::{debug, trace, warn};
use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Lifecycle of a [Connection].
///
/// ```txt
/// Connecting --(handshake ok)--> Responding --(101 written)--> Open
///      |                                                         |
///      +--(bad handshake)--> Closed <--(close written)-- Closing <+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Waiting for the complete upgrade request.
    Connecting,
    /// The `101 Switching Protocols` response is being written.
    Responding,
    Open,
    /// A close frame is queued, incoming bytes are ignored.
    Closing,
    /// The transport should be closed.
    Closed,
}

/// Receives every complete message of a connection.
///
/// Implemented for closures of the same shape:
///
/// ```rust
/// use web_socket_server::{Connection, Config, DataType, Peer};
/// use std::sync::Arc;
///
/// let mut conn = Connection::new(Arc::new(Config::default()));
/// let mut echo = |peer: &mut Peer, ty: DataType, data: &[u8]| match ty {
///     DataType::Text => peer.send(String::from_utf8_lossy(data).into_owned()),
///     DataType::Binary => peer.send(data),
/// };
/// # let _ = conn.receive(b"", std::time::Instant::now(), &mut echo);
/// ```
pub trait Handler {
    fn on_message(&mut self, peer: &mut Peer, ty: DataType, data: &[u8]);
}

impl<F> Handler for F
where
    F: FnMut(&mut Peer, DataType, &[u8]),
{
    #[inline]
    fn on_message(&mut self, peer: &mut Peer, ty: DataType, data: &[u8]) {
        self(peer, ty, data)
    }
}

/// FIFO of encoded frames, with the write offset into the front one.
#[derive(Debug, Default)]
struct Outgoing {
    frames: VecDeque<Vec<u8>>,
    offset: usize,
}

impl Outgoing {
    fn push(&mut self, frame: Vec<u8>) {
        if !frame.is_empty() {
            self.frames.push_back(frame);
        }
    }

    fn chunk(&self) -> &[u8] {
        match self.frames.front() {
            Some(frame) => &frame[self.offset..],
            None => &[],
        }
    }

    fn advance(&mut self, mut amt: usize) {
        while let Some(frame) = self.frames.front() {
            let remaining = frame.len() - self.offset;
            if amt < remaining {
                self.offset += amt;
                return;
            }
            amt -= remaining;
            self.frames.pop_front();
            self.offset = 0;
        }
    }

    fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// The part of a connection the application works with.
#[derive(Debug)]
pub struct Peer {
    id: u64,
    status: Status,
    headers: HashMap<String, String>,
    outgoing: Outgoing,
}

impl Peer {
    /// Process-unique id of this connection.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Headers of the upgrade request, keyed by lower-cased name.
    #[inline]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Queue a message, it is dropped once the connection started closing.
    pub fn send(&mut self, msg: impl Message) {
        if !self.can_send() {
            debug!("[{}] dropping message sent while {:?}", self.id, self.status);
            return;
        }
        let mut bytes = Vec::new();
        msg.encode(&mut bytes);
        self.outgoing.push(bytes);
    }

    /// Queue a close frame, the connection is closed once it has been written.
    pub fn close(&mut self, reason: impl CloseReason) {
        if !self.can_send() {
            return;
        }
        debug!("[{}] closing", self.id);
        let mut bytes = Vec::new();
        reason.encode(&mut bytes);
        self.outgoing.push(bytes);
        self.status = Status::Closing;
    }

    fn can_send(&self) -> bool {
        matches!(self.status, Status::Responding | Status::Open)
    }
}

/// Server side of a single websocket connection.
///
/// It never touches a socket itself: bytes go in with [Connection::receive], and come out of
/// [Connection::outgoing]. [Connection::on_readable] and [Connection::on_writable] drive it
/// over a non-blocking `std::io` transport, [crate::server::serve] over a tokio one.
#[derive(Debug)]
pub struct Connection {
    config: Arc<Config>,
    peer: Peer,

    pool: BufferPool,
    pending: Option<Frame>,
    fragments: Fragments,
    head: Vec<u8>,
    /// How much of `head` has been searched for the terminator.
    scanned: usize,
    /// Bytes of the 101 response still to be written.
    response_left: usize,

    ping_sent: Option<Instant>,
    last_seen: Option<Instant>,
}

impl Connection {
    pub fn new(config: Arc<Config>) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        debug!("[{id}] new connection");
        Self {
            pool: BufferPool::from_config(&config),
            config,
            peer: Peer {
                id,
                status: Status::Connecting,
                headers: HashMap::new(),
                outgoing: Outgoing::default(),
            },
            pending: None,
            fragments: Fragments::default(),
            head: Vec::new(),
            scanned: 0,
            response_left: 0,
            ping_sent: None,
            last_seen: None,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.peer.id
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.peer.status
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.peer.status == Status::Closed
    }

    #[inline]
    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    #[inline]
    pub fn peer_mut(&mut self) -> &mut Peer {
        &mut self.peer
    }

    /// Feed bytes read from the transport.
    ///
    /// Any error is fatal: a best-effort close frame is queued and the status becomes
    /// [Status::Closed].
    pub fn receive(&mut self, bytes: &[u8], now: Instant, handler: &mut impl Handler) -> Result<()> {
        self.check_pong(now)?;
        self.last_seen = Some(now);
        let result = match self.peer.status {
            Status::Connecting => self.read_handshake(bytes, handler),
            Status::Responding | Status::Open => self.read_frames(bytes, handler),
            Status::Closing | Status::Closed => {
                trace!("[{}] ignoring {} bytes", self.peer.id, bytes.len());
                Ok(())
            }
        };
        if let Err(err) = &result {
            self.fail(err);
        }
        result
    }

    /// Liveness check, call it whenever [Connection::next_deadline] passes.
    ///
    /// Fails with [Error::PongTimeout] if a ping went unanswered for `pong_wait`, and sends
    /// a ping if the peer has been silent for `ping_interval`.
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        self.check_pong(now)?;
        if let (Some(interval), Some(seen), None) =
            (self.config.ping_interval, self.last_seen, self.ping_sent)
        {
            if now.saturating_duration_since(seen) >= interval {
                self.ping(now);
            }
        }
        Ok(())
    }

    /// Send a ping and expect a pong within `pong_wait`.
    ///
    /// Returns `false` if the connection is not open.
    pub fn ping(&mut self, now: Instant) -> bool {
        if self.peer.status != Status::Open {
            return false;
        }
        trace!("[{}] ping", self.peer.id);
        self.peer.send(Event::Ping(&[]));
        // Keep the oldest unanswered ping.
        self.ping_sent.get_or_insert(now);
        true
    }

    /// When [Connection::tick] has something to do next.
    pub fn next_deadline(&self) -> Option<Instant> {
        if let Some(sent) = self.ping_sent {
            return Some(sent + self.config.pong_wait);
        }
        match (self.config.ping_interval, self.last_seen) {
            (Some(interval), Some(seen)) if self.peer.status == Status::Open => Some(seen + interval),
            _ => None,
        }
    }

    /// Bytes waiting to be written, empty if there are none.
    #[inline]
    pub fn outgoing(&self) -> &[u8] {
        self.peer.outgoing.chunk()
    }

    #[inline]
    pub fn has_outgoing(&self) -> bool {
        !self.peer.outgoing.is_empty()
    }

    /// Mark `amt` bytes of [Connection::outgoing] as written.
    pub fn advance(&mut self, amt: usize) {
        self.peer.outgoing.advance(amt);
        // The response is always the first queued frame.
        self.response_left = self.response_left.saturating_sub(amt);
        if self.peer.status == Status::Responding && self.response_left == 0 {
            debug!("[{}] handshake complete", self.peer.id);
            self.peer.status = Status::Open;
        }
        if self.peer.status == Status::Closing && self.peer.outgoing.is_empty() {
            debug!("[{}] close frame flushed", self.peer.id);
            self.peer.status = Status::Closed;
        }
    }

    /// Read until the transport would block.
    ///
    /// End-of-stream closes the connection without an error.
    pub fn on_readable<R>(
        &mut self,
        io: &mut R,
        buf: &mut [u8],
        now: Instant,
        handler: &mut impl Handler,
    ) -> Result<()>
    where
        R: io::Read + ?Sized,
    {
        debug_assert!(!buf.is_empty());
        while matches!(
            self.peer.status,
            Status::Connecting | Status::Responding | Status::Open
        ) {
            match io.read(buf) {
                Ok(0) => {
                    debug!("[{}] end of stream", self.peer.id);
                    self.peer.status = Status::Closed;
                }
                Ok(amt) => self.receive(&buf[..amt], now, handler)?,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.peer.status = Status::Closed;
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    /// Write queued frames until the queue is empty or the transport would block.
    ///
    /// A partial write resumes from where it stopped on the next call.
    pub fn on_writable<W>(&mut self, io: &mut W) -> Result<()>
    where
        W: io::Write + ?Sized,
    {
        while self.has_outgoing() {
            match io.write(self.outgoing()) {
                Ok(0) => {
                    self.peer.status = Status::Closed;
                    return Err(io::Error::from(io::ErrorKind::WriteZero).into());
                }
                Ok(amt) => self.advance(amt),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.peer.status = Status::Closed;
                    return Err(err.into());
                }
            }
        }
        match io.flush() {
            Err(err) if err.kind() != io::ErrorKind::WouldBlock => Err(err.into()),
            _ => Ok(()),
        }
    }

    /// One readiness round over a non-blocking transport: read, liveness, write.
    ///
    /// When reading or the liveness check fails, one write is attempted before returning
    /// the error, so the close frame reporting it has a chance to reach the peer.
    pub fn on_ready<S>(
        &mut self,
        io: &mut S,
        buf: &mut [u8],
        now: Instant,
        handler: &mut impl Handler,
    ) -> Result<()>
    where
        S: io::Read + io::Write + ?Sized,
    {
        let result = self
            .on_readable(io, buf, now, handler)
            .and_then(|()| self.tick(now));
        if let Err(err) = result {
            let _ = self.on_writable(io);
            return Err(err);
        }
        self.on_writable(io)
    }

    // ------------------------------------------------------------------------

    fn check_pong(&mut self, now: Instant) -> Result<()> {
        let Some(sent) = self.ping_sent else {
            return Ok(());
        };
        if now.saturating_duration_since(sent) < self.config.pong_wait {
            return Ok(());
        }
        let err = Error::PongTimeout(self.config.pong_wait);
        self.fail(&err);
        Err(err)
    }

    fn read_handshake(&mut self, bytes: &[u8], handler: &mut impl Handler) -> Result<()> {
        let max = self.config.max_header_size;
        self.head.extend_from_slice(bytes);
        // A terminator may straddle the previous read.
        let from = self.scanned.saturating_sub(3);
        self.scanned = self.head.len();
        let end = match find_header_end(&self.head[from..]) {
            Some(end) if from + end <= max => from + end,
            Some(_) => return Err(Error::HeaderTooLarge(max)),
            None if self.head.len() >= max => return Err(Error::HeaderTooLarge(max)),
            None => return Ok(()),
        };
        let rest = self.head.split_off(end);
        let http = match std::str::from_utf8(&self.head) {
            Ok(text) => Http::parse(text),
            Err(_) => return proto_err("handshake is not valid utf-8"),
        };
        self.head = Vec::new();
        self.scanned = 0;
        debug!("[{}] upgrade request: {}", self.peer.id, http.prefix);

        let response = handshake::negotiate(&http.headers, &self.config.protocol)?;
        self.peer.headers = http.headers;
        self.response_left = response.len();
        self.peer.outgoing.push(response.into_bytes());
        self.peer.status = Status::Responding;

        // Frames may follow the request in the same read, the 101 response is queued first.
        self.read_frames(&rest, handler)
    }

    fn read_frames(&mut self, mut bytes: &[u8], handler: &mut impl Handler) -> Result<()> {
        while !bytes.is_empty() && self.peer.can_send() {
            let mut frame = match self.pending.take() {
                Some(frame) => frame,
                None => self.pool.acquire(),
            };
            let amt = frame.feed(bytes, self.config.max_frame_size)?;
            bytes = &bytes[amt..];

            if frame.is_complete() {
                self.dispatch(frame, handler)?;
            } else {
                self.pending = Some(frame);
            }
        }
        Ok(())
    }

    /// Control frames are answered right away, even in the middle of a fragmented message.
    fn dispatch(&mut self, frame: Frame, handler: &mut impl Handler) -> Result<()> {
        trace!("[{}] received {:?}", self.peer.id, frame);
        match frame.opcode() {
            Opcode::Close => {
                let code = frame
                    .payload()
                    .get(..2)
                    .map(|bytes| u16::from_be_bytes([bytes[0], bytes[1]]));
                debug!("[{}] received close: {:?}", self.peer.id, code);
                self.pool.release(frame);
                self.fragments.clear();
                match code {
                    None => self.peer.close(()),
                    Some(code) if is_valid_close_code(code) => self.peer.close(code),
                    Some(_) => self.peer.close(CloseCode::ProtocolError),
                }
            }
            Opcode::Ping => {
                self.peer.send(Event::Pong(frame.payload()));
                self.pool.release(frame);
            }
            Opcode::Pong => {
                self.ping_sent = None;
                self.pool.release(frame);
            }
            Opcode::Text | Opcode::Binary | Opcode::Continuation => self.on_data(frame, handler)?,
        }
        Ok(())
    }

    fn on_data(&mut self, frame: Frame, handler: &mut impl Handler) -> Result<()> {
        let max = self.config.max_message_size;
        if !frame.fin() {
            return self.fragments.push(frame, &mut self.pool, max);
        }
        if self.fragments.is_empty() {
            let ty = match frame.opcode() {
                Opcode::Text => DataType::Text,
                Opcode::Binary => DataType::Binary,
                _ => return proto_err("continuation frame without a message"),
            };
            handler.on_message(&mut self.peer, ty, frame.payload());
            self.pool.release(frame);
        } else {
            let (ty, data) = self.fragments.assemble(frame, &mut self.pool, max)?;
            handler.on_message(&mut self.peer, ty, data);
        }
        Ok(())
    }

    fn fail(&mut self, err: &Error) {
        warn!("[{}] {err}", self.peer.id);
        if let Some(code) = err.close_code() {
            self.peer.close(code);
        }
        self.peer.status = Status::Closed;
        self.ping_sent = None;
        self.pending = None;
        self.fragments.clear();
    }
}

fn is_valid_close_code(code: u16) -> bool {
    match CloseCode::try_from(code) {
        Ok(code) => code.is_sendable(),
        // 3000-3999 registered, 4000-4999 private use.
        Err(code) => (3000..=4999).contains(&code),
    }
}
