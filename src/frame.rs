use crate::*;
use std::fmt;

/// 2 bytes are required, 8 possible bytes for the extended length and 4 possible bytes
/// for a masking key.
pub const MAX_HEADER_SIZE: usize = 2 + 8 + 4;

/// A single frame read from a client, decoded incrementally.
///
/// ### WebSocket Frame Header
///
/// ```txt
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
/// |     Extended payload length continued, if payload len == 127  |
/// + - - - - - - - - - - - - - - - +-------------------------------+
/// |                               |Masking-key, if MASK set to 1  |
/// +-------------------------------+-------------------------------+
/// | Masking-key (continued)       |          Payload Data         |
/// +-------------------------------- - - - - - - - - - - - - - - - +
/// :                     Payload Data continued ...                :
/// + - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - +
/// |                     Payload Data continued ...                |
/// +---------------------------------------------------------------+
/// ```
///
/// Frames are recycled through a [BufferPool], so every field the decoder
/// looks at is cleared by [Frame::reset].
pub struct Frame {
    head: [u8; MAX_HEADER_SIZE],
    head_len: usize,
    /// Known once the first two header bytes arrived.
    head_size: Option<usize>,

    fin: bool,
    opcode: Opcode,
    mask: Option<[u8; 4]>,
    /// Known once the whole header arrived.
    len: Option<u32>,

    data: Vec<u8>,
    complete: bool,
}

impl Frame {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            head: [0; MAX_HEADER_SIZE],
            head_len: 0,
            head_size: None,
            fin: false,
            opcode: Opcode::Continuation,
            mask: None,
            len: None,
            data: Vec::with_capacity(capacity),
            complete: false,
        }
    }

    /// Make this frame ready to decode a new one.
    ///
    /// The payload buffer is kept, unless it grew beyond `max_retained`, in which case
    /// it is replaced with one of `default_capacity` bytes.
    pub(crate) fn reset(&mut self, default_capacity: usize, max_retained: usize) {
        self.head = [0; MAX_HEADER_SIZE];
        self.head_len = 0;
        self.head_size = None;
        self.fin = false;
        self.opcode = Opcode::Continuation;
        self.mask = None;
        self.len = None;
        self.complete = false;

        if self.data.capacity() > max_retained {
            self.data = Vec::with_capacity(default_capacity);
        } else {
            self.data.clear();
        }
    }

    /// Consume as many bytes as this frame needs, returns the amount consumed.
    ///
    /// A return value smaller than `bytes.len()` means the frame completed, and the
    /// rest belongs to the next one.
    pub fn feed(&mut self, bytes: &[u8], max_frame_size: usize) -> Result<usize> {
        if self.complete {
            return Ok(0);
        }
        let mut amt = 0;
        let len = loop {
            if let Some(len) = self.len {
                break len as usize;
            }
            let need = self.head_size.unwrap_or(2);
            let take = (need - self.head_len).min(bytes.len() - amt);
            self.head[self.head_len..self.head_len + take].copy_from_slice(&bytes[amt..amt + take]);
            self.head_len += take;
            amt += take;

            if self.head_len < need {
                return Ok(amt);
            }
            match self.head_size {
                None => self.head_size = Some(self.parse_head()?),
                Some(_) => {
                    let len = self.parse_len_and_mask()?;
                    self.reserve(len as usize, max_frame_size)?;
                    self.len = Some(len);
                }
            }
        };

        let take = (len - self.data.len()).min(bytes.len() - amt);
        self.data.extend_from_slice(&bytes[amt..amt + take]);
        amt += take;

        if self.data.len() == len {
            if let Some(mask) = self.mask {
                apply_mask(&mut self.data, mask);
            }
            self.complete = true;
        }
        Ok(amt)
    }

    /// Validates the first two bytes and returns the full header size.
    fn parse_head(&mut self) -> Result<usize> {
        let [b1, b2] = [self.head[0], self.head[1]];

        // MUST be `0` unless an extension is negotiated that defines meanings
        // for non-zero values.
        if b1 & 0b_111_0000 != 0 {
            return proto_err("reserve bit must be `0`");
        }
        let opcode = Opcode::try_from(b1 & 0b_1111)?;
        let fin = b1 & 0b_1000_0000 != 0;
        let is_masked = b2 & 0b_1000_0000 != 0;
        let len = b2 & 0b_111_1111;

        // The server MUST close the connection upon receiving a frame that is not masked.
        if !is_masked {
            return proto_err("expected masked frame");
        }
        if opcode.is_control() {
            if !fin {
                return proto_err("control frame must not be fragmented");
            }
            if len > 125 {
                return proto_err("control frame must have a payload length of 125 bytes or less");
            }
        }
        self.fin = fin;
        self.opcode = opcode;

        let extended = match len {
            126 => 2,
            127 => 8,
            _ => 0,
        };
        Ok(2 + extended + 4)
    }

    fn parse_len_and_mask(&mut self) -> Result<u32> {
        let head = &self.head[..self.head_len];
        let (len, rest) = match head[1] & 0b_111_1111 {
            126 => (u16::from_be_bytes([head[2], head[3]]) as u32, &head[4..]),
            127 => {
                let mut be = [0; 8];
                be.copy_from_slice(&head[2..10]);
                let len = u64::from_be_bytes(be);
                // Payload lengths are bounded to 31 bits.
                if len >> 31 != 0 {
                    return Err(Error::FrameTooLarge(len));
                }
                (len as u32, &head[10..])
            }
            len => (len as u32, &head[2..]),
        };
        let mut key = [0; 4];
        key.copy_from_slice(&rest[..4]);
        self.mask = Some(key);
        Ok(len)
    }

    /// Grow the payload buffer by doubling, never beyond `max_frame_size`.
    fn reserve(&mut self, needed: usize, max_frame_size: usize) -> Result<()> {
        if needed > max_frame_size {
            return Err(Error::FrameTooLarge(needed as u64));
        }
        let mut capacity = self.data.capacity().max(MAX_HEADER_SIZE);
        if capacity >= needed {
            return Ok(());
        }
        while capacity < needed {
            capacity = capacity.saturating_mul(2).min(max_frame_size);
        }
        self.data.reserve_exact(capacity - self.data.len());
        Ok(())
    }

    /// Whether every byte of this frame has been received.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Indicates that this is the final fragment in a message.
    #[inline]
    pub fn fin(&self) -> bool {
        self.fin
    }

    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    #[inline]
    pub fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    #[inline]
    pub fn mask_key(&self) -> Option<[u8; 4]> {
        self.mask
    }

    /// Payload length announced by the header, `None` until the header is complete.
    #[inline]
    pub fn declared_len(&self) -> Option<u32> {
        self.len
    }

    /// Size of the header, `None` until the first two bytes arrived.
    #[inline]
    pub fn header_size(&self) -> Option<usize> {
        self.head_size
    }

    /// Unmasked "Payload data", empty until the frame is complete.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        if self.complete {
            &self.data
        } else {
            &[]
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.data.capacity()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("fin", &self.fin)
            .field("opcode", &self.opcode)
            .field("mask", &self.mask)
            .field("len", &self.len)
            .field("received", &self.data.len())
            .field("complete", &self.complete)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 32 * 1024 * 1024;
    const MASKED_HELLO: [u8; 11] = [
        0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58,
    ];

    fn frame() -> Frame {
        Frame::with_capacity(64)
    }

    #[test]
    fn masked_txt_msg() {
        let mut f = frame();
        assert_eq!(f.feed(&MASKED_HELLO, MAX).unwrap(), MASKED_HELLO.len());
        assert!(f.is_complete());
        assert!(f.fin());
        assert!(f.is_masked());
        assert_eq!(f.opcode(), Opcode::Text);
        assert_eq!(f.mask_key(), Some([0x37, 0xfa, 0x21, 0x3d]));
        assert_eq!(f.declared_len(), Some(5));
        assert_eq!(f.header_size(), Some(6));
        assert_eq!(f.payload(), b"Hello");
    }

    #[test]
    fn one_byte_at_a_time() {
        let mut f = frame();
        for (i, byte) in MASKED_HELLO.iter().enumerate() {
            assert!(!f.is_complete());
            assert!(f.payload().is_empty());
            assert_eq!(f.feed(&[*byte], MAX).unwrap(), 1, "byte {i}");
        }
        assert!(f.is_complete());
        assert_eq!(f.payload(), b"Hello");
    }

    #[test]
    fn empty_chunk_consumes_nothing() {
        let mut f = frame();
        assert_eq!(f.feed(&[], MAX).unwrap(), 0);
        assert_eq!(f.feed(&MASKED_HELLO[..2], MAX).unwrap(), 2);
        assert_eq!(f.feed(&[], MAX).unwrap(), 0);
        assert_eq!(f.feed(&MASKED_HELLO[2..], MAX).unwrap(), 9);
        assert_eq!(f.payload(), b"Hello");
    }

    #[test]
    fn stops_at_frame_boundary() {
        let mut bytes = MASKED_HELLO.to_vec();
        bytes.extend_from_slice(&MASKED_HELLO);

        let mut f = frame();
        assert_eq!(f.feed(&bytes, MAX).unwrap(), 11);
        assert!(f.is_complete());
        assert_eq!(f.feed(&bytes[11..], MAX).unwrap(), 0);
    }

    #[test]
    fn zero_length_ping() {
        let mut f = frame();
        assert_eq!(f.feed(&[0x89, 0x80, 1, 2, 3, 4], MAX).unwrap(), 6);
        assert!(f.is_complete());
        assert_eq!(f.opcode(), Opcode::Ping);
        assert!(f.payload().is_empty());
    }

    #[test]
    fn extended_16_bit_len() {
        let payload = vec![0; 256];
        let mut bytes = vec![0x82, 0xfe, 1, 0, 0, 0, 0, 0];
        bytes.extend_from_slice(&payload);

        let mut f = frame();
        assert_eq!(f.feed(&bytes, MAX).unwrap(), bytes.len());
        assert_eq!(f.header_size(), Some(8));
        assert_eq!(f.declared_len(), Some(256));
        assert_eq!(f.payload(), payload);
    }

    #[test]
    fn reject_unmasked_frame() {
        let mut f = frame();
        let err = f.feed(&[0x81, 0x02, b'H', b'i'], MAX).unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
    }

    #[test]
    fn reject_reserved_bits() {
        let err = frame().feed(&[0xc1, 0x80, 0, 0, 0, 0], MAX).unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
    }

    #[test]
    fn reject_unknown_opcode() {
        let err = frame().feed(&[0x83, 0x80, 0, 0, 0, 0], MAX).unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
    }

    #[test]
    fn reject_fragmented_control_frame() {
        let err = frame().feed(&[0x09, 0x80, 0, 0, 0, 0], MAX).unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));

        let err = frame().feed(&[0x89, 0xfe, 0, 126], MAX).unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
    }

    #[test]
    fn reject_len_beyond_31_bits() {
        let bytes = [0x82, 0xff, 0, 0, 0, 0, 0x80, 0, 0, 0, 1, 2, 3, 4];
        let err = frame().feed(&bytes, usize::MAX).unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge(0x8000_0000)));

        let bytes = [0x82, 0xff, 0, 0, 0, 1, 0, 0, 0, 0, 1, 2, 3, 4];
        let err = frame().feed(&bytes, usize::MAX).unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge(_)));
    }

    #[test]
    fn reject_len_beyond_max_frame_size() {
        // 1 MB declared, nothing of the payload sent yet.
        let bytes = [0x82, 0xff, 0, 0, 0, 0, 0, 0x10, 0, 0, 1, 2, 3, 4];
        let mut f = frame();
        let err = f.feed(&bytes, 512 * 1024).unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge(0x10_0000)));
        assert!(f.payload().is_empty());
    }

    #[test]
    fn grows_by_doubling() {
        let mut f = frame();
        f.reserve(1000, MAX).unwrap();
        assert!(f.capacity() >= 1024);

        let mut f = frame();
        f.reserve(100_000, 100_000).unwrap();
        assert!(f.capacity() >= 100_000);
    }

    #[test]
    fn reset_clears_decoder_state() {
        let mut f = frame();
        f.feed(&MASKED_HELLO, MAX).unwrap();
        f.reset(64, 1024);

        assert!(!f.is_complete());
        assert_eq!(f.declared_len(), None);
        assert_eq!(f.header_size(), None);
        assert_eq!(f.mask_key(), None);

        // unmasked by a different key
        let bytes = [0x82, 0x83, 1, 2, 3, 4, b'a' ^ 1, b'b' ^ 2, b'c' ^ 3];
        assert_eq!(f.feed(&bytes, MAX).unwrap(), bytes.len());
        assert_eq!(f.opcode(), Opcode::Binary);
        assert_eq!(f.payload(), b"abc");
    }

    #[test]
    fn reset_drops_oversized_buffer() {
        let mut f = frame();
        f.reserve(4096, MAX).unwrap();
        f.reset(64, 1024);
        assert!(f.capacity() < 4096);
    }
}
