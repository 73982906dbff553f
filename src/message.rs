use crate::*;

/// Anything that can be sent to a client as a single, unfragmented frame.
pub trait Message {
    fn encode(&self, writer: &mut Vec<u8>);
}

impl<T: Message + ?Sized> Message for &T {
    #[inline]
    fn encode(&self, writer: &mut Vec<u8>) {
        T::encode(self, writer)
    }
}

impl<T: Message + ?Sized> Message for Box<T> {
    #[inline]
    fn encode(&self, writer: &mut Vec<u8>) {
        T::encode(self, writer)
    }
}

impl Message for str {
    #[inline]
    fn encode(&self, writer: &mut Vec<u8>) {
        encode(writer, true, Opcode::Text, self.as_bytes(), None);
    }
}

impl Message for String {
    #[inline]
    fn encode(&self, writer: &mut Vec<u8>) {
        self.as_str().encode(writer)
    }
}

impl Message for [u8] {
    #[inline]
    fn encode(&self, writer: &mut Vec<u8>) {
        encode(writer, true, Opcode::Binary, self, None);
    }
}

impl<const N: usize> Message for [u8; N] {
    #[inline]
    fn encode(&self, writer: &mut Vec<u8>) {
        encode(writer, true, Opcode::Binary, self, None);
    }
}

impl Message for Vec<u8> {
    #[inline]
    fn encode(&self, writer: &mut Vec<u8>) {
        self.as_slice().encode(writer)
    }
}

/// Ping or Pong control frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    Ping(&'a [u8]),
    Pong(&'a [u8]),
}

impl Message for Event<'_> {
    #[inline]
    fn encode(&self, writer: &mut Vec<u8>) {
        match self {
            Event::Ping(data) => encode(writer, true, Opcode::Ping, control_payload(data), None),
            Event::Pong(data) => encode(writer, true, Opcode::Pong, control_payload(data), None),
        }
    }
}

/// - The Close frame MAY contain a body that indicates a reason for closing.
pub trait CloseReason {
    fn encode(self, writer: &mut Vec<u8>);
}

impl CloseReason for () {
    fn encode(self, writer: &mut Vec<u8>) {
        encode(writer, true, Opcode::Close, &[], None);
    }
}

impl CloseReason for u16 {
    fn encode(self, writer: &mut Vec<u8>) {
        encode(writer, true, Opcode::Close, &self.to_be_bytes(), None);
    }
}

impl CloseReason for CloseCode {
    fn encode(self, writer: &mut Vec<u8>) {
        CloseReason::encode(u16::from(self), writer)
    }
}

impl<Code, Msg> CloseReason for (Code, Msg)
where
    Code: Into<u16>,
    Msg: AsRef<[u8]>,
{
    fn encode(self, writer: &mut Vec<u8>) {
        let (code, reason) = (self.0.into(), self.1.as_ref());
        let mut data = Vec::with_capacity(2 + reason.len());
        data.extend_from_slice(&code.to_be_bytes());
        data.extend_from_slice(reason);
        encode(writer, true, Opcode::Close, control_payload(&data), None);
    }
}

/// Control frames MUST have a payload length of 125 bytes or less.
#[inline]
fn control_payload(data: &[u8]) -> &[u8] {
    &data[..data.len().min(125)]
}

// ------------------------------------------------------------------------------

/// Append a frame to `writer`.
///
/// Frames sent by the server are never masked, `mask` exists to play the client side.
///
/// ### Example
///
/// ```rust
/// use web_socket_server::{message::encode, Opcode};
///
/// let mut bytes = vec![];
/// encode(&mut bytes, true, Opcode::Text, b"Hello", None);
/// assert_eq!(bytes, [0x81, 0x05, 0x48, 0x65, 0x6c, 0x6c, 0x6f]);
/// ```
pub fn encode(writer: &mut Vec<u8>, fin: bool, opcode: Opcode, data: &[u8], mask: Option<[u8; 4]>) {
    let data_len = data.len();
    writer.reserve(MAX_HEADER_SIZE + data_len);

    let mask_bit = if mask.is_some() { 0x80 } else { 0 };
    writer.push(((fin as u8) << 7) | u8::from(opcode));

    if data_len < 126 {
        writer.push(mask_bit | data_len as u8);
    } else if data_len < 65536 {
        writer.push(mask_bit | 126);
        writer.extend_from_slice(&(data_len as u16).to_be_bytes());
    } else {
        writer.push(mask_bit | 127);
        writer.extend_from_slice(&(data_len as u64).to_be_bytes());
    }

    match mask {
        None => writer.extend_from_slice(data),
        Some(keys) => {
            writer.extend_from_slice(&keys);
            let start = writer.len();
            writer.extend_from_slice(data);
            apply_mask(&mut writer[start..], keys);
        }
    }
}

/// Append a frame masked with a random key, as a client would send it.
#[inline]
pub fn encode_masked(writer: &mut Vec<u8>, fin: bool, opcode: Opcode, data: &[u8]) {
    encode(writer, fin, opcode, data, Some(rand_key()));
}
