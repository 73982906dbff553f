use crate::*;

/// Collects the payloads of a fragmented message until its final frame arrives.
///
/// ```txt
/// Client: FIN=0, opcode=0x1, msg="and a"      -> push
/// Client: FIN=0, opcode=0x0, msg="happy new"  -> push
/// Client: FIN=1, opcode=0x0, msg="year!"      -> assemble
/// ```
///
/// Payloads are copied out as they arrive and every frame goes straight back to the
/// pool, so memory follows the bytes received, not the number of fragments.
#[derive(Debug, Default)]
pub struct Fragments {
    ty: Option<DataType>,
    buf: Vec<u8>,
}

impl Fragments {
    /// Whether no fragmented message is in progress.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ty.is_none()
    }

    /// Number of payload bytes buffered so far.
    #[inline]
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.buf.len()
        }
    }

    /// Buffer a non-final data frame.
    ///
    /// The first frame of a message must be `Text` or `Binary`, every later one `Continuation`.
    pub fn push(&mut self, frame: Frame, pool: &mut BufferPool, max_message_size: usize) -> Result<()> {
        self.append(&frame, max_message_size)?;
        pool.release(frame);
        Ok(())
    }

    /// Append `last` to the buffered payloads.
    ///
    /// Returns the message type of the first fragment and the joined payload, the
    /// assembler is left empty.
    pub fn assemble(
        &mut self,
        last: Frame,
        pool: &mut BufferPool,
        max_message_size: usize,
    ) -> Result<(DataType, &[u8])> {
        let ty = self.append(&last, max_message_size)?;
        pool.release(last);
        self.ty = None;
        Ok((ty, &self.buf))
    }

    /// Drop a message in progress.
    pub fn clear(&mut self) {
        self.ty = None;
        self.buf.clear();
    }

    fn append(&mut self, frame: &Frame, max_message_size: usize) -> Result<DataType> {
        let ty = match (frame.opcode(), self.ty) {
            (Opcode::Text, None) => DataType::Text,
            (Opcode::Binary, None) => DataType::Binary,
            (Opcode::Continuation, Some(ty)) => ty,
            (Opcode::Continuation, None) => return proto_err("continuation frame without a message"),
            (Opcode::Text | Opcode::Binary, Some(_)) => {
                return proto_err("expected continuation frame")
            }
            (Opcode::Close | Opcode::Ping | Opcode::Pong, _) => {
                return proto_err("control frame must not be fragmented")
            }
        };
        if self.ty.is_none() {
            // The previous message may still sit in `buf`.
            self.buf.clear();
        }
        let total = self.buf.len() + frame.payload().len();
        if total > max_message_size {
            return Err(Error::FrameTooLarge(total as u64));
        }
        self.buf.extend_from_slice(frame.payload());
        self.ty = Some(ty);
        Ok(ty)
    }
}
