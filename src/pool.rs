use crate::*;

/// Bounded stack of recycled [Frame]s.
///
/// Every connection owns its own pool, so no synchronization is involved.
///
/// ### Example
///
/// ```rust
/// use web_socket_server::BufferPool;
///
/// let mut pool = BufferPool::new(2, 1024, 4096);
/// let frame = pool.acquire();
/// pool.release(frame);
/// assert_eq!(pool.len(), 1);
/// ```
#[derive(Debug)]
pub struct BufferPool {
    frames: Vec<Frame>,
    capacity: usize,
    default_buffer_size: usize,
    max_retained_buffer: usize,
}

impl BufferPool {
    pub fn new(capacity: usize, default_buffer_size: usize, max_retained_buffer: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
            capacity,
            default_buffer_size,
            max_retained_buffer,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.pool_capacity,
            config.default_buffer_size,
            config.max_retained_buffer,
        )
    }

    /// Pop the most recently released frame, or allocate a new one.
    ///
    /// The returned frame is always reset and ready to decode.
    pub fn acquire(&mut self) -> Frame {
        match self.frames.pop() {
            Some(mut frame) => {
                frame.reset(self.default_buffer_size, self.max_retained_buffer);
                frame
            }
            None => Frame::with_capacity(self.default_buffer_size),
        }
    }

    /// Keep `frame` for later reuse, unless the pool is full.
    pub fn release(&mut self, frame: Frame) {
        if self.frames.len() < self.capacity {
            self.frames.push(frame);
        }
    }

    /// Number of idle frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
