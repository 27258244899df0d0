//! Splitting a byte stream into LDAPMessage frames.

use crate::error::ProtocolResult;
use bytes::{Bytes, BytesMut};
use dirsrv_codec::{element_length, CodecError, Tag};

/// Default upper bound on one frame.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Accumulates stream bytes and yields complete top-level frames.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    max_frame_size: usize,
}

impl FrameBuffer {
    /// Creates a buffer that rejects frames above `max_frame_size` bytes.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_size,
        }
    }

    /// Appends bytes read from the stream.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet returned as frames.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the next complete frame, or `None` if more bytes are needed.
    ///
    /// Errors are framing errors; the buffer is unusable afterwards.
    pub fn next_frame(&mut self) -> ProtocolResult<Option<Bytes>> {
        let Some(&first) = self.buffer.first() else {
            return Ok(None);
        };
        if first != 0x30 {
            return Err(CodecError::invalid_tag(format!(
                "frame starts with 0x{first:02x}, expected a SEQUENCE"
            ))
            .into());
        }

        let Some((tag, total)) = element_length(&self.buffer)? else {
            self.check_size(self.buffer.len() as u64)?;
            return Ok(None);
        };
        debug_assert_eq!(tag, Tag::SEQUENCE);
        self.check_size(total)?;

        // `check_size` bounds `total` by a usize.
        let total = total as usize;
        if self.buffer.len() < total {
            return Ok(None);
        }
        Ok(Some(self.buffer.split_to(total).freeze()))
    }

    fn check_size(&self, claimed: u64) -> ProtocolResult<()> {
        if claimed > self.max_frame_size as u64 {
            return Err(CodecError::FrameTooLarge {
                claimed,
                max_allowed: self.max_frame_size as u64,
            }
            .into());
        }
        Ok(())
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}
