//! Per-connection state.

use crate::error::ServerError;
use crate::server::Server;
use dirsrv_core::Dn;
use dirsrv_protocol::{notice_of_disconnection, FrameBuffer};
use std::sync::Arc;
use tracing::{debug, warn};

/// One client connection.
///
/// Bytes go in through [`Connection::receive`]; encoded response frames
/// come out. A framing error sends a notice of disconnection and closes the
/// connection; later input is ignored.
pub struct Connection {
    id: u64,
    server: Arc<Server>,
    frames: FrameBuffer,
    bound: Option<Dn>,
    closed: bool,
}

impl Connection {
    pub(crate) fn new(id: u64, server: Arc<Server>) -> Self {
        let frames = FrameBuffer::new(server.config().max_frame_size);
        Self {
            id,
            server,
            frames,
            bound: None,
            closed: false,
        }
    }

    /// Connection id, used in log lines.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The identity established by the last successful bind.
    pub fn bound_dn(&self) -> Option<&Dn> {
        self.bound.as_ref()
    }

    /// True once the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Feeds received bytes and returns the frames to send back.
    pub fn receive(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        if self.closed {
            debug!(conn = self.id, bytes = data.len(), "input after close ignored");
            return out;
        }
        self.frames.extend(data);

        while !self.closed {
            match self.frames.next_frame() {
                Ok(Some(frame)) => out.extend(self.handle_frame(&frame)),
                Ok(None) => break,
                Err(err) => {
                    self.disconnect(&ServerError::Framing(err), &mut out);
                }
            }
        }
        out
    }

    /// Processes one complete frame.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        if self.closed {
            return out;
        }
        match self.server.process(self.id, &mut self.bound, frame) {
            Ok(outcome) => {
                out.extend(outcome.encode());
                if outcome.close {
                    debug!(conn = self.id, "connection closed by client");
                    self.closed = true;
                }
            }
            Err(err) => self.disconnect(&err, &mut out),
        }
        out
    }

    fn disconnect(&mut self, err: &ServerError, out: &mut Vec<Vec<u8>>) {
        warn!(conn = self.id, error = %err, "decoding error, closing connection");
        out.push(notice_of_disconnection("decoding error"));
        self.closed = true;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("bound", &self.bound)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
