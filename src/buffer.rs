//! Accumulates transport bytes until whole messages can be parsed.

use crate::decoder::SessionError;
use crate::messages::Error;
use crate::transport::Transport;

use bytes::{Buf, Bytes, BytesMut};

const READ_CHUNK_SIZE: usize = 4096;

/// An append-only byte buffer fed from a non-blocking transport. Parsers consume from the front
/// only after a complete message is available, so a short read never loses progress.
pub struct StreamBuffer {
    buf: BytesMut,
}

impl StreamBuffer {
    pub fn new() -> StreamBuffer {
        StreamBuffer {
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Drains everything the transport has available right now. Returns the number of bytes
    /// appended, `SessionError::TransportClosed` once the peer has shut the connection down.
    pub fn fill<T: Transport>(&mut self, transport: &mut T) -> Result<usize, SessionError> {
        let mut appended = 0;
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match transport.read(&mut chunk) {
                Ok(0) => return Err(SessionError::TransportClosed),
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    appended += n;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(appended),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SessionError::TransportError(e.to_string())),
            }
        }
    }

    /// Takes exactly `n` bytes off the front, or `None` if fewer are buffered.
    pub fn try_take(&mut self, n: usize) -> Option<Bytes> {
        if self.buf.len() >= n {
            Some(self.buf.split_to(n).freeze())
        } else {
            None
        }
    }

    /// Runs a cursor-based parser over the buffered bytes. On success the consumed prefix is
    /// discarded; on `Error::Incomplete` nothing is consumed and the caller retries after the
    /// next fill.
    pub fn try_parse<R>(
        &mut self,
        f: impl FnOnce(&mut std::io::Cursor<&[u8]>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let (result, consumed) = {
            let mut cursor = std::io::Cursor::new(&self.buf[..]);
            let result = f(&mut cursor)?;
            (result, cursor.position() as usize)
        };
        self.buf.advance(consumed);
        Ok(result)
    }

    pub fn peek(&self, n: usize) -> Option<&[u8]> {
        if self.buf.len() >= n {
            Some(&self.buf[..n])
        } else {
            None
        }
    }

    /// Discards exactly `n` bytes off the front, or `None` if fewer are buffered.
    pub fn skip(&mut self, n: usize) -> Option<()> {
        if self.buf.len() < n {
            return None;
        }
        self.buf.advance(n);
        Some(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
