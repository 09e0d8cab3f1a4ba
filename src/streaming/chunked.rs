//! Chunked transfer framing.
//!
//! # States
//! ```text
//! Idle → Started: first send (framing header emitted once)
//! Started → Finished: send(End) (pending output, then zero-length frame)
//! ```
//!
//! # Design Decisions
//! - Once started, a response stays chunked; there is no way back to a
//!   content-length response
//! - Empty payloads never produce a frame, so only `End` emits `0\r\n\r\n`
//! - Sends after `End` fail instead of writing past the terminator

use bytes::BytesMut;

use crate::streaming::sink::{FrameSink, StreamHead};
use crate::streaming::StreamError;

/// Zero-length frame ending a chunked body.
pub const TERMINATOR: &[u8] = b"0\r\n\r\n";

/// Frame `data` as `<hex length>\r\n<data>\r\n`.
pub fn encode_frame(data: &[u8]) -> Vec<u8> {
    let mut frame = format!("{:X}\r\n", data.len()).into_bytes();
    frame.reserve(data.len() + 2);
    frame.extend_from_slice(data);
    frame.extend_from_slice(b"\r\n");
    frame
}

/// What to send next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk<'a> {
    /// Send whatever is buffered, then keep buffering.
    Flush,
    /// Send these bytes; the buffer is left alone.
    Data(&'a [u8]),
    /// Send whatever is buffered, then the terminator. Nothing may follow.
    End,
}

/// Lifecycle of a chunked response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Started,
    Finished,
}

/// Writes output as chunked frames to a sink.
#[derive(Debug)]
pub struct ChunkEncoder<S> {
    sink: S,
    state: StreamState,
}

impl<S: FrameSink> ChunkEncoder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: StreamState::Idle,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// True once the response has committed to chunked framing.
    pub fn is_started(&self) -> bool {
        self.state != StreamState::Idle
    }

    pub fn is_finished(&self) -> bool {
        self.state == StreamState::Finished
    }

    /// Commit to chunked framing, announcing `head` to the sink.
    ///
    /// Only the first call reaches the sink.
    pub fn start(&mut self, head: &StreamHead) -> Result<(), StreamError> {
        match self.state {
            StreamState::Idle => {
                self.sink.begin(head)?;
                self.state = StreamState::Started;
                Ok(())
            }
            StreamState::Started => Ok(()),
            StreamState::Finished => Err(StreamError::Finished),
        }
    }

    /// Send a chunk, draining `buffer` for [`Chunk::Flush`] and [`Chunk::End`].
    pub fn send(&mut self, chunk: Chunk<'_>, buffer: &mut BytesMut) -> Result<(), StreamError> {
        if self.state == StreamState::Idle {
            self.start(&StreamHead::default())?;
        } else if self.is_finished() {
            return Err(StreamError::Finished);
        }

        match chunk {
            Chunk::Flush => self.drain(buffer),
            Chunk::Data(data) => self.emit(data),
            Chunk::End => {
                let drained = self.drain(buffer);
                self.state = StreamState::Finished;
                drained?;
                self.sink.end()?;
                Ok(())
            }
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn drain(&mut self, buffer: &mut BytesMut) -> Result<(), StreamError> {
        let pending = buffer.split();
        self.emit(&pending)
    }

    fn emit(&mut self, data: &[u8]) -> Result<(), StreamError> {
        if !data.is_empty() {
            self.sink.frame(data)?;
        }
        Ok(())
    }
}
