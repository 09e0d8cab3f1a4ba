//! Destinations for chunked frames.
//!
//! # Responsibilities
//! - `WireFrames`: write literal chunked framing to any `io::Write`
//!   (command-line runs, raw sockets)
//! - `BodyFrames`: forward frame payloads over a bounded channel to the HTTP
//!   layer, which hands them to hyper as a streamed body
//!
//! # Design Decisions
//! - `BodyFrames` blocks the producing thread while the channel is full, so a
//!   slow client holds at most `capacity` frames in memory. It must only be
//!   used off the async runtime (the server runs dispatch on `spawn_blocking`)

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use std::io::{self, Write};
use tokio::sync::mpsc;

use crate::streaming::chunked::{encode_frame, TERMINATOR};

/// Status and headers in effect when streaming starts.
#[derive(Debug, Clone, Default)]
pub struct StreamHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Receives the frames of one chunked response.
pub trait FrameSink: Send {
    /// Called once, before the first frame.
    fn begin(&mut self, head: &StreamHead) -> io::Result<()> {
        let _ = head;
        Ok(())
    }

    /// A non-empty frame payload.
    fn frame(&mut self, data: &[u8]) -> io::Result<()>;

    /// The zero-length terminator. No calls follow.
    fn end(&mut self) -> io::Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn begin(&mut self, head: &StreamHead) -> io::Result<()> {
        (**self).begin(head)
    }

    fn frame(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).frame(data)
    }

    fn end(&mut self) -> io::Result<()> {
        (**self).end()
    }
}

/// Writes `<hex len>\r\n<data>\r\n` frames and the terminator to a writer.
#[derive(Debug)]
pub struct WireFrames<W> {
    writer: W,
}

impl<W: Write + Send> WireFrames<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> FrameSink for WireFrames<W> {
    fn frame(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(&encode_frame(data))?;
        self.writer.flush()
    }

    fn end(&mut self) -> io::Result<()> {
        self.writer.write_all(TERMINATOR)?;
        self.writer.flush()
    }
}

/// Events consumed by the HTTP layer.
#[derive(Debug)]
pub enum StreamEvent {
    Start(StreamHead),
    Data(Bytes),
    End,
}

/// Forwards frames to a bounded channel; transfer framing is left to the
/// HTTP stack.
#[derive(Debug)]
pub struct BodyFrames {
    tx: mpsc::Sender<StreamEvent>,
}

impl BodyFrames {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    /// Waits for room in the channel.
    fn push(&self, event: StreamEvent) -> io::Result<()> {
        self.tx
            .blocking_send(event)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))
    }
}

impl FrameSink for BodyFrames {
    fn begin(&mut self, head: &StreamHead) -> io::Result<()> {
        self.push(StreamEvent::Start(head.clone()))
    }

    fn frame(&mut self, data: &[u8]) -> io::Result<()> {
        self.push(StreamEvent::Data(Bytes::copy_from_slice(data)))
    }

    fn end(&mut self) -> io::Result<()> {
        self.push(StreamEvent::End)
    }
}
