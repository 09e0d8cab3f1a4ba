//! Incremental response delivery.
//!
//! # Data Flow
//! ```text
//! Handler output buffer
//!     → chunked.rs (ChunkEncoder: flush / data / end)
//!     → sink.rs (FrameSink)
//!         → WireFrames: literal "<hex>\r\n<bytes>\r\n" ... "0\r\n\r\n"
//!         → BodyFrames: channel → streamed axum body
//! ```
//!
//! # Design Decisions
//! - Only external requests get a sink; internal dispatches cannot stream
//! - The encoder owns the started/finished state, the context owns the buffer

pub mod chunked;
pub mod sink;

use thiserror::Error;

pub use chunked::{encode_frame, Chunk, ChunkEncoder, StreamState, TERMINATOR};
pub use sink::{BodyFrames, FrameSink, StreamEvent, StreamHead, WireFrames};

/// Errors raised while streaming a response.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The terminator was already sent.
    #[error("response already finished")]
    Finished,

    /// This dispatch has no client connection to stream to.
    #[error("streaming is not available for internal requests")]
    Unavailable,

    #[error("stream write failed: {0}")]
    Io(#[from] std::io::Error),
}
