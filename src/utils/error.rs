// src/utils/error.rs

use thiserror::Error;

/// The primary error type for all operations in the codec.
#[derive(Error, Debug)]
pub enum CodecError {
    /// An error occurred during I/O operations (e.g., file not found, permission denied).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bit stack ran out of room for the current coding segment.
    #[error("bit stack overflow: a {max_bpp} bpp budget ({capacity} bytes) is not enough for this block")]
    CapacityExceeded { max_bpp: u32, capacity: usize },

    /// The decoder finished a segment in a state the encoder never leaves it in.
    #[error("tANS decoder desynchronized: segment ended in state {state}, expected {expected}")]
    Desynchronized { state: u32, expected: u32 },

    /// The requested parameters or stream header cannot be handled.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfig(String),

    /// The coder was finished while it still held data that never reached the output.
    #[error("coder finished with {symbols} buffered symbols and {bytes} bytes left in the bit stack")]
    PendingSymbols { symbols: usize, bytes: usize },

    /// The input ended before the decoder had everything it needed.
    #[error("Truncated stream: {0}")]
    Truncated(String),

    /// The data is well framed but cannot be what an encoder produced.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Occurs when image dimensions do not match the expected dimensions.
    #[error("Dimension mismatch: expected {expected:?}, but got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
