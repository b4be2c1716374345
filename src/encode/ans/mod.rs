// src/encode/ans/mod.rs

//! Table-based asymmetric numeral system coding of prediction residuals.
//!
//! Each residual becomes a sign bit `y`, coded with one of the sign tables,
//! and a magnitude `z`, coded as a run of chunks with one of the magnitude
//! tables. Symbols are grouped into segments that are coded in reverse and
//! closed by the final coder state, so every segment decodes on its own.

pub mod bit_reader;
pub mod bit_stack;
pub mod symbol_coder;
pub mod symbol_decoder;
pub mod table;

pub use bit_reader::BitReader;
pub use bit_stack::BitStack;
pub use symbol_coder::SymbolCoder;
pub use symbol_decoder::SymbolDecoder;
pub use table::{DecodeEntry, EncodeEntry, MAGNITUDE_TABLES, SIGN_TABLES, TansTable};

/// One residual ready for entropy coding, with the modes selected by its
/// context at coding time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Symbol {
    /// Folded magnitude.
    pub z: u32,
    /// 1 for a negative residual.
    pub y: u32,
    /// Magnitude-coding mode.
    pub theta_id: usize,
    /// Sign probability index.
    pub p_id: u32,
    /// Width of the raw field used if `z` escapes.
    pub escape_bits: u32,
}
