// src/encode/ans/symbol_coder.rs

use crate::encode::ans::Symbol;
use crate::encode::ans::bit_stack::BitStack;
use crate::encode::ans::table::{MAGNITUDE_TABLES, SIGN_TABLES, TansTable};
use crate::encode::constants::{
    ANS_CARDINALITY_TABLE, ANS_STATE_BITS, CTX_NT_HALF_IDX, CTX_NT_QUANT_BINS, NUM_ANS_STATES,
    max_module,
};
use crate::encode::params::CodecParams;
use crate::utils::error::{CodecError, Result};

/// Buffers residual symbols and codes them segment by segment.
///
/// Symbols are coded last-to-first so that the decoder, which runs forward,
/// sees them in scan order. The output is the raw first sample followed by
/// one self-contained bit segment per `buffer_size` symbols.
pub struct SymbolCoder {
    buffer: Vec<Symbol>,
    /// Symbols in the current segment, including a stored raw sample.
    symbols_in_buffer: usize,
    buffer_size: usize,
    /// Encoder state as an offset from the start of the state range.
    state: u32,
    stack: BitStack,
    out: Vec<u8>,
    geometric_iterations: usize,
    failed: bool,
}

impl SymbolCoder {
    pub fn new(params: &CodecParams) -> Self {
        let buffer_size = params.buffer_size();
        SymbolCoder {
            buffer: Vec::with_capacity(buffer_size),
            symbols_in_buffer: 0,
            buffer_size,
            state: 0,
            stack: BitStack::new(params.stack_capacity(), params.max_bpp),
            out: Vec::new(),
            geometric_iterations: 0,
            failed: false,
        }
    }

    /// Bytes emitted so far.
    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Magnitude table lookups performed so far.
    pub fn geometric_iterations(&self) -> usize {
        self.geometric_iterations
    }

    /// Writes a sample verbatim. It still counts towards the segment size.
    pub fn store_pixel(&mut self, pixel: u8) {
        self.symbols_in_buffer += 1;
        self.out.push(pixel);
        if self.symbols_in_buffer >= self.buffer_size {
            log::warn!("symbol buffer is full after storing a raw sample");
        }
    }

    /// Queues a symbol, coding the segment once it is full.
    pub fn push_symbol(&mut self, symbol: Symbol) -> Result<()> {
        self.symbols_in_buffer += 1;
        self.buffer.push(symbol);
        if self.symbols_in_buffer >= self.buffer_size {
            self.code_symbol_buffer()?;
        }
        Ok(())
    }

    /// Codes every buffered symbol, closes the segment with the final state
    /// and appends it to the output.
    pub fn code_symbol_buffer(&mut self) -> Result<()> {
        if self.symbols_in_buffer == 0 {
            return Ok(());
        }
        let result = self.code_segment();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn code_segment(&mut self) -> Result<()> {
        log::trace!(
            "coding segment of {} symbols at output offset {}",
            self.symbols_in_buffer,
            self.out.len()
        );
        while let Some(symbol) = self.buffer.pop() {
            self.code_sign(symbol.y, symbol.p_id)?;
            self.code_magnitude(&symbol)?;
        }
        self.store_state()?;
        self.stack.flush_into(&mut self.out)?;
        self.symbols_in_buffer = 0;
        Ok(())
    }

    /// Returns the coded stream. Fails if symbols were never coded.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.symbols_in_buffer != 0 || !self.stack.is_empty() {
            self.failed = true;
            return Err(CodecError::PendingSymbols {
                symbols: self.symbols_in_buffer,
                bytes: self.stack.len(),
            });
        }
        Ok(std::mem::take(&mut self.out))
    }

    fn code_sign(&mut self, y: u32, p_id: u32) -> Result<()> {
        let half = CTX_NT_HALF_IDX as u32;
        if p_id == half {
            return self.stack.push_bits(y, 1);
        }
        let (mode, y) = if p_id < half {
            (p_id, y)
        } else {
            (CTX_NT_QUANT_BINS as u32 - p_id, y ^ 1)
        };
        self.encode(&SIGN_TABLES[mode as usize], y)
    }

    fn code_magnitude(&mut self, symbol: &Symbol) -> Result<()> {
        let table = &MAGNITUDE_TABLES[symbol.theta_id];
        let cardinality = ANS_CARDINALITY_TABLE[symbol.theta_id];
        let max_allowed = max_module(symbol.theta_id);

        let mut remainder = symbol.z;
        let mut ans_symbol = symbol.z & (cardinality - 1);
        if symbol.z >= max_allowed {
            if symbol.escape_bits < 32 && symbol.z >> symbol.escape_bits != 0 {
                return Err(CodecError::InvalidData(format!(
                    "magnitude {} does not fit a {}-bit escape field",
                    symbol.z, symbol.escape_bits
                )));
            }
            self.stack.push_bits(symbol.z, symbol.escape_bits)?;
            remainder = max_allowed;
            ans_symbol = cardinality;
        }

        loop {
            remainder -= ans_symbol;
            self.encode(table, ans_symbol)?;
            self.geometric_iterations += 1;
            ans_symbol = cardinality;
            if remainder == 0 {
                break;
            }
        }
        Ok(())
    }

    #[inline]
    fn encode(&mut self, table: &TansTable, symbol: u32) -> Result<()> {
        let entry = table.encode_entry(self.state, symbol);
        // At most ANS_STATE_BITS bits, so the offset has the same low bits
        // as the full state.
        self.stack.push_bits(self.state, entry.bits as u32)?;
        self.state = entry.next_state as u32;
        Ok(())
    }

    /// Pushes the final state with its leading one as a marker bit.
    fn store_state(&mut self) -> Result<()> {
        self.stack
            .push_bits(self.state + NUM_ANS_STATES, ANS_STATE_BITS + 1)?;
        self.state = 0;
        Ok(())
    }
}

impl Drop for SymbolCoder {
    fn drop(&mut self) {
        if self.failed || std::thread::panicking() {
            return;
        }
        if self.symbols_in_buffer != 0 {
            log::error!(
                "symbol coder dropped with {} symbols in the buffer; call code_symbol_buffer() first",
                self.symbols_in_buffer
            );
        }
        if !self.stack.is_empty() {
            log::error!("symbol coder dropped with bits left in the bit stack");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> CodecParams {
        CodecParams::new().with_buffer_exp(0)
    }

    #[test]
    fn test_raw_sample_leads_the_stream() {
        let mut coder = SymbolCoder::new(&small_params());
        coder.store_pixel(0xA5);
        coder.code_symbol_buffer().unwrap();
        let out = coder.finish().unwrap();
        // The raw sample, then the bare initial state with its marker.
        assert_eq!(out, vec![0xA5, 0b0100_0000]);
    }

    #[test]
    fn test_full_segment_is_coded_immediately() {
        let params = small_params();
        let mut coder = SymbolCoder::new(&params);
        coder.store_pixel(0);
        for _ in 1..params.buffer_size() {
            coder.push_symbol(Symbol::default()).unwrap();
        }
        // The segment closed itself; nothing is pending.
        assert!(coder.len() > 1);
        let len = coder.len();
        coder.code_symbol_buffer().unwrap();
        assert_eq!(coder.len(), len);
        assert!(coder.geometric_iterations() >= params.buffer_size() - 1);
        coder.finish().unwrap();
    }

    #[test]
    fn test_finish_with_pending_symbols_fails() {
        let mut coder = SymbolCoder::new(&small_params());
        coder.store_pixel(1);
        coder.push_symbol(Symbol::default()).unwrap();
        let err = coder.finish().unwrap_err();
        assert!(matches!(err, CodecError::PendingSymbols { symbols: 2, .. }));
    }

    #[test]
    fn test_escape_rejects_oversized_magnitude() {
        let mut coder = SymbolCoder::new(&small_params());
        coder.store_pixel(0);
        coder
            .push_symbol(Symbol {
                z: 300,
                escape_bits: 7,
                ..Symbol::default()
            })
            .unwrap();
        let err = coder.code_symbol_buffer().unwrap_err();
        assert!(matches!(err, CodecError::InvalidData(_)));
    }
}
