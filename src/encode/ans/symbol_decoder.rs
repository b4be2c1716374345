// src/encode/ans/symbol_decoder.rs

use crate::encode::ans::bit_reader::BitReader;
use crate::encode::ans::table::{MAGNITUDE_TABLES, SIGN_TABLES, TansTable};
use crate::encode::constants::{
    ANS_CARDINALITY_TABLE, ANS_I_RANGE_START, ANS_STATE_BITS, CTX_NT_HALF_IDX, CTX_NT_QUANT_BINS,
    EE_MAX_ITERATIONS,
};
use crate::utils::error::{CodecError, Result};

/// Reads back the stream produced by [`SymbolCoder`](super::SymbolCoder).
///
/// The decoder tracks how many symbols are left in the current segment and
/// checks at every segment boundary that the coder state returned to the
/// start of the state range.
pub struct SymbolDecoder<'a> {
    reader: BitReader<'a>,
    state: u32,
    ready: bool,
    /// Symbols left in the current segment.
    segment_left: usize,
    /// Symbols in the segments after the current one.
    remaining: usize,
    buffer_size: usize,
}

impl<'a> SymbolDecoder<'a> {
    pub fn new(data: &'a [u8], total_symbols: usize, buffer_size: usize) -> Self {
        let segment_left = total_symbols.min(buffer_size);
        SymbolDecoder {
            reader: BitReader::new(data),
            state: 0,
            ready: false,
            segment_left,
            remaining: total_symbols - segment_left,
            buffer_size,
        }
    }

    /// Symbols not yet decoded.
    pub fn remaining_symbols(&self) -> usize {
        self.segment_left + self.remaining
    }

    /// Whole bytes consumed, rounding a partially read byte up.
    pub fn bytes_consumed(&self) -> usize {
        self.reader.position().div_ceil(8)
    }

    /// Reads a sample stored verbatim.
    pub fn retrieve_pixel(&mut self) -> Result<u8> {
        self.check_pending()?;
        let pixel = self.reader.get_byte()?;
        self.symbol_done()?;
        Ok(pixel)
    }

    /// Decodes one residual as `(y, z)`. The magnitude comes first because it
    /// was coded last.
    pub fn retrieve_symbol(
        &mut self,
        theta_id: usize,
        p_id: u32,
        escape_bits: u32,
    ) -> Result<(u32, u32)> {
        self.check_pending()?;
        if !self.ready {
            self.init_ans()?;
        }
        let z = self.decode_magnitude(theta_id, escape_bits)?;
        let y = self.decode_sign(p_id)?;
        self.symbol_done()?;
        Ok((y, z))
    }

    fn check_pending(&self) -> Result<()> {
        if self.segment_left == 0 {
            return Err(CodecError::InvalidData(
                "more symbols requested than the block holds".to_string(),
            ));
        }
        Ok(())
    }

    /// Skips the zero padding above the marker bit and loads the final
    /// encoder state of the segment.
    fn init_ans(&mut self) -> Result<()> {
        while self.reader.get_bit()? == 0 {}
        self.state = 1;
        for _ in 0..ANS_STATE_BITS {
            self.state = (self.state << 1) | self.reader.get_bit()?;
        }
        self.ready = true;
        Ok(())
    }

    fn symbol_done(&mut self) -> Result<()> {
        self.segment_left -= 1;
        if self.segment_left == 0 {
            self.finish_segment()?;
            self.segment_left = self.remaining.min(self.buffer_size);
            self.remaining -= self.segment_left;
        }
        Ok(())
    }

    fn finish_segment(&mut self) -> Result<()> {
        // A segment holding only the raw sample still carries its state.
        if !self.ready {
            self.init_ans()?;
        }
        if self.state != ANS_I_RANGE_START {
            return Err(CodecError::Desynchronized {
                state: self.state,
                expected: ANS_I_RANGE_START,
            });
        }
        self.state = 0;
        self.ready = false;
        Ok(())
    }

    #[inline]
    fn decode(&mut self, table: &TansTable) -> Result<u32> {
        let entry = table.decode_entry(self.state);
        self.state = entry.prev_state as u32;
        while self.state < ANS_I_RANGE_START {
            self.state = (self.state << 1) | self.reader.get_bit()?;
        }
        Ok(entry.symbol as u32)
    }

    fn decode_sign(&mut self, p_id: u32) -> Result<u32> {
        let half = CTX_NT_HALF_IDX as u32;
        if p_id == half {
            return self.reader.get_bit();
        }
        if p_id < half {
            self.decode(&SIGN_TABLES[p_id as usize])
        } else {
            let mode = CTX_NT_QUANT_BINS as u32 - p_id;
            Ok(self.decode(&SIGN_TABLES[mode as usize])? ^ 1)
        }
    }

    fn decode_magnitude(&mut self, theta_id: usize, escape_bits: u32) -> Result<u32> {
        let table = &MAGNITUDE_TABLES[theta_id];
        let cardinality = ANS_CARDINALITY_TABLE[theta_id];

        let mut ans_symbol = self.decode(table)?;
        let mut module = ans_symbol;
        let mut iterations = 1;
        while ans_symbol >= cardinality {
            if iterations >= EE_MAX_ITERATIONS {
                return self.reader.get_bits(escape_bits);
            }
            ans_symbol = self.decode(table)?;
            module += ans_symbol;
            iterations += 1;
        }
        Ok(module)
    }
}
