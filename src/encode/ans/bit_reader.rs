// src/encode/ans/bit_reader.rs

use crate::utils::error::{CodecError, Result};
use bitvec::order::Msb0;
use bitvec::prelude::*;

/// MSB-first reader over one block payload.
#[derive(Debug)]
pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            bits: data.view_bits::<Msb0>(),
            pos: 0,
        }
    }

    /// Bits consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bits left in the payload.
    pub fn remaining(&self) -> usize {
        self.bits.len() - self.pos
    }

    #[inline]
    pub fn get_bit(&mut self) -> Result<u32> {
        match self.bits.get(self.pos) {
            Some(bit) => {
                self.pos += 1;
                Ok(u32::from(*bit))
            }
            None => Err(CodecError::Truncated(format!(
                "needed a bit at offset {} of a {}-bit payload",
                self.pos,
                self.bits.len()
            ))),
        }
    }

    /// Reads `num_bits` bits, first bit most significant.
    pub fn get_bits(&mut self, num_bits: u32) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..num_bits {
            value = (value << 1) | self.get_bit()?;
        }
        Ok(value)
    }

    /// Reads a whole byte. A partially read byte is discarded first.
    pub fn get_byte(&mut self) -> Result<u8> {
        if self.pos % 8 != 0 {
            log::warn!(
                "discarding {} unread bits before a raw byte",
                8 - self.pos % 8
            );
            self.pos = self.pos.next_multiple_of(8);
        }
        if self.remaining() < 8 {
            return Err(CodecError::Truncated(
                "payload ended before a raw sample".to_string(),
            ));
        }
        Ok(self.get_bits(8)? as u8)
    }
}
