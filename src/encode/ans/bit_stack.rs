// src/encode/ans/bit_stack.rs

use crate::utils::error::{CodecError, Result};

/// A last-in first-out bit store.
///
/// The encoder runs backwards over each segment, so bits are pushed into a
/// fixed-size byte stack that fills from its top. When a segment is flushed
/// the stack is emitted in address order, which lets the decoder read the
/// most recently pushed bit first, MSB-first within each byte.
#[derive(Debug)]
pub struct BitStack {
    stack: Vec<u8>,
    /// Lowest occupied byte; equals `stack.len()` when empty.
    top: usize,
    bit_buffer: u64,
    bit_ptr: u32,
    max_bpp: u32,
}

impl BitStack {
    /// Creates a stack of `capacity` bytes sized for `max_bpp` bits per symbol.
    pub fn new(capacity: usize, max_bpp: u32) -> Self {
        BitStack {
            stack: vec![0; capacity],
            top: capacity,
            bit_buffer: 0,
            bit_ptr: 0,
            max_bpp,
        }
    }

    pub fn capacity(&self) -> usize {
        self.stack.len()
    }

    /// Whole bytes held in the stack, not counting the partial byte.
    pub fn len(&self) -> usize {
        self.stack.len() - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.bit_ptr == 0
    }

    /// Pushes the low `num_bits` bits of `value`.
    #[inline]
    pub fn push_bits(&mut self, value: u32, num_bits: u32) -> Result<()> {
        debug_assert!(num_bits <= 32);
        let mask = (1u64 << num_bits) - 1;
        self.bit_buffer |= (value as u64 & mask) << self.bit_ptr;
        self.bit_ptr += num_bits;

        while self.bit_ptr >= 8 {
            self.push_byte(self.bit_buffer as u8)?;
            self.bit_buffer >>= 8;
            self.bit_ptr -= 8;
        }
        Ok(())
    }

    fn push_byte(&mut self, byte: u8) -> Result<()> {
        if self.top == 0 {
            return Err(CodecError::CapacityExceeded {
                max_bpp: self.max_bpp,
                capacity: self.stack.len(),
            });
        }
        self.top -= 1;
        self.stack[self.top] = byte;
        Ok(())
    }

    /// Pads the partial byte with zeros above the last pushed bit, appends
    /// the whole stack to `out` and leaves the stack empty.
    pub fn flush_into(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if self.bit_ptr != 0 {
            self.push_byte(self.bit_buffer as u8)?;
            self.bit_buffer = 0;
            self.bit_ptr = 0;
        }
        out.extend_from_slice(&self.stack[self.top..]);
        self.top = self.stack.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_pushed_bits_come_first() {
        let mut stack = BitStack::new(4, 16);
        stack.push_bits(0b1, 1).unwrap();
        stack.push_bits(0b0110, 4).unwrap();
        stack.push_bits(0b101, 3).unwrap();
        stack.push_bits(0b11, 2).unwrap();
        let mut out = Vec::new();
        stack.flush_into(&mut out).unwrap();

        // Partial byte holds the last two bits, padded with zeros above.
        assert_eq!(out, vec![0b0000_0011, 0b1010_1101]);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_wide_fields_span_bytes() {
        let mut stack = BitStack::new(4, 16);
        stack.push_bits(0b101, 3).unwrap();
        stack.push_bits(0xABCD, 16).unwrap();
        assert_eq!(stack.len(), 2);
        let mut out = Vec::new();
        stack.flush_into(&mut out).unwrap();
        let bits: u32 = out.iter().fold(0, |acc, &b| (acc << 8) | b as u32);
        assert_eq!(bits, (0xABCD << 3) | 0b101);
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut stack = BitStack::new(2, 8);
        stack.push_bits(0xFFFF, 16).unwrap();
        let err = stack.push_bits(0xFF, 8).unwrap_err();
        assert!(matches!(
            err,
            CodecError::CapacityExceeded {
                max_bpp: 8,
                capacity: 2
            }
        ));
    }

    #[test]
    fn test_flush_of_full_bytes_adds_no_padding() {
        let mut stack = BitStack::new(2, 8);
        stack.push_bits(0x5A, 8).unwrap();
        let mut out = vec![0xEE];
        stack.flush_into(&mut out).unwrap();
        assert_eq!(out, vec![0xEE, 0x5A]);
        assert_eq!(stack.capacity(), 2);
    }
}
