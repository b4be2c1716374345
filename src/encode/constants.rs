// src/encode/constants.rs

//! Fixed parameters shared by the encoder and the decoder.
//!
//! Everything here is part of the bitstream contract: changing any value
//! produces streams that older decoders cannot read.

/// Bits per input sample.
pub const INPUT_BPP: u32 = 8;
/// Largest sample value.
pub const MAXVAL: i32 = (1 << INPUT_BPP) - 1;

/// Width of the raw escape field before the `floor(log2(delta))` reduction.
/// Error reduction keeps quantized errors inside `[-alpha/2, alpha/2)`, so one
/// bit less than a full sample is enough.
pub const EE_REMAINDER_SIZE: u32 = INPUT_BPP - 1;

// --- Context modeling ---

pub const CTX_BINS_PER_DIM: i32 = 9;
pub const CTX_DIM_OFFSET: i32 = (CTX_BINS_PER_DIM - 1) / 2;
pub const CTX_BINS: usize = 729;
/// Context of a flat neighborhood (all three gradients zero).
pub const CTX_0: usize = 4 * 9 + 4;

/// Statistics are halved once a context has seen this many symbols.
pub const CTX_ADJUST_CNT: i64 = 64;
pub const CTX_INITIAL_CNT: i64 = 1;
pub const CTX_INITIAL_NT: i64 = 0;

/// Fractional bits of the sign-probability accumulator.
pub const CTX_NT_PRECISION: u32 = 5;
pub const CTX_NT_QUANT_BINS: i64 = 1 << CTX_NT_PRECISION;
/// Probability index coded as a single raw bit.
pub const CTX_NT_HALF_IDX: i64 = 1 << (CTX_NT_PRECISION - 1);
/// Upper clamp of the probability index.
pub const MAX_P_IDX: i64 = CTX_NT_QUANT_BINS - 1;

/// Fractional bits of the magnitude-scale accumulator.
pub const CTX_ST_PRECISION: u32 = 0;
pub const MAX_ST_IDX: usize = NUM_ANS_THETA_MODES - 1;

// --- tANS ---

pub const NUM_ANS_STATES: u32 = 64;
pub const ANS_STATE_BITS: u32 = NUM_ANS_STATES.trailing_zeros();
pub const ANS_STATE_MASK: u32 = NUM_ANS_STATES - 1;
pub const ANS_I_RANGE_START: u32 = NUM_ANS_STATES;

pub const NUM_ANS_P_MODES: usize = CTX_NT_HALF_IDX as usize;
pub const NUM_ANS_THETA_MODES: usize = 16;

/// Largest terminal alphabet of the magnitude coder.
pub const ANS_MAX_CARDINALITY: u32 = 16;
/// Terminal symbols plus the continuation symbol.
pub const ANS_MAX_SRC_CARDINALITY: usize = ANS_MAX_CARDINALITY as usize + 1;

/// Number of continuation symbols after which a magnitude escapes to raw bits.
pub const EE_MAX_ITERATIONS: u32 = 8;

/// Terminal alphabet size per scale mode. Always a power of two.
pub const ANS_CARDINALITY_TABLE: [u32; NUM_ANS_THETA_MODES] =
    [1, 1, 1, 1, 2, 2, 4, 4, 8, 8, 16, 16, 16, 16, 16, 16];

/// Representative mean magnitude of each scale mode, used to shape the
/// magnitude tables. Even modes sit inside `(2^(t-1), 0.75*2^t]`, odd modes
/// inside `(0.75*2^t, 2^t]`, with `t = mode / 2`.
pub const ANS_THETA_MEANS: [f64; NUM_ANS_THETA_MODES] = [
    0.3, 0.87, 1.22, 1.73, 2.45, 3.46, 4.9, 6.93, 9.8, 13.86, 19.6, 27.71, 39.19, 55.43, 78.38,
    110.85,
];

// --- Framing ---

/// Worst-case bits per pixel the bit stack is sized for, by default.
pub const MAX_SUPPORTED_BPP: u32 = 16;
/// Symbols per tANS segment are `32 << buffer_exp`.
pub const EE_BUFFER_BASE: usize = 32;
pub const DEFAULT_BUFFER_EXP: u8 = 6;
pub const MAX_BUFFER_EXP: u8 = 7;

/// Upper bound on symbols carried per payload bit. Every pixel codes at least
/// one table symbol, and no symbol owns more than 63 of the 64 states.
pub const MAX_SYMBOLS_PER_BIT: u64 = 64;
/// Largest NEAR the container header can carry.
pub const MAX_NEAR: u8 = 31;

/// Largest magnitude the iterative coder handles without escaping.
pub fn max_module(theta_id: usize) -> u32 {
    ANS_CARDINALITY_TABLE[theta_id] * EE_MAX_ITERATIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinalities_are_powers_of_two() {
        for &card in ANS_CARDINALITY_TABLE.iter() {
            assert!(card.is_power_of_two());
            assert!(card <= ANS_MAX_CARDINALITY);
        }
    }

    #[test]
    fn test_flat_context_index() {
        let flat = CTX_DIM_OFFSET * CTX_BINS_PER_DIM + CTX_DIM_OFFSET;
        assert_eq!(flat as usize, CTX_0);
    }

    #[test]
    fn test_state_geometry() {
        assert_eq!(ANS_STATE_BITS, 6);
        // The final state plus its marker bit must fit one stack byte.
        assert!(ANS_STATE_BITS + 1 <= 8);
    }

    #[test]
    fn test_largest_magnitude_fits_without_escape() {
        // With NEAR = 0 magnitudes stay below 128; the widest mode codes them
        // entirely through the table.
        assert!(max_module(MAX_ST_IDX) >= 128);
    }
}
