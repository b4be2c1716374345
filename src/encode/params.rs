// src/encode/params.rs

//! Coding parameters: the user-facing `CodecParams` and the per-block
//! `RunParams` derived from them.

use crate::encode::constants::{
    CTX_NT_HALF_IDX, CTX_ST_PRECISION, DEFAULT_BUFFER_EXP, EE_BUFFER_BASE, EE_REMAINDER_SIZE,
    MAX_BUFFER_EXP, MAX_NEAR, MAX_SUPPORTED_BPP, MAXVAL,
};
use crate::utils::error::{CodecError, Result};

/// How the scale accumulator is mapped onto a magnitude-coding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThetaQuant {
    /// Two modes per octave of the mean magnitude.
    #[default]
    Finer,
    /// One mode per octave.
    Coarse,
}

/// Configuration for block coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecParams {
    /// Maximum absolute reconstruction error per pixel (0 = lossless).
    pub near: u8,
    /// Symbols per tANS segment are `32 << buffer_exp`.
    pub buffer_exp: u8,
    /// Bits per pixel the bit stack is sized for.
    pub max_bpp: u32,
    /// Scale-to-mode mapping. Encoder and decoder must agree.
    pub theta_quant: ThetaQuant,
}

impl Default for CodecParams {
    fn default() -> Self {
        Self {
            near: 0,
            buffer_exp: DEFAULT_BUFFER_EXP,
            max_bpp: MAX_SUPPORTED_BPP,
            theta_quant: ThetaQuant::Finer,
        }
    }
}

impl CodecParams {
    /// Lossless parameters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_near(mut self, near: u8) -> Self {
        self.near = near;
        self
    }

    pub fn with_buffer_exp(mut self, buffer_exp: u8) -> Self {
        self.buffer_exp = buffer_exp;
        self
    }

    pub fn with_max_bpp(mut self, max_bpp: u32) -> Self {
        self.max_bpp = max_bpp;
        self
    }

    pub fn with_theta_quant(mut self, theta_quant: ThetaQuant) -> Self {
        self.theta_quant = theta_quant;
        self
    }

    /// Number of symbols coded per tANS segment.
    pub fn buffer_size(&self) -> usize {
        EE_BUFFER_BASE << self.buffer_exp
    }

    /// Bytes the bit stack may hold for one segment.
    pub fn stack_capacity(&self) -> usize {
        (self.buffer_size() * self.max_bpp as usize).div_ceil(8)
    }

    /// Rejects parameters the codec cannot honor, before any coding work starts.
    pub fn validate(&self) -> Result<()> {
        if self.near > MAX_NEAR {
            return Err(CodecError::UnsupportedConfig(format!(
                "NEAR {} exceeds the supported maximum of {}",
                self.near, MAX_NEAR
            )));
        }
        if self.buffer_exp > MAX_BUFFER_EXP {
            return Err(CodecError::UnsupportedConfig(format!(
                "buffer exponent {} exceeds {}",
                self.buffer_exp, MAX_BUFFER_EXP
            )));
        }
        if self.max_bpp < 8 {
            return Err(CodecError::UnsupportedConfig(format!(
                "a bit budget of {} bpp cannot hold raw samples",
                self.max_bpp
            )));
        }
        Ok(())
    }
}

/// Quantities derived from NEAR, fixed for a whole block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    pub near: i32,
    /// Quantization step `2*NEAR + 1`.
    pub delta: i32,
    /// Number of reconstruction levels.
    pub alpha: i32,
    pub min_error: i32,
    pub max_error: i32,
    pub min_reduct_value: i32,
    pub max_reduct_value: i32,
    /// `alpha * delta`, the period used to fold reconstructed values.
    pub deco_range: i32,
    /// `floor(log2(delta))`, bits saved in the escape field.
    pub remainder_reduct_bits: u32,
    pub initial_p_idx: i64,
    pub initial_st: i64,
}

impl RunParams {
    pub fn new(near: u8) -> Self {
        let near = near as i32;
        let delta = 2 * near + 1;
        let alpha = if near == 0 {
            MAXVAL + 1
        } else {
            (MAXVAL + 2 * near) / delta + 1
        };
        let remainder_reduct_bits = delta.ilog2();

        Self {
            near,
            delta,
            alpha,
            min_error: -(alpha / 2),
            max_error: (alpha + 1) / 2 - 1,
            min_reduct_value: -near,
            max_reduct_value: MAXVAL + near,
            deco_range: alpha * delta,
            remainder_reduct_bits,
            initial_p_idx: (CTX_NT_HALF_IDX >> 1).max(CTX_NT_HALF_IDX - 2 - near as i64),
            initial_st: (2i64).max(((alpha + 32) >> 6) as i64) << CTX_ST_PRECISION,
        }
    }

    /// Width of the raw field used when a magnitude escapes the table coder.
    pub fn escape_bits(&self) -> u32 {
        EE_REMAINDER_SIZE - self.remainder_reduct_bits
    }
}
