// src/encode/context.rs

//! Gradient context quantization and the per-context adaptive statistics.
//!
//! Both the encoder and the decoder own one [`ContextStats`] per block and
//! feed it the same reconstructed values, so the two sides stay in lockstep
//! without any side information in the stream.

use crate::encode::constants::{
    CTX_0, CTX_ADJUST_CNT, CTX_BINS, CTX_BINS_PER_DIM, CTX_DIM_OFFSET, CTX_INITIAL_CNT,
    CTX_INITIAL_NT, CTX_NT_PRECISION, CTX_ST_PRECISION, MAX_P_IDX, MAX_ST_IDX,
};
use crate::encode::params::{RunParams, ThetaQuant};

/// A context id together with the sign that normalized its gradients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub id: usize,
    pub sign: i32,
}

impl Context {
    pub fn new(id: usize, sign: i32) -> Self {
        Context { id, sign }
    }

    /// Whether this is the flat-neighborhood context, which never carries a bias.
    pub fn is_flat(&self) -> bool {
        self.id == CTX_0
    }
}

/// Quantizes one local gradient into one of nine symmetric bins.
#[inline]
pub fn quantize_gradient(g: i32) -> i32 {
    let q = match g.unsigned_abs() {
        0 => 0,
        1..=2 => 1,
        3..=6 => 2,
        7..=20 => 3,
        _ => 4,
    };
    if g < 0 { -q } else { q }
}

/// Maps the gradient triple `(d - b, b - c, c - a)` to a context.
///
/// The triple is flipped so that its first nonzero quantized component is
/// positive; the flip is returned as the context sign.
pub fn map_gradients(g1: i32, g2: i32, g3: i32) -> Context {
    let mut q1 = quantize_gradient(g1);
    let mut q2 = quantize_gradient(g2);
    let mut q3 = quantize_gradient(g3);

    let mut sign = 1;
    if q1 < 0 || (q1 == 0 && q2 < 0) || (q1 == 0 && q2 == 0 && q3 < 0) {
        sign = -1;
        q1 = -q1;
        q2 = -q2;
        q3 = -q3;
    }

    let id = (q1 * CTX_BINS_PER_DIM + (q2 + CTX_DIM_OFFSET)) * CTX_BINS_PER_DIM
        + (q3 + CTX_DIM_OFFSET);
    debug_assert!(q1 != 0 || q2 != 0 || q3 != 0 || id as usize == CTX_0);

    Context::new(id as usize, sign)
}

/// Adaptive state of a single context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextState {
    /// Symbols seen since the last halving.
    pub cnt: i64,
    /// Bias accumulator, kept in `[-ceil(cnt/2), floor(cnt/2)]` after each update.
    pub acc: i64,
    /// Bias estimate added to the fixed prediction.
    pub mean: i64,
    /// Sign-probability accumulator.
    pub nt: i64,
    /// Quantized probability of a negative error, in `[0, 2^CTX_NT_PRECISION)`.
    pub p_idx: i64,
    /// Magnitude-scale accumulator.
    pub st: i64,
}

/// The statistics table for one block: one [`ContextState`] per context id.
#[derive(Debug, Clone)]
pub struct ContextStats {
    states: Vec<ContextState>,
    theta_quant: ThetaQuant,
}

impl ContextStats {
    /// Builds a table with every context at its initial state for `run`.
    pub fn new(run: &RunParams, theta_quant: ThetaQuant) -> Self {
        let initial = ContextState {
            cnt: CTX_INITIAL_CNT,
            acc: 0,
            mean: 0,
            nt: CTX_INITIAL_NT,
            p_idx: run.initial_p_idx,
            st: run.initial_st,
        };
        ContextStats {
            states: vec![initial; CTX_BINS],
            theta_quant,
        }
    }

    pub fn state(&self, ctx: Context) -> &ContextState {
        &self.states[ctx.id]
    }

    /// Signed bias correction for the prediction in `ctx`.
    #[inline]
    pub fn bias(&self, ctx: Context) -> i32 {
        ctx.sign * self.states[ctx.id].mean as i32
    }

    /// Whether errors in `ctx` are currently mirrored before coding.
    #[inline]
    pub fn flips_error(&self, ctx: Context) -> bool {
        self.states[ctx.id].acc > 0
    }

    /// Probability mode for the sign bit.
    #[inline]
    pub fn p_idx(&self, ctx: Context) -> u32 {
        self.states[ctx.id].p_idx as u32
    }

    /// Magnitude-coding mode: the smallest `t` with `st <= cnt * 2^t`, capped
    /// at `MAX_ST_IDX`. The finer mapping splits every octave in two.
    pub fn theta_idx(&self, ctx: Context) -> usize {
        let state = &self.states[ctx.id];
        let idx = match self.theta_quant {
            ThetaQuant::Coarse => {
                let mut idx = 0usize;
                while idx < MAX_ST_IDX && state.st > (state.cnt << idx) {
                    idx += 1;
                }
                idx
            }
            ThetaQuant::Finer => {
                let mut l = state.cnt;
                let mut e = 0usize;
                while state.st > l && e < 2 * MAX_ST_IDX {
                    l <<= 1;
                    e += 2;
                }
                if state.st > l - ((l + 2) >> 2) {
                    e += 1;
                }
                e
            }
        };
        idx.min(MAX_ST_IDX)
    }

    /// Folds one coded symbol into its context.
    ///
    /// `q_error` is the dequantized error in the sign-normalized domain, `z`
    /// and `y` the coded magnitude and sign bit. Encoder and decoder call this
    /// with identical arguments.
    pub fn update(&mut self, ctx: Context, q_error: i32, z: u32, y: u32) {
        let state = &mut self.states[ctx.id];

        if !ctx.is_flat() {
            state.acc += q_error as i64;
        }
        state.nt += (y as i64) << CTX_NT_PRECISION;
        state.st += (z as i64) << CTX_ST_PRECISION;
        state.cnt += 1;

        // Rounding range [-1/2, +1/2).
        let li = -((state.cnt + 1) >> 1);
        let ls = state.cnt >> 1;

        if li >= state.acc {
            state.mean -= 1;
            state.acc += state.cnt;
            if li >= state.acc {
                state.acc = li + 1;
            }
        } else if state.acc > ls {
            state.mean += 1;
            state.acc -= state.cnt;
            if state.acc > ls {
                state.acc = ls;
            }
        }

        state.nt -= state.p_idx;
        if li > state.nt {
            if state.p_idx > 0 {
                state.p_idx -= 1;
                state.nt += state.cnt;
            }
        } else if state.nt >= ls && state.p_idx < MAX_P_IDX {
            state.p_idx += 1;
            state.nt -= state.cnt;
        }
        debug_assert!((0..=MAX_P_IDX).contains(&state.p_idx));

        if state.cnt >= CTX_ADJUST_CNT {
            state.cnt >>= 1;
            state.acc /= 2;
            state.nt /= 2;
            state.st /= 2;
        }
    }
}
