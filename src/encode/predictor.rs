// src/encode/predictor.rs

//! Causal neighborhood access, the fixed median predictor and the
//! near-lossless residual quantizer.

use crate::encode::constants::MAXVAL;
use crate::encode::params::RunParams;

/// Clamps a reconstructed value to the sample range.
#[inline]
pub fn clamp_sample(v: i32) -> u8 {
    v.clamp(0, MAXVAL) as u8
}

/// The four causal neighbors of the current pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    /// Left.
    pub a: i32,
    /// Above.
    pub b: i32,
    /// Above-left.
    pub c: i32,
    /// Above-right.
    pub d: i32,
}

impl Template {
    /// Local gradients `(d - b, b - c, c - a)` used for context selection.
    pub fn gradients(&self) -> (i32, i32, i32) {
        (self.d - self.b, self.b - self.c, self.c - self.a)
    }
}

/// Two rows of reconstructed samples with one pixel of padding on each side.
///
/// Pixels outside the block read as zero on the first row. At the right edge
/// the above-right neighbor repeats the last pixel of the row above, and at
/// the left edge the left neighbor is the pixel above.
#[derive(Debug, Clone)]
pub struct RowBuffer {
    rows: [Vec<u8>; 2],
    /// Index of the row being written.
    current: usize,
}

impl RowBuffer {
    pub fn new(cols: usize) -> Self {
        RowBuffer {
            rows: [vec![0; cols + 2], vec![0; cols + 2]],
            current: 0,
        }
    }

    pub fn cols(&self) -> usize {
        self.rows[0].len() - 2
    }

    /// Seeds the left border of the current row from the row above.
    pub fn start_row(&mut self) {
        let above = self.rows[self.current ^ 1][1];
        self.rows[self.current][0] = above;
    }

    /// Stores the reconstructed sample for `col` of the current row.
    #[inline]
    pub fn update(&mut self, px: u8, col: usize) {
        let row = &mut self.rows[self.current];
        row[col + 1] = px;
        row[col + 2] = px;
    }

    /// The current row becomes the row above.
    pub fn end_row(&mut self) {
        self.current ^= 1;
    }

    #[inline]
    pub fn template(&self, col: usize) -> Template {
        let cur = &self.rows[self.current];
        let prev = &self.rows[self.current ^ 1];
        Template {
            a: cur[col] as i32,
            b: prev[col + 1] as i32,
            c: prev[col] as i32,
            d: prev[col + 2] as i32,
        }
    }
}

/// Median edge detector over the left, above and above-left neighbors.
#[inline]
pub fn med_predict(a: i32, b: i32, c: i32) -> i32 {
    let min_ab = a.min(b);
    let max_ab = a.max(b);
    if c >= max_ab {
        min_ab
    } else if c <= min_ab {
        max_ab
    } else {
        a + b - c
    }
}

/// Uniform quantizer with step `delta`, rounding toward the nearest level.
#[inline]
pub fn quantize_error(error: i32, delta: i32, near: i32) -> i32 {
    if error > 0 {
        (near + error) / delta
    } else {
        -((near - error) / delta)
    }
}

/// Turns a raw prediction error into the quantized error that gets coded.
///
/// `sign` is the context sign and `flip` whether the context bias accumulator
/// is positive. The result is folded into `[min_error, max_error]`.
pub fn quantize_residual(error: i32, sign: i32, flip: bool, run: &RunParams) -> i32 {
    let mut error = error * sign;
    if flip {
        error = -error;
    }
    let mut q = quantize_error(error, run.delta, run.near);
    if q < run.min_error {
        q += run.alpha;
    } else if q > run.max_error {
        q -= run.alpha;
    }
    q
}

/// Dequantized error in the sign-normalized domain, as fed to the statistics.
#[inline]
pub fn dequantize(q: i32, flip: bool, run: &RunParams) -> i32 {
    let q_error = q * run.delta;
    if flip { -q_error } else { q_error }
}

/// Rebuilds a sample from its prediction and dequantized error.
pub fn reconstruct(prediction: i32, q_error: i32, sign: i32, run: &RunParams) -> u8 {
    let mut value = prediction + q_error * sign;
    if value < run.min_reduct_value {
        value += run.deco_range;
    } else if value > run.max_reduct_value {
        value -= run.deco_range;
    }
    clamp_sample(value)
}

/// Splits a quantized error into its sign bit and folded magnitude.
#[inline]
pub fn decompose(q: i32) -> (u32, u32) {
    let y = u32::from(q < 0);
    (y, q.unsigned_abs() - y)
}

/// Inverse of [`decompose`].
#[inline]
pub fn compose(y: u32, z: u32) -> i32 {
    if y == 1 { -(z as i32) - 1 } else { z as i32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_med_predictor() {
        // Edge above: c above both neighbors picks the smaller one.
        assert_eq!(med_predict(10, 20, 30), 10);
        // c below both picks the larger one.
        assert_eq!(med_predict(10, 20, 5), 20);
        // Smooth region uses the planar estimate.
        assert_eq!(med_predict(10, 20, 15), 15);
        assert_eq!(med_predict(7, 7, 7), 7);
    }

    #[test]
    fn test_row_buffer_template() {
        let mut rows = RowBuffer::new(3);
        rows.start_row();
        for (col, px) in [10u8, 20, 30].into_iter().enumerate() {
            rows.update(px, col);
        }
        rows.end_row();
        rows.start_row();

        // Column 0: left neighbor mirrors the pixel above, above-left is the
        // left border of the previous row.
        assert_eq!(rows.template(0), Template { a: 10, b: 10, c: 0, d: 20 });
        rows.update(11, 0);
        assert_eq!(rows.template(1), Template { a: 11, b: 20, c: 10, d: 30 });
        rows.update(21, 1);
        // Last column: above-right repeats the last pixel above.
        assert_eq!(rows.template(2), Template { a: 21, b: 30, c: 20, d: 30 });
        assert_eq!(rows.cols(), 3);
    }

    #[test]
    fn test_first_row_reads_zero_above() {
        let mut rows = RowBuffer::new(4);
        rows.start_row();
        rows.update(10, 0);
        assert_eq!(rows.template(1), Template { a: 10, b: 0, c: 0, d: 0 });
    }

    #[test]
    fn test_uniform_quantizer() {
        assert_eq!(quantize_error(0, 1, 0), 0);
        assert_eq!(quantize_error(-7, 1, 0), -7);
        assert_eq!(quantize_error(2, 5, 2), 0);
        assert_eq!(quantize_error(3, 5, 2), 1);
        assert_eq!(quantize_error(-2, 5, 2), 0);
        assert_eq!(quantize_error(-3, 5, 2), -1);
    }

    #[test]
    fn test_decompose_compose() {
        assert_eq!(decompose(0), (0, 0));
        assert_eq!(decompose(3), (0, 3));
        assert_eq!(decompose(-1), (1, 0));
        assert_eq!(decompose(-4), (1, 3));
        for q in -128..128 {
            let (y, z) = decompose(q);
            assert_eq!(compose(y, z), q);
        }
    }

    #[test]
    fn test_lossless_reconstruction_is_exact() {
        let run = RunParams::new(0);
        for prediction in [0, 1, 77, 128, 254, 255] {
            for sign in [1, -1] {
                for flip in [false, true] {
                    for x in 0..=255 {
                        let q = quantize_residual(x - prediction, sign, flip, &run);
                        assert!(q >= run.min_error && q <= run.max_error);
                        let value = reconstruct(prediction, dequantize(q, flip, &run), sign, &run);
                        assert_eq!(value as i32, x);
                    }
                }
            }
        }
    }

    #[test]
    fn test_near_lossless_reconstruction_is_bounded() {
        for near in [1u8, 2, 3, 7, 16, 31] {
            let run = RunParams::new(near);
            for prediction in [0, 3, 100, 200, 252, 255] {
                for sign in [1, -1] {
                    for flip in [false, true] {
                        for x in 0..=255 {
                            let q = quantize_residual(x - prediction, sign, flip, &run);
                            let value =
                                reconstruct(prediction, dequantize(q, flip, &run), sign, &run);
                            assert!(
                                (value as i32 - x).abs() <= near as i32,
                                "near {} prediction {} x {} got {}",
                                near,
                                prediction,
                                x,
                                value
                            );
                        }
                    }
                }
            }
        }
    }
}
