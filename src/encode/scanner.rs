// src/encode/scanner.rs

//! Per-block scan loops.
//!
//! Both directions walk the block in row-major order and run the same
//! sequence of context selection, prediction and statistics updates. Only
//! the entropy coding step differs: the encoder quantizes the residual and
//! queues a symbol, the decoder pulls the symbol back from the stream.

use crate::encode::ans::{Symbol, SymbolCoder, SymbolDecoder};
use crate::encode::constants::MAX_SYMBOLS_PER_BIT;
use crate::encode::context::{Context, ContextStats, map_gradients};
use crate::encode::params::{CodecParams, RunParams};
use crate::encode::predictor::{
    RowBuffer, clamp_sample, compose, decompose, dequantize, med_predict, quantize_residual,
    reconstruct,
};
use crate::image::image_formats::Bitmap;
use crate::utils::error::{CodecError, Result};

/// Coded payload of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlock {
    pub bytes: Vec<u8>,
    /// Magnitude table lookups spent on the block.
    pub geometric_iterations: usize,
}

/// State shared by the encoder and decoder loops.
struct ScanState {
    run: RunParams,
    stats: ContextStats,
    rows: RowBuffer,
}

impl ScanState {
    fn new(width: u32, params: &CodecParams) -> Self {
        let run = RunParams::new(params.near);
        ScanState {
            stats: ContextStats::new(&run, params.theta_quant),
            rows: RowBuffer::new(width as usize),
            run,
        }
    }

    /// Selects the context of `col` and returns it with the biased prediction.
    #[inline]
    fn predict(&self, col: usize) -> (Context, i32) {
        let template = self.rows.template(col);
        let (g1, g2, g3) = template.gradients();
        let ctx = map_gradients(g1, g2, g3);
        let fixed = med_predict(template.a, template.b, template.c);
        let prediction = clamp_sample(fixed + self.stats.bias(ctx)) as i32;
        (ctx, prediction)
    }
}

/// Largest number of symbols, the raw first sample included, that a payload
/// of `bytes` bytes can carry.
pub fn max_block_symbols(bytes: usize) -> u64 {
    1 + (bytes as u64).saturating_mul(8 * MAX_SYMBOLS_PER_BIT)
}

fn check_geometry(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(CodecError::UnsupportedConfig(format!(
            "cannot code an empty {}x{} block",
            width, height
        )));
    }
    Ok(())
}

/// Encodes one block.
pub fn encode_block(block: &Bitmap, params: &CodecParams) -> Result<EncodedBlock> {
    params.validate()?;
    let (width, height) = block.dimensions();
    check_geometry(width, height)?;

    let total_symbols = width as usize * height as usize;
    if total_symbols % params.buffer_size() != 0 {
        log::warn!(
            "{} symbols do not fill whole segments of {}; the last segment is short",
            total_symbols,
            params.buffer_size()
        );
    }

    let mut scan = ScanState::new(width, params);
    let escape_bits = scan.run.escape_bits();
    let mut coder = SymbolCoder::new(params);

    for row in 0..height {
        scan.rows.start_row();
        for (col, &sample) in block.row(row).iter().enumerate() {
            if row == 0 && col == 0 {
                coder.store_pixel(sample);
                scan.rows.update(sample, 0);
                continue;
            }

            let (ctx, prediction) = scan.predict(col);
            let flip = scan.stats.flips_error(ctx);
            let q = quantize_residual(sample as i32 - prediction, ctx.sign, flip, &scan.run);
            let (y, z) = decompose(q);

            let symbol = Symbol {
                z,
                y,
                theta_id: scan.stats.theta_idx(ctx),
                p_id: scan.stats.p_idx(ctx),
                escape_bits,
            };

            let q_error = dequantize(q, flip, &scan.run);
            let value = reconstruct(prediction, q_error, ctx.sign, &scan.run);
            debug_assert!(scan.run.near != 0 || value == sample);
            scan.rows.update(value, col);

            coder.push_symbol(symbol)?;
            scan.stats.update(ctx, q_error, z, y);
        }
        scan.rows.end_row();
    }

    coder.code_symbol_buffer()?;
    let geometric_iterations = coder.geometric_iterations();
    let bytes = coder.finish()?;

    log::debug!(
        "encoded {}x{} block (NEAR {}) into {} bytes, {} magnitude iterations",
        width,
        height,
        params.near,
        bytes.len(),
        geometric_iterations
    );
    Ok(EncodedBlock {
        bytes,
        geometric_iterations,
    })
}

/// Decodes one `width` x `height` block from its payload.
pub fn decode_block(data: &[u8], width: u32, height: u32, params: &CodecParams) -> Result<Bitmap> {
    params.validate()?;
    check_geometry(width, height)?;

    let pixels = width as u64 * height as u64;
    if pixels > max_block_symbols(data.len()) {
        return Err(CodecError::InvalidData(format!(
            "a {}-byte payload cannot hold a {}x{} block",
            data.len(),
            width,
            height
        )));
    }

    let total_symbols = pixels as usize;
    let mut scan = ScanState::new(width, params);
    let escape_bits = scan.run.escape_bits();
    let mut decoder = SymbolDecoder::new(data, total_symbols, params.buffer_size());
    let mut bitmap = Bitmap::new(width, height);
    let samples = bitmap.as_raw_mut();

    for row in 0..height as usize {
        scan.rows.start_row();
        for col in 0..width as usize {
            let idx = row * width as usize + col;
            if row == 0 && col == 0 {
                let sample = decoder.retrieve_pixel()?;
                scan.rows.update(sample, 0);
                samples[idx] = sample;
                continue;
            }

            let (ctx, prediction) = scan.predict(col);
            let (y, z) = decoder.retrieve_symbol(
                scan.stats.theta_idx(ctx),
                scan.stats.p_idx(ctx),
                escape_bits,
            )?;

            let flip = scan.stats.flips_error(ctx);
            let q_error = dequantize(compose(y, z), flip, &scan.run);
            let value = reconstruct(prediction, q_error, ctx.sign, &scan.run);
            scan.rows.update(value, col);
            scan.stats.update(ctx, q_error, z, y);
            samples[idx] = value;
        }
        scan.rows.end_row();
    }

    let consumed = decoder.bytes_consumed();
    if consumed < data.len() {
        log::warn!(
            "block payload has {} trailing bytes after {} decoded",
            data.len() - consumed,
            consumed
        );
    }
    log::debug!(
        "decoded {}x{} block from {} bytes",
        width,
        height,
        consumed
    );
    Ok(bitmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcg_noise(width: u32, height: u32, seed: u32) -> Bitmap {
        let mut s = seed;
        Bitmap::from_fn(width, height, |_, _| {
            s = s.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (s >> 16) as u8
        })
    }

    fn gradient(width: u32, height: u32) -> Bitmap {
        Bitmap::from_fn(width, height, |x, y| ((x * 3 + y * 5) % 256) as u8)
    }

    #[test]
    fn test_flat_block_round_trip() {
        let block = Bitmap::from_fn(1, 4, |_, _| 10);
        let params = CodecParams::new();
        let encoded = encode_block(&block, &params).unwrap();
        assert_eq!(encoded.bytes[0], 10);
        assert!(encoded.bytes.len() <= 3);
        let decoded = decode_block(&encoded.bytes, 1, 4, &params).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_lossless_round_trip_textures() {
        let params = CodecParams::new();
        for block in [gradient(37, 11), lcg_noise(16, 16, 7), gradient(1, 1)] {
            let (w, h) = block.dimensions();
            let encoded = encode_block(&block, &params).unwrap();
            let decoded = decode_block(&encoded.bytes, w, h, &params).unwrap();
            assert_eq!(decoded, block);
        }
    }

    #[test]
    fn test_near_lossless_round_trip() {
        let block = lcg_noise(24, 9, 99);
        for near in [1u8, 3, 10] {
            let params = CodecParams::new().with_near(near);
            let encoded = encode_block(&block, &params).unwrap();
            let decoded = decode_block(&encoded.bytes, 24, 9, &params).unwrap();
            assert!(block.peak_error(&decoded).unwrap() <= near);
        }
    }

    #[test]
    fn test_coarse_scale_mapping_round_trip() {
        let params = CodecParams::new().with_theta_quant(crate::encode::ThetaQuant::Coarse);
        let block = gradient(20, 20);
        let encoded = encode_block(&block, &params).unwrap();
        assert_eq!(decode_block(&encoded.bytes, 20, 20, &params).unwrap(), block);
    }

    #[test]
    fn test_empty_block_is_rejected() {
        let params = CodecParams::new();
        assert!(matches!(
            encode_block(&Bitmap::new(0, 3), &params),
            Err(CodecError::UnsupportedConfig(_))
        ));
        assert!(decode_block(&[0], 3, 0, &params).is_err());
    }

    #[test]
    fn test_oversized_geometry_is_rejected_before_decoding() {
        let params = CodecParams::new();
        let err = decode_block(&[10, 0x40], u32::MAX, u32::MAX, &params).unwrap_err();
        assert!(matches!(err, CodecError::InvalidData(_)));
        assert!(matches!(
            decode_block(&[], 1, 2, &params),
            Err(CodecError::InvalidData(_))
        ));
        assert_eq!(max_block_symbols(2), 1025);
    }

    #[test]
    fn test_flat_block_is_far_below_density_limit() {
        let params = CodecParams::new();
        let block = Bitmap::new(64, 64);
        let encoded = encode_block(&block, &params).unwrap();
        assert!(max_block_symbols(encoded.bytes.len()) > 16 * 4096);
        assert_eq!(decode_block(&encoded.bytes, 64, 64, &params).unwrap(), block);
    }

    #[test]
    fn test_truncated_payload_is_detected() {
        let params = CodecParams::new();
        let block = lcg_noise(16, 8, 3);
        let encoded = encode_block(&block, &params).unwrap();
        let cut = &encoded.bytes[..encoded.bytes.len() / 2];
        assert!(decode_block(cut, 16, 8, &params).is_err());
    }
}
