// src/container/image_codec.rs

//! Whole-image encoding: tiles the image into equal blocks, codes each one
//! independently and frames the payloads behind the container headers.

use crate::container::header::{
    BLOCK_HEADER_SIZE, BlockHeader, GlobalHeader, MIN_BLOCK_PAYLOAD, map_eof,
};
use crate::encode::constants::MAX_SYMBOLS_PER_BIT;
use crate::encode::params::{CodecParams, ThetaQuant};
use crate::encode::scanner::{decode_block, encode_block};
use crate::image::geom::tile_grid;
use crate::image::image_formats::Bitmap;
use crate::utils::error::{CodecError, Result};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

/// Summary of one image encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    /// Total container size, headers included.
    pub bytes: usize,
    pub bits_per_pixel: f64,
    pub geometric_iterations: usize,
    pub blocks: usize,
}

fn block_count(image_dim: u32, block_dim: u32, what: &str) -> Result<u16> {
    if block_dim == 0 || block_dim > u16::MAX as u32 {
        return Err(CodecError::UnsupportedConfig(format!(
            "block {} {} is outside 1..={}",
            what,
            block_dim,
            u16::MAX
        )));
    }
    if image_dim % block_dim != 0 {
        return Err(CodecError::UnsupportedConfig(format!(
            "image {} {} is not a multiple of the block {} {}",
            what, image_dim, what, block_dim
        )));
    }
    u16::try_from(image_dim / block_dim).map_err(|_| {
        CodecError::UnsupportedConfig(format!(
            "image {} {} needs more than {} blocks",
            what,
            image_dim,
            u16::MAX
        ))
    })
}

/// Checks that `remaining` bytes can hold every block the header announces,
/// before anything is sized from the header geometry.
fn check_room(header: &GlobalHeader, remaining: usize) -> Result<()> {
    let blocks = header.num_blocks() as u64;
    let framing = blocks * (BLOCK_HEADER_SIZE + MIN_BLOCK_PAYLOAD) as u64;
    if framing > remaining as u64 {
        return Err(CodecError::Truncated(format!(
            "{} blocks need at least {} bytes, {} left",
            blocks, framing, remaining
        )));
    }

    // Each block carries its raw sample plus at most MAX_SYMBOLS_PER_BIT
    // symbols per payload bit.
    let pixels = header.image_width() as u64 * header.image_height() as u64;
    let capacity = blocks + (remaining as u64).saturating_mul(8 * MAX_SYMBOLS_PER_BIT);
    if pixels > capacity {
        return Err(CodecError::InvalidData(format!(
            "{}x{} image cannot fit in {} bytes",
            header.image_width(),
            header.image_height(),
            remaining
        )));
    }
    Ok(())
}

/// Encodes `image` with `block_width` x `block_height` blocks.
pub fn encode_image(
    image: &Bitmap,
    block_width: u32,
    block_height: u32,
    params: &CodecParams,
) -> Result<Vec<u8>> {
    encode_image_with_stats(image, block_width, block_height, params).map(|(bytes, _)| bytes)
}

/// Like [`encode_image`], also reporting size and coder statistics.
pub fn encode_image_with_stats(
    image: &Bitmap,
    block_width: u32,
    block_height: u32,
    params: &CodecParams,
) -> Result<(Vec<u8>, ImageStats)> {
    params.validate()?;
    let (width, height) = image.dimensions();
    let blk_cols = block_count(width, block_width, "width")?;
    let blk_rows = block_count(height, block_height, "height")?;

    let header = GlobalHeader::new(
        params,
        block_width as u16,
        block_height as u16,
        blk_rows,
        blk_cols,
    );
    let mut out = Vec::new();
    header.write(&mut out)?;

    let mut geometric_iterations = 0;
    let tiles = tile_grid(width, height, block_width, block_height);
    for (index, tile) in tiles.iter().enumerate() {
        let block = image.crop(tile)?;
        let encoded = encode_block(&block, params)?;
        log::trace!("block {} at {:?}: {} bytes", index, tile, encoded.bytes.len());
        BlockHeader::new(encoded.bytes.len())?.write(&mut out)?;
        out.extend_from_slice(&encoded.bytes);
        geometric_iterations += encoded.geometric_iterations;
    }

    let pixels = width as usize * height as usize;
    let stats = ImageStats {
        bytes: out.len(),
        bits_per_pixel: if pixels == 0 {
            0.0
        } else {
            out.len() as f64 * 8.0 / pixels as f64
        },
        geometric_iterations,
        blocks: tiles.len(),
    };
    log::debug!(
        "encoded {}x{} image in {} blocks: {} bytes, {:.3} bpp",
        width,
        height,
        stats.blocks,
        stats.bytes,
        stats.bits_per_pixel
    );
    Ok((out, stats))
}

/// Decodes a container produced with the default scale mapping.
pub fn decode_image(data: &[u8]) -> Result<Bitmap> {
    decode_image_with(data, ThetaQuant::default())
}

/// Decodes a container. The scale mapping is not stored in the stream and
/// must match the one used to encode.
pub fn decode_image_with(data: &[u8], theta_quant: ThetaQuant) -> Result<Bitmap> {
    let mut cursor = Cursor::new(data);
    let header = GlobalHeader::read(&mut cursor)?;
    header.validate()?;
    let params = header.codec_params().with_theta_quant(theta_quant);
    log::debug!(
        "container: {}x{} image, {}x{} blocks, NEAR {}",
        header.image_width(),
        header.image_height(),
        header.blk_width,
        header.blk_height,
        header.near
    );

    check_room(&header, data.len() - cursor.position() as usize)?;

    let mut image = Bitmap::new(header.image_width(), header.image_height());
    let tiles = tile_grid(
        header.image_width(),
        header.image_height(),
        header.blk_width as u32,
        header.blk_height as u32,
    );
    let mut payload = Vec::new();
    for tile in &tiles {
        let block_header = BlockHeader::read(&mut cursor)?;
        let left = data.len() - cursor.position() as usize;
        if block_header.size as usize > left {
            return Err(CodecError::Truncated(format!(
                "block payload of {} bytes with {} bytes left",
                block_header.size, left
            )));
        }
        payload.resize(block_header.size as usize, 0);
        cursor
            .read_exact(&mut payload)
            .map_err(map_eof("block payload"))?;
        let block = decode_block(&payload, tile.width, tile.height, &params)?;
        image.paste(&block, tile.x, tile.y)?;
    }

    let trailing = data.len() - cursor.position() as usize;
    if trailing > 0 {
        log::warn!("{} bytes after the last block were ignored", trailing);
    }
    Ok(image)
}

/// Encodes `image` and writes the container to `path`.
pub fn write_image_file<P: AsRef<Path>>(
    path: P,
    image: &Bitmap,
    block_width: u32,
    block_height: u32,
    params: &CodecParams,
) -> Result<ImageStats> {
    let (bytes, stats) = encode_image_with_stats(image, block_width, block_height, params)?;
    fs::write(path, bytes)?;
    Ok(stats)
}

/// Reads and decodes the container at `path`.
pub fn read_image_file<P: AsRef<Path>>(path: P) -> Result<Bitmap> {
    let data = fs::read(path)?;
    decode_image(&data)
}
