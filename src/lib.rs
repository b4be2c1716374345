//! A near-lossless grayscale image codec.
//!
//! Pixels are predicted with a median edge detector, residuals are quantized
//! to within `NEAR` of the source and the resulting symbols are entropy coded
//! with small tANS tables chosen per context from adaptive statistics.
//!
//! # Quick Start
//!
//! ```no_run
//! use tans_image_codec::{Bitmap, CodecParams, decode_image, encode_image};
//!
//! let image = Bitmap::from_fn(256, 64, |x, y| (x ^ y) as u8);
//! let params = CodecParams::new().with_near(2);
//!
//! // Four 64x64 blocks, each coded independently
//! let bytes = encode_image(&image, 64, 64, &params)?;
//! let decoded = decode_image(&bytes)?;
//! assert!(image.peak_error(&decoded)? <= 2);
//! # Ok::<(), tans_image_codec::CodecError>(())
//! ```
//!
//! # Layers
//!
//! - **Block coding** ([`encode_block`], [`decode_block`]): one raw first
//!   sample followed by residual symbols, grouped in LIFO-coded segments
//! - **Container** ([`encode_image`], [`decode_image`]): a packed global
//!   header followed by size-prefixed block payloads in row-major order

// Core modules
pub mod container;
pub mod encode;
pub mod image;
pub mod utils;

// Block and image coding
pub use container::{
    ImageStats, decode_image, decode_image_with, encode_image, encode_image_with_stats,
    read_image_file, write_image_file,
};
pub use encode::{CodecParams, EncodedBlock, ThetaQuant, decode_block, encode_block};

// Image types
pub use image::{Bitmap, GrayPixel, Rect};

// Error types
pub use utils::error::{CodecError, Result};

// Constants
pub const CODEC_VERSION: &str = "0.3.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(CODEC_VERSION, "0.3.0");
    }

    #[test]
    fn test_public_api_round_trip() -> Result<()> {
        let image = Bitmap::from_fn(32, 32, |x, y| (x * 7 + y) as u8);
        let params = CodecParams::new();
        let bytes = encode_image(&image, 16, 32, &params)?;
        assert_eq!(decode_image(&bytes)?, image);
        Ok(())
    }

    #[test]
    fn test_block_api_matches_container_payload() -> Result<()> {
        use byteorder::{LittleEndian, ReadBytesExt};
        use std::io::Cursor;

        let image = Bitmap::from_fn(8, 8, |x, _| (x * 30) as u8);
        let params = CodecParams::new().with_near(1);
        let block = encode_block(&image, &params)?;
        let framed = encode_image(&image, 8, 8, &params)?;

        let mut cursor = Cursor::new(&framed[container::header::GLOBAL_HEADER_SIZE..]);
        let size = cursor.read_u32::<LittleEndian>()? as usize;
        assert_eq!(size, block.bytes.len());
        assert_eq!(&framed[framed.len() - size..], &block.bytes[..]);
        Ok(())
    }
}
