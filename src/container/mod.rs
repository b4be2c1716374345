pub mod header;
pub mod image_codec;

pub use header::{BlockHeader, ChromaMode, GlobalHeader};
pub use image_codec::{
    ImageStats, decode_image, decode_image_with, encode_image, encode_image_with_stats,
    read_image_file, write_image_file,
};
