pub mod geom;
pub mod image_formats;

pub use geom::{Rect, tile_grid};
pub use image_formats::{Bitmap, GrayPixel};
