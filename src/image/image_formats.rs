// src/image/image_formats.rs

//! In-memory representation of single-channel images.
//!
//! The codec works on 8-bit grayscale planes. `Bitmap` stores them row-major
//! and exposes raw byte views through `bytemuck`, which is how planes are
//! read from and written to files.

use crate::image::geom::Rect;
use crate::utils::error::{CodecError, Result};
use bytemuck::{Pod, Zeroable};

/// A single grayscale pixel with an 8-bit intensity value.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct GrayPixel {
    pub y: u8,
}

unsafe impl Pod for GrayPixel {}
unsafe impl Zeroable for GrayPixel {}

impl GrayPixel {
    pub fn new(y: u8) -> Self {
        GrayPixel { y }
    }

    pub fn black() -> Self {
        GrayPixel { y: 0 }
    }
}

// --- Bitmap Type (Grayscale Image Buffer) ---

/// A 2D buffer of grayscale pixels.
/// Stores pixels in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<GrayPixel>,
}

impl Bitmap {
    /// Creates a new bitmap with the given dimensions, initialized to black.
    pub fn new(width: u32, height: u32) -> Self {
        Bitmap {
            width,
            height,
            data: vec![GrayPixel::black(); width as usize * height as usize],
        }
    }

    /// Creates a bitmap from a raw vector of pixels in row-major order.
    pub fn from_vec(width: u32, height: u32, data: Vec<GrayPixel>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(CodecError::InvalidData(format!(
                "{} pixels cannot fill a {}x{} bitmap",
                data.len(),
                width,
                height
            )));
        }
        Ok(Bitmap {
            width,
            height,
            data,
        })
    }

    /// Creates a bitmap from raw 8-bit samples in row-major order.
    pub fn from_raw(width: u32, height: u32, raw: &[u8]) -> Result<Self> {
        let data: &[GrayPixel] = bytemuck::cast_slice(raw);
        Self::from_vec(width, height, data.to_vec())
    }

    /// Creates a bitmap by calling a function for each pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> u8,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(GrayPixel::new(f(x, y)));
            }
        }
        Bitmap {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the dimensions as a tuple (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the bitmap bounds at the origin.
    pub fn rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> GrayPixel {
        assert!(x < self.width && y < self.height);
        self.data[self.index(x, y)]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: GrayPixel) {
        assert!(x < self.width && y < self.height);
        let idx = self.index(x, y);
        self.data[idx] = pixel;
    }

    /// One row of samples.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = self.index(0, y);
        &self.as_raw()[start..start + self.width as usize]
    }

    /// Returns raw pixel data as a byte slice.
    pub fn as_raw(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Returns mutable raw pixel data as a byte slice.
    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.data)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Copies out the area covered by `rect`.
    pub fn crop(&self, rect: &Rect) -> Result<Bitmap> {
        if !self.rect().contains_rect(rect) {
            return Err(CodecError::InvalidData(format!(
                "crop {:?} falls outside a {}x{} bitmap",
                rect, self.width, self.height
            )));
        }
        let mut data = Vec::with_capacity(rect.area());
        for y in rect.y..rect.y_max() {
            let start = self.index(rect.x, y);
            data.extend_from_slice(&self.data[start..start + rect.width as usize]);
        }
        Ok(Bitmap {
            width: rect.width,
            height: rect.height,
            data,
        })
    }

    /// Writes `src` into this bitmap with its top-left corner at `(x, y)`.
    pub fn paste(&mut self, src: &Bitmap, x: u32, y: u32) -> Result<()> {
        let target = Rect::new(x, y, src.width, src.height);
        if !self.rect().contains_rect(&target) {
            return Err(CodecError::InvalidData(format!(
                "paste {:?} falls outside a {}x{} bitmap",
                target, self.width, self.height
            )));
        }
        for row in 0..src.height {
            let dst = self.index(x, y + row);
            let from = src.index(0, row);
            self.data[dst..dst + src.width as usize]
                .copy_from_slice(&src.data[from..from + src.width as usize]);
        }
        Ok(())
    }

    /// Largest absolute sample difference against a bitmap of equal size.
    pub fn peak_error(&self, other: &Bitmap) -> Result<u8> {
        if self.dimensions() != other.dimensions() {
            return Err(CodecError::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(self
            .as_raw()
            .iter()
            .zip(other.as_raw())
            .map(|(&a, &b)| a.abs_diff(b))
            .max()
            .unwrap_or(0))
    }
}
