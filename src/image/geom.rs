// src/image/geom.rs

//! Rectangles used to describe block geometry.

/// Represents a 2D rectangle with integer coordinates.
///
/// The rectangle is defined by its top-left corner (`x`, `y`) and its `width` and `height`.
/// This struct is `Copy`, so it can be passed around cheaply by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the x-coordinate of the right edge (`x + width`).
    pub fn x_max(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Returns the y-coordinate of the bottom edge (`y + height`).
    pub fn y_max(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Checks if `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x_max() <= self.x_max()
            && other.y_max() <= self.y_max()
    }
}

/// Splits a `width` x `height` area into a grid of equal tiles, row-major.
///
/// The area must be an exact multiple of the tile size; callers check that
/// before tiling.
pub fn tile_grid(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Vec<Rect> {
    if tile_width == 0 || tile_height == 0 {
        return Vec::new();
    }
    let rows = height / tile_height;
    let cols = width / tile_width;
    let mut tiles = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        for col in 0..cols {
            tiles.push(Rect::new(
                col * tile_width,
                row * tile_height,
                tile_width,
                tile_height,
            ));
        }
    }
    tiles
}
