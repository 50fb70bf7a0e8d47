//! Immutable grayscale frame with its capture timestamp.

use std::time::Duration;

use ndarray::{Array2, ArrayView2};

/// One camera sample.  Pixels are row-major `(height, width)` intensities.
/// Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: Array2<u8>,
    captured_at: Duration,
}

impl Frame {
    pub fn new(pixels: Array2<u8>, captured_at: Duration) -> Self {
        Self {
            pixels,
            captured_at,
        }
    }

    /// Uniform frame of `value`.
    pub fn filled(height: usize, width: usize, value: u8, captured_at: Duration) -> Self {
        Self::new(Array2::from_elem((height, width), value), captured_at)
    }

    /// Build a frame from a per-pixel function of `(row, col)`.
    pub fn from_fn(
        height: usize,
        width: usize,
        captured_at: Duration,
        f: impl Fn(usize, usize) -> u8,
    ) -> Self {
        Self::new(
            Array2::from_shape_fn((height, width), |(r, c)| f(r, c)),
            captured_at,
        )
    }

    pub fn pixels(&self) -> ArrayView2<'_, u8> {
        self.pixels.view()
    }

    pub fn captured_at(&self) -> Duration {
        self.captured_at
    }

    /// `(height, width)`
    pub fn dim(&self) -> (usize, usize) {
        self.pixels.dim()
    }

    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }
}
