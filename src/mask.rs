// src/mask.rs - Dense boolean grid and conversions between masks and point sets

use std::collections::BTreeSet;
use std::ops::{BitAnd, BitOr, Not};

/// A pixel coordinate as (row, col)
pub type Pixel = (usize, usize);

/// Deduplicated, unordered collection of pixels.
///
/// A `BTreeSet` keeps iteration deterministic, but no caller may rely on
/// the order for correctness.
pub type PointSet = BTreeSet<Pixel>;

/// Fixed-size H x W boolean raster, `true` marks foreground.
///
/// Masks are never mutated once handed to a downstream stage; the grid
/// algebra (`!`, `&`, `|`) always produces a new mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    height: usize,
    width: usize,
    data: Vec<bool>,
}

impl Mask {
    /// Create an all-background mask
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            data: vec![false; height * width],
        }
    }

    /// Build a mask from row-major data.
    ///
    /// Returns `None` if `data.len() != height * width`.
    pub fn from_vec(height: usize, width: usize, data: Vec<bool>) -> Option<Self> {
        if data.len() != height * width {
            return None;
        }
        Some(Self { height, width, data })
    }

    /// Build a mask by evaluating `f(row, col)` for every pixel
    pub fn from_fn<F: FnMut(usize, usize) -> bool>(height: usize, width: usize, mut f: F) -> Self {
        let mut data = Vec::with_capacity(height * width);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self { height, width, data }
    }

    /// Rasterize a point set: `mask[r][c]` is set iff `(r, c)` is in `points`.
    ///
    /// Coordinates outside the grid are a caller error and are not range-checked
    /// beyond the slice bounds check.
    pub fn from_points<'a, I>(height: usize, width: usize, points: I) -> Self
    where
        I: IntoIterator<Item = &'a Pixel>,
    {
        let mut mask = Self::new(height, width);
        for &(row, col) in points {
            mask.data[row * width + col] = true;
        }
        mask
    }

    /// Exhaustive scan back into a point set
    pub fn to_points(&self) -> PointSet {
        self.foreground().collect()
    }

    /// Iterate foreground pixels in row-major order
    pub fn foreground(&self) -> impl Iterator<Item = Pixel> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, v)| **v)
            .map(move |(i, _)| (i / width, i % width))
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// (height, width)
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.data[row * self.width + col] = value;
    }

    /// Number of foreground pixels
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Logical complement
    pub fn complement(&self) -> Mask {
        Mask {
            height: self.height,
            width: self.width,
            data: self.data.iter().map(|&v| !v).collect(),
        }
    }

    /// Pixel-wise OR. Panics if the dimensions differ.
    pub fn union(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a || b)
    }

    /// Pixel-wise AND. Panics if the dimensions differ.
    pub fn intersect(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a && b)
    }

    /// Mirror the mask left-right
    pub fn flip_horizontal(&self) -> Mask {
        Mask::from_fn(self.height, self.width, |row, col| {
            self.get(row, self.width - 1 - col)
        })
    }

    fn zip_with<F: Fn(bool, bool) -> bool>(&self, other: &Mask, f: F) -> Mask {
        assert_eq!(
            self.dimensions(),
            other.dimensions(),
            "grid algebra requires masks of identical dimensions"
        );
        Mask {
            height: self.height,
            width: self.width,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }
}

impl Not for &Mask {
    type Output = Mask;

    fn not(self) -> Mask {
        self.complement()
    }
}

impl BitAnd for &Mask {
    type Output = Mask;

    fn bitand(self, rhs: &Mask) -> Mask {
        self.intersect(rhs)
    }
}

impl BitOr for &Mask {
    type Output = Mask;

    fn bitor(self, rhs: &Mask) -> Mask {
        self.union(rhs)
    }
}
