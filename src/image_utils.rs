// src/image_utils.rs - Mask/image conversions, intensity fields and curve rasterization

use bresenham::Bresenham;
use image::{GrayImage, ImageBuffer, Luma};

use crate::mask::Mask;
use crate::snake::Curve;

/// Luma value written for foreground pixels
pub const FOREGROUND_LUMA: u8 = 255;

/// Floating point scalar field over the grid (x = column, y = row)
pub type IntensityImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Convert a mask to a 0/255 grayscale image (x = column, y = row)
pub fn mask_to_gray(mask: &Mask) -> GrayImage {
    GrayImage::from_fn(mask.width() as u32, mask.height() as u32, |x, y| {
        if mask.get(y as usize, x as usize) {
            Luma([FOREGROUND_LUMA])
        } else {
            Luma([0])
        }
    })
}

/// Threshold a grayscale image into a mask; any non-zero luma is foreground
pub fn gray_to_mask(image: &GrayImage) -> Mask {
    let (width, height) = image.dimensions();
    Mask::from_fn(height as usize, width as usize, |row, col| {
        image.get_pixel(col as u32, row as u32)[0] > 0
    })
}

/// Mask as a 0.0/1.0 float image
pub fn mask_to_intensity(mask: &Mask) -> IntensityImage {
    IntensityImage::from_fn(mask.width() as u32, mask.height() as u32, |x, y| {
        Luma([if mask.get(y as usize, x as usize) { 1.0 } else { 0.0 }])
    })
}

/// Gaussian-blurred intensity field of a mask, in [0, 1].
///
/// The blur runs in `f32`, so the field is not quantized. Non-positive sigma
/// skips the blur, since `imageproc` panics on `sigma <= 0.0`.
pub fn blurred_intensity(mask: &Mask, sigma: f32) -> IntensityImage {
    let field = mask_to_intensity(mask);
    if sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&field, sigma)
    } else {
        field
    }
}

/// Draw a curve as a closed polyline of the given thickness.
///
/// Sample coordinates are truncated toward zero, the last sample is joined
/// back to the first, and pixels falling outside the grid are clipped.
pub fn rasterize_curve(curve: &Curve, height: usize, width: usize, thickness: u32) -> Mask {
    let mut mask = Mask::new(height, width);
    let points: Vec<(isize, isize)> = curve
        .points()
        .iter()
        .map(|&(row, col)| (col as isize, row as isize))
        .collect();

    if points.is_empty() {
        return mask;
    }

    let brush = disc_brush(thickness);
    let mut stamp = |x: isize, y: isize| {
        for &(dx, dy) in &brush {
            let (px, py) = (x + dx, y + dy);
            if px >= 0 && py >= 0 && (px as usize) < width && (py as usize) < height {
                mask.set(py as usize, px as usize, true);
            }
        }
    };

    for i in 0..points.len() {
        let start = points[i];
        let end = points[(i + 1) % points.len()];
        stamp(start.0, start.1);
        for (x, y) in Bresenham::new(start, end) {
            stamp(x, y);
        }
    }

    mask
}

/// Offsets covered by a round brush of the given diameter
fn disc_brush(thickness: u32) -> Vec<(isize, isize)> {
    let radius = (thickness / 2) as isize;
    let limit = radius * radius + radius;
    let mut offsets = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= limit {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}
