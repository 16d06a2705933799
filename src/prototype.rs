// src/prototype.rs - Superposed prototype mask used to remove noise from every shoe

use log::{info, warn};

use crate::errors::{Result, ShoeContourError};
use crate::mask::Mask;
use crate::refine::CurveRefiner;
use crate::snake::CurveSolver;

/// Pixels set in at least `min_frequency` of the masks.
///
/// All masks must share the dimensions of the first one.
pub fn frequency_mask(masks: &[Mask], min_frequency: usize) -> Result<Mask> {
    let first = masks
        .first()
        .ok_or_else(|| ShoeContourError::InvalidMaskData("no masks to superpose".to_string()))?;
    let (height, width) = first.dimensions();

    let mut counts = vec![0usize; height * width];
    for mask in masks {
        if mask.dimensions() != (height, width) {
            return Err(ShoeContourError::DimensionMismatch {
                expected: (height, width),
                found: mask.dimensions(),
            });
        }
        for (row, col) in mask.foreground() {
            counts[row * width + col] += 1;
        }
    }

    Ok(Mask::from_fn(height, width, |row, col| {
        counts[row * width + col] >= min_frequency
    }))
}

/// Build the cleaned prototype: the region enclosed by the refined boundary
/// of the frequency mask.
///
/// Returns `None` when no pixel reaches `min_frequency`, e.g. with fewer
/// shoes than the threshold. Refining an empty field would only shrink the
/// initial curve, so there is no prototype to clean with.
pub fn build_prototype<S: CurveSolver>(
    masks: &[Mask],
    min_frequency: usize,
    refiner: &CurveRefiner<'_, S>,
) -> Result<Option<Mask>> {
    let frequent = frequency_mask(masks, min_frequency)?;
    if frequent.is_empty() {
        warn!(
            "No pixel is present in at least {} of {} shoes, skipping prototype cleaning",
            min_frequency,
            masks.len()
        );
        return Ok(None);
    }

    info!(
        "Prototype: {} pixels present in at least {} of {} shoes",
        frequent.count(),
        min_frequency,
        masks.len()
    );
    refiner.refine_region(&frequent).map(Some)
}

/// Drop every pixel of `mask` lying outside the prototype
pub fn clean_with_prototype(mask: &Mask, prototype: &Mask) -> Mask {
    mask & prototype
}
