// src/pipeline.rs - Per-shoe processing and the whole-dataset batch driver

use std::path::Path;
use std::time::Instant;

use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::classify::{classify_shoe, normalize_outside, ReferencePoint};
use crate::config::{Config, DatasetChoice};
use crate::errors::{Result, ShoeContourError};
use crate::image_io::save_mask;
use crate::mask::{Mask, PointSet};
use crate::prototype::{build_prototype, clean_with_prototype};
use crate::refine::{CurveRefiner, RefinementOutcome};
use crate::snake::CurveSolver;

/// Result of processing a single shoe
#[derive(Debug, Clone)]
pub struct ShoeOutcome {
    pub shoe: usize,
    pub refinement: RefinementOutcome,
    pub boundary: PointSet,
    /// Reference points classified for this shoe
    pub classified: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShoeStatus {
    Processed,
    Failed,
}

/// Per-shoe line of the run summary
#[derive(Debug, Clone, Serialize)]
pub struct ShoeReport {
    pub shoe: usize,
    pub status: ShoeStatus,
    pub boundary_points: usize,
    pub reference_points: usize,
    pub contained: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub dataset: DatasetChoice,
    pub grid: (usize, usize),
    pub shoes: Vec<ShoeReport>,
    pub processed: usize,
    pub failed: usize,
    pub elapsed_seconds: f64,
}

/// Refine one shoe mask and classify its reference points.
///
/// `table` may hold rows of other shoes; only rows of `shoe` are written.
pub fn process_shoe<S: CurveSolver>(
    shoe: usize,
    source: &Mask,
    refiner: &CurveRefiner<'_, S>,
    table: &mut [ReferencePoint],
) -> Result<ShoeOutcome> {
    let settings = refiner.settings();
    let expected = (settings.height, settings.width);
    if source.dimensions() != expected {
        return Err(ShoeContourError::DimensionMismatch {
            expected,
            found: source.dimensions(),
        });
    }

    let refinement = refiner.refine(source)?;
    let boundary = refinement.boundary_points();
    if boundary.is_empty() {
        warn!("Shoe {}: refined boundary is empty", shoe);
    }

    let classified = classify_shoe(&boundary, shoe, table);

    Ok(ShoeOutcome {
        shoe,
        refinement,
        boundary,
        classified,
    })
}

/// Reference points of one shoe together with their positions in the full table
#[derive(Default)]
struct Shard {
    positions: Vec<usize>,
    points: Vec<ReferencePoint>,
}

/// Process every shoe of the dataset and fill the reference point table.
///
/// The table is sharded by shoe id so shoes can run in parallel, then merged
/// back in its original row order. A failing shoe is logged and skipped.
/// Finally every point classified as outside gets both distances set to 0.
pub fn process_dataset<S: CurveSolver>(
    masks: &[Mask],
    table: &mut Vec<ReferencePoint>,
    config: &Config,
    solver: &S,
    debug_dir: Option<&Path>,
) -> Result<RunSummary> {
    let start_time = Instant::now();
    let refiner = CurveRefiner::from_config(solver, config);

    let grid = config.grid_dimensions();
    let cleaned: Vec<Mask> = if config.use_prototype_cleaning {
        let usable: Vec<Mask> = masks
            .iter()
            .filter(|mask| mask.dimensions() == grid)
            .cloned()
            .collect();

        if usable.is_empty() {
            warn!("No mask matches the {}x{} grid, skipping prototype cleaning", grid.0, grid.1);
            masks.to_vec()
        } else {
            match build_prototype(&usable, config.prototype_min_frequency, &refiner)? {
                Some(prototype) => clean_all(masks, &prototype, grid, debug_dir),
                None => masks.to_vec(),
            }
        }
    } else {
        masks.to_vec()
    };

    let mut shards: Vec<Shard> = (0..masks.len()).map(|_| Shard::default()).collect();
    let mut untouched = Shard::default();
    for (position, point) in table.drain(..).enumerate() {
        let shard = match shards.get_mut(point.shoe) {
            Some(shard) => shard,
            None => {
                warn!(
                    "Reference point {} refers to unknown shoe {}",
                    point.rac_num, point.shoe
                );
                &mut untouched
            }
        };
        shard.positions.push(position);
        shard.points.push(point);
    }

    let run_shoe = |shoe: usize, mask: &Mask, shard: &mut Shard| -> ShoeReport {
        match process_shoe(shoe, mask, &refiner, &mut shard.points) {
            Ok(outcome) => {
                if let Some(dir) = debug_dir {
                    save_debug_outcome(dir, &outcome);
                }
                ShoeReport {
                    shoe,
                    status: ShoeStatus::Processed,
                    boundary_points: outcome.boundary.len(),
                    reference_points: outcome.classified,
                    contained: shard.points.iter().filter(|p| p.inside == Some(true)).count(),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Shoe {} failed: {}", shoe, e);
                ShoeReport {
                    shoe,
                    status: ShoeStatus::Failed,
                    boundary_points: 0,
                    reference_points: shard.points.len(),
                    contained: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    };

    let reports: Vec<ShoeReport> = if config.use_parallel {
        cleaned
            .par_iter()
            .zip(shards.par_iter_mut())
            .enumerate()
            .map(|(shoe, (mask, shard))| run_shoe(shoe, mask, shard))
            .collect()
    } else {
        cleaned
            .iter()
            .zip(shards.iter_mut())
            .enumerate()
            .map(|(shoe, (mask, shard))| run_shoe(shoe, mask, shard))
            .collect()
    };

    // Merge shards back in the original row order
    let mut merged: Vec<(usize, ReferencePoint)> = shards
        .into_iter()
        .chain(std::iter::once(untouched))
        .flat_map(|shard| shard.positions.into_iter().zip(shard.points))
        .collect();
    merged.sort_by_key(|(position, _)| *position);
    table.extend(merged.into_iter().map(|(_, point)| point));

    normalize_outside(table);

    let processed = reports
        .iter()
        .filter(|r| r.status == ShoeStatus::Processed)
        .count();
    let failed = reports.len() - processed;
    let elapsed_seconds = start_time.elapsed().as_secs_f64();
    info!(
        "Processed {} shoes ({} failed) in {:.2} seconds",
        processed, failed, elapsed_seconds
    );

    Ok(RunSummary {
        dataset: config.dataset,
        grid,
        shoes: reports,
        processed,
        failed,
        elapsed_seconds,
    })
}

/// Clip every mask of the run grid to the prototype
fn clean_all(masks: &[Mask], prototype: &Mask, grid: (usize, usize), debug_dir: Option<&Path>) -> Vec<Mask> {
    if let Some(dir) = debug_dir {
        save_debug_mask(prototype, &dir.join("prototype.png"));
    }
    masks
        .iter()
        .map(|mask| {
            if mask.dimensions() == grid {
                clean_with_prototype(mask, prototype)
            } else {
                // Left for process_shoe to report
                mask.clone()
            }
        })
        .collect()
}

fn save_debug_outcome(dir: &Path, outcome: &ShoeOutcome) {
    let shoe = outcome.shoe;
    let refinement = &outcome.refinement;
    save_debug_mask(
        &refinement.second_pass_input,
        &dir.join(format!("shoe_{}_second_pass_input.png", shoe)),
    );
    save_debug_mask(
        &refinement.curve_raster,
        &dir.join(format!("shoe_{}_snake.png", shoe)),
    );
    save_debug_mask(
        &refinement.boundary_mask,
        &dir.join(format!("shoe_{}_boundary.png", shoe)),
    );
}

fn save_debug_mask(mask: &Mask, path: &Path) {
    if let Err(e) = save_mask(mask, path) {
        warn!("Could not write debug image {}: {}", path.display(), e);
    }
}
