// src/lib.rs - Library interface for shoe contact boundary analysis

pub mod calibration;
pub mod classify;
pub mod config;
pub mod contour;
pub mod errors;
pub mod image_io;
pub mod image_utils;
pub mod mask;
pub mod output;
pub mod pipeline;
pub mod prototype;
pub mod refine;
pub mod snake;

// Re-export commonly used types and functions
pub use errors::{Result, ShoeContourError};
pub use config::{Config, DatasetChoice, LocationsFormat};
pub use mask::{Mask, Pixel, PointSet};
pub use pipeline::{process_dataset, process_shoe, RunSummary, ShoeOutcome};

pub use contour::{extract_contour, contour_mask, fill_row_spans_with_margin};

pub use snake::{ActiveContourSolver, Curve, CurveSolver, SnakeWeights};
pub use refine::{CurveRefiner, RefinementOutcome, RefinerSettings};

pub use classify::{
    classify_point,
    classify_shoe,
    horizontal_crossing,
    nearest_boundary_distance,
    normalize_outside,
    ReferencePoint,
};

pub use calibration::{PixelProjection, RawLocation};
pub use prototype::{build_prototype, clean_with_prototype, frequency_mask};
