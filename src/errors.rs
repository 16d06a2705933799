// src/errors.rs - Crate error type and result alias

use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for the shoe contour pipeline
#[derive(Error, Debug)]
pub enum ShoeContourError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Mask dimensions {found:?} do not match configured grid {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Curve solver error: {0}")]
    Solver(String),

    #[error("Invalid mask data: {0}")]
    InvalidMaskData(String),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("Unexpected error: {0}")]
    Other(String),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, ShoeContourError>;
