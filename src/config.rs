// src/config.rs - Run configuration, loaded once and never mutated during processing

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{Result, ShoeContourError};

/// Configuration for a processing run
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Contacts text file or directory of PNG masks
    pub input_path: String,
    pub output_base_dir: String,

    /// Raw reference point locations
    #[serde(default)]
    pub locations_path: Option<String>,

    #[serde(default = "default_locations_format")]
    pub locations_format: LocationsFormat,

    #[serde(default = "default_dataset")]
    pub dataset: DatasetChoice,

    // Grid dimensions (rows, columns); constant for the whole run
    pub grid_height: usize,
    pub grid_width: usize,

    // Initial elliptical curve shared by both snake passes
    pub ellipse_center_row: f64,
    pub ellipse_center_col: f64,
    pub ellipse_radius_row: f64,
    pub ellipse_radius_col: f64,

    #[serde(default = "default_snake_points")]
    pub snake_points: usize,

    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,

    // Snake weights
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    #[serde(default = "default_first_pass_beta")]
    pub first_pass_beta: f64,

    #[serde(default = "default_second_pass_beta")]
    pub second_pass_beta: f64,

    #[serde(default = "default_gamma")]
    pub gamma: f64,

    // Active contour solver parameters
    #[serde(default)]
    pub w_line: f64,

    #[serde(default = "default_w_edge")]
    pub w_edge: f64,

    #[serde(default = "default_max_px_move")]
    pub max_px_move: f64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_convergence")]
    pub convergence: f64,

    // Rasterization and margin stripping
    #[serde(default = "default_curve_thickness")]
    pub curve_thickness: u32,

    #[serde(default = "default_margin_threshold")]
    pub margin_threshold: usize,

    #[serde(default = "default_max_margin")]
    pub max_margin: usize,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    // Prototype-based noise removal
    #[serde(default = "default_use_prototype_cleaning")]
    pub use_prototype_cleaning: bool,

    #[serde(default = "default_prototype_min_frequency")]
    pub prototype_min_frequency: usize,

    /// Shoe indices stored mirrored in the mask source (left shoes)
    #[serde(default)]
    pub mirrored_shoes: Vec<usize>,

    #[serde(default)]
    pub calibration: CalibrationConfig,
}

/// Dataset preset
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatasetChoice {
    Old,
    New,
}

/// Layout of the raw reference point locations file
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationsFormat {
    /// Headered CSV with `shoe,rac_num,x,y[,type]` columns
    Csv,
    /// Space separated, no header; columns 1..=5 are shoe, point id, x, y, type
    Whitespace,
}

/// Constants of the physical -> pixel projection of reference points
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CalibrationConfig {
    /// Columns actually covered by physical coordinates
    #[serde(default = "default_relevant_cols")]
    pub relevant_cols: usize,
    /// Half width of the physical x range
    #[serde(default = "default_half_extent_x")]
    pub half_extent_x: f64,
    #[serde(default = "default_relevant_rows")]
    pub relevant_rows: usize,
    #[serde(default = "default_half_extent_y")]
    pub half_extent_y: f64,
    /// Raw coordinates are divided by this before projection
    #[serde(default = "default_coordinate_divisor")]
    pub coordinate_divisor: f64,
    /// Subtracted from raw shoe ids to get 0-based shoe indices
    #[serde(default = "default_shoe_index_offset")]
    pub shoe_index_offset: usize,
}

fn default_dataset() -> DatasetChoice {
    DatasetChoice::New
}

fn default_locations_format() -> LocationsFormat {
    LocationsFormat::Whitespace
}

fn default_snake_points() -> usize {
    400
}

fn default_blur_sigma() -> f32 {
    3.0
}

fn default_alpha() -> f64 {
    0.015
}

fn default_first_pass_beta() -> f64 {
    10.0 // rigid first pass
}

fn default_second_pass_beta() -> f64 {
    0.10
}

fn default_gamma() -> f64 {
    0.001
}

fn default_w_edge() -> f64 {
    1.0
}

fn default_max_px_move() -> f64 {
    1.0
}

fn default_max_iterations() -> usize {
    2500
}

fn default_convergence() -> f64 {
    0.1
}

fn default_curve_thickness() -> u32 {
    3
}

fn default_margin_threshold() -> usize {
    3
}

fn default_max_margin() -> usize {
    3
}

fn default_parallel() -> bool {
    true
}

fn default_use_prototype_cleaning() -> bool {
    true
}

fn default_prototype_min_frequency() -> usize {
    18
}

fn default_relevant_cols() -> usize {
    150
}

fn default_half_extent_x() -> f64 {
    0.25
}

fn default_relevant_rows() -> usize {
    300
}

fn default_half_extent_y() -> f64 {
    0.5
}

fn default_coordinate_divisor() -> f64 {
    2.0
}

fn default_shoe_index_offset() -> usize {
    1
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            relevant_cols: default_relevant_cols(),
            half_extent_x: default_half_extent_x(),
            relevant_rows: default_relevant_rows(),
            half_extent_y: default_half_extent_y(),
            coordinate_divisor: default_coordinate_divisor(),
            shoe_index_offset: default_shoe_index_offset(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::for_dataset(DatasetChoice::New)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ShoeContourError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| ShoeContourError::ConfigLoad {
            source: e,
            path: path.to_path_buf(),
        })
    }

    /// Default configuration for one of the known datasets
    pub fn for_dataset(dataset: DatasetChoice) -> Self {
        let mut config = Self {
            input_path: "./data/contacts_data.txt".to_string(),
            output_base_dir: "./output".to_string(),
            locations_path: None,
            locations_format: default_locations_format(),
            dataset,
            grid_height: 0,
            grid_width: 0,
            ellipse_center_row: 0.0,
            ellipse_center_col: 0.0,
            ellipse_radius_row: 0.0,
            ellipse_radius_col: 0.0,
            snake_points: default_snake_points(),
            blur_sigma: default_blur_sigma(),
            alpha: default_alpha(),
            first_pass_beta: default_first_pass_beta(),
            second_pass_beta: default_second_pass_beta(),
            gamma: default_gamma(),
            w_line: 0.0,
            w_edge: default_w_edge(),
            max_px_move: default_max_px_move(),
            max_iterations: default_max_iterations(),
            convergence: default_convergence(),
            curve_thickness: default_curve_thickness(),
            margin_threshold: default_margin_threshold(),
            max_margin: default_max_margin(),
            use_parallel: default_parallel(),
            use_prototype_cleaning: default_use_prototype_cleaning(),
            prototype_min_frequency: default_prototype_min_frequency(),
            mirrored_shoes: Vec::new(),
            calibration: CalibrationConfig::default(),
        };
        config.apply_dataset_preset(dataset);
        config
    }

    /// Overwrite grid, ellipse and calibration fields with a dataset's constants
    pub fn apply_dataset_preset(&mut self, dataset: DatasetChoice) {
        self.dataset = dataset;
        match dataset {
            DatasetChoice::Old => {
                self.grid_height = 395;
                self.grid_width = 307;
                self.ellipse_center_row = 200.0;
                self.ellipse_center_col = 155.0;
                self.ellipse_radius_row = 162.0;
                self.ellipse_radius_col = 90.0;
                self.mirrored_shoes = vec![8];
                self.locations_format = LocationsFormat::Csv;
                self.calibration.coordinate_divisor = 1.0;
            }
            DatasetChoice::New => {
                self.grid_height = 367;
                self.grid_width = 255;
                self.ellipse_center_row = 185.0;
                self.ellipse_center_col = 128.0;
                self.ellipse_radius_row = 162.0;
                self.ellipse_radius_col = 95.0;
                self.mirrored_shoes = Vec::new();
                self.locations_format = LocationsFormat::Whitespace;
                self.calibration.coordinate_divisor = default_coordinate_divisor();
            }
        }
    }

    /// (height, width) of every mask in the run
    pub fn grid_dimensions(&self) -> (usize, usize) {
        (self.grid_height, self.grid_width)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.grid_height == 0 || self.grid_width == 0 {
            return Err(ShoeContourError::Config(
                "grid_height and grid_width must be > 0".to_string(),
            ));
        }

        if self.snake_points < 3 {
            return Err(ShoeContourError::Config(
                "snake_points must be >= 3".to_string(),
            ));
        }

        if self.ellipse_radius_row <= 0.0 || self.ellipse_radius_col <= 0.0 {
            return Err(ShoeContourError::Config(
                "ellipse radii must be > 0.0".to_string(),
            ));
        }

        if self.blur_sigma <= 0.0 {
            return Err(ShoeContourError::Config(
                "blur_sigma must be > 0.0".to_string(),
            ));
        }

        // gamma > 0 keeps the implicit snake system invertible
        if self.gamma <= 0.0 {
            return Err(ShoeContourError::Config(
                "gamma must be > 0.0".to_string(),
            ));
        }

        if self.alpha < 0.0 || self.first_pass_beta < 0.0 || self.second_pass_beta < 0.0 {
            return Err(ShoeContourError::Config(
                "alpha and beta weights must be >= 0.0".to_string(),
            ));
        }

        if self.max_px_move <= 0.0 {
            return Err(ShoeContourError::Config(
                "max_px_move must be > 0.0".to_string(),
            ));
        }

        if self.curve_thickness == 0 {
            return Err(ShoeContourError::Config(
                "curve_thickness must be > 0".to_string(),
            ));
        }

        if self.use_prototype_cleaning && self.prototype_min_frequency == 0 {
            return Err(ShoeContourError::Config(
                "prototype_min_frequency must be > 0".to_string(),
            ));
        }

        let cal = &self.calibration;
        if cal.relevant_cols == 0 || cal.relevant_rows == 0 {
            return Err(ShoeContourError::Config(
                "calibration relevant_cols and relevant_rows must be > 0".to_string(),
            ));
        }
        if cal.half_extent_x <= 0.0 || cal.half_extent_y <= 0.0 || cal.coordinate_divisor <= 0.0 {
            return Err(ShoeContourError::Config(
                "calibration extents and coordinate_divisor must be > 0.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ShoeContourError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_presets() {
        let old = Config::for_dataset(DatasetChoice::Old);
        assert_eq!(old.grid_dimensions(), (395, 307));
        assert_eq!(old.mirrored_shoes, vec![8]);
        assert_eq!(old.locations_format, LocationsFormat::Csv);

        let new = Config::default();
        assert_eq!(new.dataset, DatasetChoice::New);
        assert_eq!(new.grid_dimensions(), (367, 255));
        assert_eq!(new.ellipse_radius_col, 95.0);
        assert!(new.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_gamma() {
        let mut config = Config::default();
        config.gamma = 0.0;
        assert!(matches!(config.validate(), Err(ShoeContourError::Config(_))));
    }

    #[test]
    fn saved_config_loads_back() {
        let mut config = Config::for_dataset(DatasetChoice::Old);
        config.max_iterations = 42;
        let path = std::env::temp_dir().join(format!("shoe_contour_config_{}.toml", std::process::id()));
        config.save_to_file(&path).unwrap();
        let parsed = Config::from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(parsed.max_iterations, 42);
        assert_eq!(parsed.dataset, DatasetChoice::Old);
        assert_eq!(parsed.calibration, config.calibration);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let text = r#"
            input_path = "in"
            output_base_dir = "out"
            grid_height = 20
            grid_width = 10
            ellipse_center_row = 10.0
            ellipse_center_col = 5.0
            ellipse_radius_row = 8.0
            ellipse_radius_col = 4.0
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.snake_points, 400);
        assert_eq!(config.second_pass_beta, 0.10);
        assert_eq!(config.calibration.relevant_cols, 150);
        assert!(config.validate().is_ok());
    }
}
