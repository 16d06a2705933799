// src/calibration.rs - Projection of physical reference coordinates onto the pixel grid

use log::warn;
use serde::Deserialize;

use crate::classify::ReferencePoint;
use crate::config::CalibrationConfig;

/// Reference point as supplied by the locations file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawLocation {
    /// Shoe id as numbered in the file
    pub shoe: usize,
    pub rac_num: i64,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Maps physical (x, y) coordinates to (row, col) pixels of an H x W grid.
///
/// Only `relevant_cols` (resp. `relevant_rows`) columns are spanned by the
/// physical range `[-half_extent, half_extent]`; they sit centred in the grid
/// and both axes are mirrored.
#[derive(Debug, Clone)]
pub struct PixelProjection {
    height: usize,
    width: usize,
    calibration: CalibrationConfig,
}

impl PixelProjection {
    pub fn new(height: usize, width: usize, calibration: CalibrationConfig) -> Self {
        Self {
            height,
            width,
            calibration,
        }
    }

    /// Pixel column of a physical x coordinate
    pub fn column(&self, x: f64) -> i64 {
        project_axis(
            x,
            self.width,
            self.calibration.relevant_cols,
            self.calibration.half_extent_x,
        )
    }

    /// Pixel row of a physical y coordinate
    pub fn row(&self, y: f64) -> i64 {
        project_axis(
            y,
            self.height,
            self.calibration.relevant_rows,
            self.calibration.half_extent_y,
        )
    }

    /// (row, col) of a physical point
    pub fn project(&self, x: f64, y: f64) -> (i64, i64) {
        (self.row(y), self.column(x))
    }

    /// Build the reference point table from raw locations.
    ///
    /// Raw coordinates are scaled by `coordinate_divisor` and shoe ids shifted
    /// to 0-based indices; rows whose id falls below the offset are skipped.
    pub fn calibrate(&self, raw: &[RawLocation]) -> Vec<ReferencePoint> {
        let cal = &self.calibration;
        raw.iter()
            .filter_map(|loc| {
                let Some(shoe) = loc.shoe.checked_sub(cal.shoe_index_offset) else {
                    warn!("Skipping reference point {} with shoe id {}", loc.rac_num, loc.shoe);
                    return None;
                };
                let x = loc.x / cal.coordinate_divisor;
                let y = loc.y / cal.coordinate_divisor;
                let (row, col) = self.project(x, y);
                Some(ReferencePoint {
                    x,
                    y,
                    kind: loc.kind.clone(),
                    ..ReferencePoint::new(shoe, loc.rac_num, row, col)
                })
            })
            .collect()
    }
}

fn project_axis(value: f64, size: usize, relevant: usize, half_extent: f64) -> i64 {
    let unused = (size as i64 - relevant as i64 + 1).div_euclid(2);
    let step = 2.0 * half_extent / relevant as f64;
    let index = ((value + half_extent) / step).floor() as i64 + unused;
    size as i64 - index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection() -> PixelProjection {
        PixelProjection::new(367, 255, CalibrationConfig::default())
    }

    #[test]
    fn origin_maps_to_grid_centre() {
        let p = projection();
        // ceil((255 - 150) / 2) = 53, 0.25 / (0.5 / 150) = 75 -> 255 - 128
        assert_eq!(p.column(0.0), 127);
        // ceil((367 - 300) / 2) = 34, 0.5 / (1 / 300) = 150 -> 367 - 184
        assert_eq!(p.row(0.0), 183);
        assert_eq!(p.project(0.0, 0.0), (183, 127));
    }

    #[test]
    fn axes_are_mirrored() {
        let p = projection();
        assert!(p.column(0.1) < p.column(-0.1));
        assert!(p.row(0.3) < p.row(-0.3));
    }

    #[test]
    fn range_ends_map_to_relevant_band() {
        let p = projection();
        assert_eq!(p.column(-0.25), 255 - 53);
        assert_eq!(p.column(0.25), 255 - 53 - 150);
    }

    #[test]
    fn calibrate_builds_unclassified_rows() {
        let raw = vec![
            RawLocation { shoe: 1, rac_num: 7, x: 0.0, y: 0.0, kind: Some("A".to_string()) },
            RawLocation { shoe: 3, rac_num: 2, x: 0.2, y: -0.4, kind: None },
            RawLocation { shoe: 0, rac_num: 9, x: 0.0, y: 0.0, kind: None },
        ];
        let table = projection().calibrate(&raw);

        assert_eq!(table.len(), 2);
        assert_eq!(table[0].shoe, 0);
        assert_eq!((table[0].row, table[0].col), (183, 127));
        assert_eq!(table[0].kind.as_deref(), Some("A"));
        assert_eq!(table[0].inside, None);

        // Divided by 2 before projection
        assert_eq!(table[1].shoe, 2);
        assert_eq!(table[1].x, 0.1);
        assert_eq!(table[1].y, -0.2);
        assert_eq!(table[1].col, projection().column(0.1));
    }
}
