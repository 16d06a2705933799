// src/classify.rs - Containment test and boundary distances for reference points

use serde::{Deserialize, Serialize};

use crate::mask::PointSet;

/// One row of the reference point table.
///
/// Created at calibration time, filled in by [`classify_shoe`] and never
/// removed. Column names follow the persisted CSV layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// 0-based shoe index
    pub shoe: usize,
    /// Point id within the shoe
    pub rac_num: i64,
    /// Physical coordinates
    pub x: f64,
    pub y: f64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Pixel projection
    #[serde(rename = "COL")]
    pub col: i64,
    #[serde(rename = "ROW")]
    pub row: i64,
    #[serde(rename = "INSIDE_SNAKE", default)]
    pub inside: Option<bool>,
    #[serde(rename = "HORIZ_DIST_SNAKE", default)]
    pub horizontal_distance: Option<f64>,
    #[serde(rename = "DIST_SNAKE", default)]
    pub nearest_distance: Option<f64>,
}

impl ReferencePoint {
    /// New unclassified point
    pub fn new(shoe: usize, rac_num: i64, row: i64, col: i64) -> Self {
        Self {
            shoe,
            rac_num,
            x: 0.0,
            y: 0.0,
            kind: None,
            col,
            row,
            inside: None,
            horizontal_distance: None,
            nearest_distance: None,
        }
    }
}

/// Result of the horizontal crossing test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalCrossing {
    pub contained: bool,
    /// `|d1|`; undefined when the row holds fewer than two boundary pixels
    pub distance: Option<f64>,
}

/// Full classification of one reference point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointClassification {
    pub contained: bool,
    pub horizontal_distance: Option<f64>,
    pub nearest_distance: Option<f64>,
}

/// Euclidean distance to the closest boundary pixel, rounded to an integer.
///
/// Brute force over the whole set; `None` for an empty boundary.
pub fn nearest_boundary_distance(boundary: &PointSet, point: (i64, i64)) -> Option<f64> {
    boundary
        .iter()
        .map(|&(r, c)| {
            let dr = r as f64 - point.0 as f64;
            let dc = c as f64 - point.1 as f64;
            (dr * dr + dc * dc).sqrt()
        })
        .min_by(|a, b| a.total_cmp(b))
        .map(f64::round)
}

/// Horizontal ray crossing test along the point's row.
///
/// Signed offsets `boundary_col - point_col` of the same-row boundary pixels
/// are sorted by magnitude; an offset differing by exactly 1 from its
/// predecessor in that order is dropped as part of the same crossing. The
/// two nearest surviving crossings `d1, d2` bracket the point iff
/// `d1 * d2 <= 0`.
pub fn horizontal_crossing(boundary: &PointSet, point: (i64, i64)) -> HorizontalCrossing {
    let not_contained = HorizontalCrossing {
        contained: false,
        distance: None,
    };

    if point.0 < 0 {
        return not_contained;
    }
    let row = point.0 as usize;

    let mut offsets: Vec<i64> = boundary
        .range((row, 0)..=(row, usize::MAX))
        .map(|&(_, c)| c as i64 - point.1)
        .collect();

    if offsets.len() < 2 {
        return not_contained;
    }

    offsets.sort_by_key(|d| d.abs());

    let mut crossings = vec![offsets[0]];
    for pair in offsets.windows(2) {
        if (pair[0] - pair[1]).abs() != 1 {
            crossings.push(pair[1]);
        }
    }
    if crossings.len() < 2 {
        crossings.push(offsets[1]);
    }

    let (d1, d2) = (crossings[0], crossings[1]);
    HorizontalCrossing {
        contained: d1 * d2 <= 0,
        distance: Some(d1.abs() as f64),
    }
}

/// Classify a single point against a boundary
pub fn classify_point(boundary: &PointSet, point: (i64, i64)) -> PointClassification {
    let crossing = horizontal_crossing(boundary, point);
    PointClassification {
        contained: crossing.contained,
        horizontal_distance: crossing.distance,
        nearest_distance: nearest_boundary_distance(boundary, point),
    }
}

/// Fill the result columns of every table row belonging to `shoe`.
///
/// Returns the number of rows classified. The boundary is only read.
pub fn classify_shoe(boundary: &PointSet, shoe: usize, table: &mut [ReferencePoint]) -> usize {
    let mut classified = 0;
    for point in table.iter_mut().filter(|p| p.shoe == shoe) {
        let result = classify_point(boundary, (point.row, point.col));
        point.inside = Some(result.contained);
        point.horizontal_distance = result.horizontal_distance;
        point.nearest_distance = result.nearest_distance;
        classified += 1;
    }
    classified
}

/// Force both distances of every point classified as outside to exactly 0
pub fn normalize_outside(table: &mut [ReferencePoint]) {
    for point in table.iter_mut() {
        if point.inside == Some(false) {
            point.horizontal_distance = Some(0.0);
            point.nearest_distance = Some(0.0);
        }
    }
}
