// src/contour.rs - Extreme-projection contour extraction

use crate::mask::{Mask, PointSet};

/// Min/max foreground column for every row (`None` for empty rows)
pub fn row_extents(mask: &Mask) -> Vec<Option<(usize, usize)>> {
    let mut extents: Vec<Option<(usize, usize)>> = vec![None; mask.height()];
    for (row, col) in mask.foreground() {
        extents[row] = Some(match extents[row] {
            Some((lo, hi)) => (lo.min(col), hi.max(col)),
            None => (col, col),
        });
    }
    extents
}

/// Min/max foreground row for every column (`None` for empty columns)
pub fn column_extents(mask: &Mask) -> Vec<Option<(usize, usize)>> {
    let mut extents: Vec<Option<(usize, usize)>> = vec![None; mask.width()];
    for (row, col) in mask.foreground() {
        extents[col] = Some(match extents[col] {
            Some((lo, hi)) => (lo.min(row), hi.max(row)),
            None => (row, row),
        });
    }
    extents
}

/// Extract the outline of a filled region by extreme projection.
///
/// For every row and every column holding foreground, only the first and
/// last foreground pixel are kept; the result is the union of both passes.
/// A line with a single foreground pixel contributes that pixel once. An
/// empty mask yields an empty set.
pub fn extract_contour(mask: &Mask) -> PointSet {
    let mut points = PointSet::new();

    for (row, extent) in row_extents(mask).into_iter().enumerate() {
        if let Some((min_col, max_col)) = extent {
            points.insert((row, min_col));
            points.insert((row, max_col));
        }
    }

    for (col, extent) in column_extents(mask).into_iter().enumerate() {
        if let Some((min_row, max_row)) = extent {
            points.insert((min_row, col));
            points.insert((max_row, col));
        }
    }

    points
}

/// Convenience: extract the contour and rasterize it on the same grid
pub fn contour_mask(mask: &Mask) -> Mask {
    let points = extract_contour(mask);
    Mask::from_points(mask.height(), mask.width(), &points)
}

/// Fill every row span of `mask`, stripping a margin from wide spans.
///
/// For each row with foreground, `span = max - min + 1`. When the span
/// exceeds `threshold`, `min(span / 2, max_margin)` pixels are trimmed from
/// both ends. The retained columns are `[min + trim, max + 1 - trim)`.
pub fn fill_row_spans_with_margin(mask: &Mask, threshold: usize, max_margin: usize) -> Mask {
    let mut filled = Mask::new(mask.height(), mask.width());

    for (row, extent) in row_extents(mask).into_iter().enumerate() {
        let Some((min_col, max_col)) = extent else {
            continue;
        };

        let mut start = min_col;
        let mut end = max_col + 1;
        let span = end - start;
        if span > threshold {
            let trim = (span / 2).min(max_margin);
            start += trim;
            end -= trim;
        }

        for col in start..end {
            filled.set(row, col, true);
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(size: usize, center: (i64, i64), radius: i64) -> Mask {
        Mask::from_fn(size, size, |r, c| {
            let dr = r as i64 - center.0;
            let dc = c as i64 - center.1;
            dr * dr + dc * dc <= radius * radius
        })
    }

    /// Foreground pixels with at least one 4-neighbour in the background
    fn rim(mask: &Mask) -> PointSet {
        let (h, w) = mask.dimensions();
        mask.foreground()
            .filter(|&(r, c)| {
                r == 0
                    || c == 0
                    || r + 1 == h
                    || c + 1 == w
                    || !mask.get(r - 1, c)
                    || !mask.get(r + 1, c)
                    || !mask.get(r, c - 1)
                    || !mask.get(r, c + 1)
            })
            .collect()
    }

    #[test]
    fn empty_mask_yields_empty_contour() {
        assert!(extract_contour(&Mask::new(5, 7)).is_empty());
    }

    #[test]
    fn single_pixel_is_its_own_contour() {
        let mask = Mask::from_points(6, 6, &[(2, 4)]);
        let contour = extract_contour(&mask);
        assert_eq!(contour, [(2, 4)].into_iter().collect());
    }

    #[test]
    fn filled_rectangle_gives_perimeter() {
        // rows 2..=6, cols 1..=8
        let mask = Mask::from_fn(10, 10, |r, c| (2..=6).contains(&r) && (1..=8).contains(&c));
        let contour = extract_contour(&mask);

        let expected: PointSet = mask
            .foreground()
            .filter(|&(r, c)| r == 2 || r == 6 || c == 1 || c == 8)
            .collect();
        assert_eq!(contour, expected);
    }

    #[test]
    fn contour_is_subset_of_foreground() {
        let mask = Mask::from_fn(12, 9, |r, c| (r * 7 + c * 3) % 5 == 0);
        for (r, c) in extract_contour(&mask) {
            assert!(mask.get(r, c));
        }
    }

    #[test]
    fn disk_contour_is_exactly_the_rim() {
        let mask = disk(10, (5, 5), 4);
        let contour = extract_contour(&mask);
        assert_eq!(contour, rim(&mask));
        assert!(!contour.contains(&(5, 5)));
    }

    #[test]
    fn extraction_is_idempotent_after_one_pass() {
        let mask = disk(16, (8, 7), 6);
        let once = contour_mask(&mask);
        let twice = contour_mask(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn margin_fill_trims_wide_spans() {
        // Row 0 spans columns 2..=11 (span 10 -> trim 3), row 1 spans 4..=6 (span 3, untouched)
        let mut mask = Mask::new(2, 14);
        mask.set(0, 2, true);
        mask.set(0, 11, true);
        mask.set(1, 4, true);
        mask.set(1, 6, true);

        let filled = fill_row_spans_with_margin(&mask, 3, 3);
        let row0: Vec<usize> = (0..14).filter(|&c| filled.get(0, c)).collect();
        let row1: Vec<usize> = (0..14).filter(|&c| filled.get(1, c)).collect();

        assert_eq!(row0, vec![5, 6, 7, 8]);
        assert_eq!(row1, vec![4, 5, 6]);
    }

    #[test]
    fn margin_fill_trims_at_most_half_span() {
        // Span 4 -> trim min(2, 3) = 2 leaves nothing
        let mask = Mask::from_points(1, 6, &[(0, 1), (0, 4)]);
        let filled = fill_row_spans_with_margin(&mask, 3, 3);
        assert!(filled.is_empty());

        // Span 5 -> trim 2 leaves the centre column
        let mask = Mask::from_points(1, 6, &[(0, 0), (0, 4)]);
        let filled = fill_row_spans_with_margin(&mask, 3, 3);
        assert_eq!(filled.to_points(), [(0, 2)].into_iter().collect());
    }
}
