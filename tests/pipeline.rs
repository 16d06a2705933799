use shoe_contour_rust_lib::{
    classify_point, extract_contour, process_dataset, process_shoe, ActiveContourSolver, Config,
    Curve, CurveRefiner, CurveSolver, Mask, ReferencePoint, Result, ShoeContourError, SnakeWeights,
};
use shoe_contour_rust_lib::image_utils::IntensityImage;
use shoe_contour_rust_lib::pipeline::ShoeStatus;

/// Ignores its input and always answers with the same square outline
struct SquareSolver {
    lo: f64,
    hi: f64,
}

impl CurveSolver for SquareSolver {
    fn refine(&self, _image: &IntensityImage, _initial: &Curve, _weights: SnakeWeights) -> Result<Curve> {
        Ok(Curve::new(vec![
            (self.lo, self.lo),
            (self.lo, self.hi),
            (self.hi, self.hi),
            (self.hi, self.lo),
        ]))
    }
}

fn small_config(size: usize) -> Config {
    let mut config = Config::default();
    config.grid_height = size;
    config.grid_width = size;
    config.ellipse_center_row = size as f64 / 2.0;
    config.ellipse_center_col = size as f64 / 2.0;
    config.ellipse_radius_row = size as f64 * 0.4;
    config.ellipse_radius_col = size as f64 * 0.4;
    config.snake_points = 80;
    config.max_iterations = 400;
    config.curve_thickness = 1;
    config.use_prototype_cleaning = false;
    config
}

fn disk(size: usize, center: (f64, f64), radius: f64) -> Mask {
    Mask::from_fn(size, size, |r, c| {
        let dr = r as f64 - center.0;
        let dc = c as f64 - center.1;
        dr * dr + dc * dc <= radius * radius
    })
}

#[test]
fn disk_rim_and_centre_classification() {
    let mask = disk(10, (5.0, 5.0), 4.0);
    let boundary = extract_contour(&mask);

    assert!(!boundary.contains(&(5, 5)));
    assert!(boundary.iter().all(|&(r, c)| mask.get(r, c)));
    let lit = |r: i64, c: i64| (0..10).contains(&r) && (0..10).contains(&c) && mask.get(r as usize, c as usize);
    for &(r, c) in &boundary {
        let (r, c) = (r as i64, c as i64);
        let interior = lit(r - 1, c) && lit(r + 1, c) && lit(r, c - 1) && lit(r, c + 1);
        assert!(!interior, "({r}, {c}) is an interior pixel");
    }

    let result = classify_point(&boundary, (5, 5));
    assert!(result.contained);
    assert_eq!(result.horizontal_distance, Some(4.0));
    assert_eq!(result.nearest_distance, Some(4.0));
}

#[test]
fn dataset_run_keeps_row_order_and_zeroes_outside_points() {
    let config = small_config(20);
    let masks = vec![disk(20, (9.0, 9.0), 5.0), disk(20, (10.0, 10.0), 6.0)];
    let solver = SquareSolver { lo: 4.0, hi: 14.0 };

    let mut table = vec![
        ReferencePoint::new(1, 1, 9, 9),   // inside, 5 from both sides
        ReferencePoint::new(0, 1, 9, 18),  // right of the square
        ReferencePoint::new(7, 1, 9, 9),   // unknown shoe
        ReferencePoint::new(0, 2, 6, 6),   // inside, 2 from the left side
    ];

    let summary = process_dataset(&masks, &mut table, &config, &solver, None).unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.shoes[0].reference_points, 2);

    let ids: Vec<(usize, i64)> = table.iter().map(|p| (p.shoe, p.rac_num)).collect();
    assert_eq!(ids, vec![(1, 1), (0, 1), (7, 1), (0, 2)]);

    assert_eq!(table[0].inside, Some(true));
    assert_eq!(table[0].horizontal_distance, Some(5.0));
    assert_eq!(table[0].nearest_distance, Some(5.0));

    assert_eq!(table[1].inside, Some(false));
    assert_eq!(table[1].horizontal_distance, Some(0.0));
    assert_eq!(table[1].nearest_distance, Some(0.0));

    assert_eq!(table[2].inside, None);

    assert_eq!(table[3].inside, Some(true));
    assert_eq!(table[3].horizontal_distance, Some(2.0));
    assert_eq!(table[3].nearest_distance, Some(2.0));
}

#[test]
fn sequential_and_parallel_runs_agree() {
    let mut config = small_config(20);
    let masks = vec![disk(20, (9.0, 9.0), 5.0); 3];
    let solver = SquareSolver { lo: 3.0, hi: 15.0 };
    let table: Vec<ReferencePoint> = (0..3)
        .flat_map(|shoe| (0..4).map(move |i| ReferencePoint::new(shoe, i, 2 + 4 * i, 9)))
        .collect();

    let mut parallel = table.clone();
    config.use_parallel = true;
    process_dataset(&masks, &mut parallel, &config, &solver, None).unwrap();

    let mut sequential = table;
    config.use_parallel = false;
    process_dataset(&masks, &mut sequential, &config, &solver, None).unwrap();

    assert_eq!(parallel, sequential);
}

#[test]
fn mismatched_mask_fails_only_its_shoe() {
    let config = small_config(20);
    let masks = vec![disk(20, (9.0, 9.0), 5.0), Mask::new(12, 20)];
    let solver = SquareSolver { lo: 4.0, hi: 14.0 };
    let mut table = vec![ReferencePoint::new(0, 1, 9, 9), ReferencePoint::new(1, 1, 9, 9)];

    let summary = process_dataset(&masks, &mut table, &config, &solver, None).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.shoes[1].status, ShoeStatus::Failed);
    assert_eq!(table[0].inside, Some(true));
    assert_eq!(table[1].inside, None);
}

#[test]
fn process_shoe_rejects_wrong_dimensions() {
    let config = small_config(20);
    let solver = SquareSolver { lo: 4.0, hi: 14.0 };
    let refiner = CurveRefiner::from_config(&solver, &config);
    let result = process_shoe(0, &Mask::new(20, 21), &refiner, &mut []);
    assert!(matches!(
        result,
        Err(ShoeContourError::DimensionMismatch { expected: (20, 20), found: (20, 21) })
    ));
}

#[test]
fn prototype_cleaning_runs_before_refinement() {
    let mut config = small_config(20);
    config.use_prototype_cleaning = true;
    config.prototype_min_frequency = 2;
    let masks = vec![disk(20, (9.0, 9.0), 5.0); 2];
    let solver = SquareSolver { lo: 4.0, hi: 14.0 };
    let mut table = vec![ReferencePoint::new(0, 1, 9, 9)];

    let summary = process_dataset(&masks, &mut table, &config, &solver, None).unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(table[0].inside, Some(true));
}

#[test]
fn built_in_solver_encloses_a_disk() {
    let mut config = small_config(60);
    config.ellipse_radius_row = 22.0;
    config.ellipse_radius_col = 22.0;
    config.ellipse_center_row = 30.0;
    config.ellipse_center_col = 30.0;
    config.curve_thickness = 3;

    let masks = vec![disk(60, (30.0, 30.0), 14.0)];
    let solver = ActiveContourSolver::from_config(&config);
    let mut table = vec![
        ReferencePoint::new(0, 1, 30, 30),
        ReferencePoint::new(0, 2, 5, 5),
    ];

    let summary = process_dataset(&masks, &mut table, &config, &solver, None).unwrap();

    assert_eq!(summary.processed, 1);
    assert!(summary.shoes[0].boundary_points > 0);
    assert_eq!(table[0].inside, Some(true));
    assert!(table[0].nearest_distance.unwrap() > 0.0);
    assert_eq!(table[1].inside, Some(false));
    assert_eq!(table[1].nearest_distance, Some(0.0));
}

#[test]
fn prototype_cleaning_ignores_mismatched_masks() {
    let mut config = small_config(20);
    config.use_prototype_cleaning = true;
    config.prototype_min_frequency = 1;
    let masks = vec![disk(20, (9.0, 9.0), 5.0), Mask::new(12, 20)];
    let solver = SquareSolver { lo: 4.0, hi: 14.0 };
    let mut table = vec![ReferencePoint::new(0, 1, 9, 9)];

    let summary = process_dataset(&masks, &mut table, &config, &solver, None).unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(table[0].inside, Some(true));
}

#[test]
fn fewer_shoes_than_prototype_frequency_leaves_masks_uncleaned() {
    let mut config = small_config(60);
    config.ellipse_radius_row = 22.0;
    config.ellipse_radius_col = 22.0;
    config.ellipse_center_row = 30.0;
    config.ellipse_center_col = 30.0;
    config.curve_thickness = 3;
    config.use_parallel = false;

    let masks = vec![disk(60, (30.0, 30.0), 14.0); 2];
    let solver = ActiveContourSolver::from_config(&config);
    let table = vec![ReferencePoint::new(0, 1, 30, 30), ReferencePoint::new(1, 1, 30, 30)];

    let mut cleaned = table.clone();
    config.use_prototype_cleaning = true;
    assert_eq!(config.prototype_min_frequency, 18);
    let with_cleaning = process_dataset(&masks, &mut cleaned, &config, &solver, None).unwrap();

    let mut plain = table;
    config.use_prototype_cleaning = false;
    let without_cleaning = process_dataset(&masks, &mut plain, &config, &solver, None).unwrap();

    assert_eq!(cleaned, plain);
    assert_eq!(
        with_cleaning.shoes[0].boundary_points,
        without_cleaning.shoes[0].boundary_points
    );
}
