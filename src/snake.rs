// src/snake.rs - Closed curves and the active contour (snake) solver

use image::Luma;
use imageproc::filter::filter3x3;
use imageproc::gradients::{HORIZONTAL_SOBEL, VERTICAL_SOBEL};
use imageproc::map::{map_colors, map_colors2};
use log::debug;
use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;
use std::f64::consts::PI;

use crate::config::Config;
use crate::errors::{Result, ShoeContourError};
use crate::image_utils::IntensityImage;

/// Number of past configurations compared by the convergence test
const CONVERGENCE_ORDER: usize = 10;

/// Ordered closed curve of (row, col) samples; the last sample joins the first
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    points: Vec<(f64, f64)>,
}

impl Curve {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Ellipse sampled at `samples` evenly spaced angles over `[0, 2pi]`.
    ///
    /// Both ends of the angle range are included, so the first and last
    /// samples coincide.
    pub fn ellipse(center: (f64, f64), radii: (f64, f64), samples: usize) -> Self {
        let step = if samples > 1 {
            2.0 * PI / (samples - 1) as f64
        } else {
            0.0
        };
        let points = (0..samples)
            .map(|i| {
                let s = step * i as f64;
                (center.0 + radii.0 * s.sin(), center.1 + radii.1 * s.cos())
            })
            .collect();
        Self { points }
    }

    /// Initial curve configured for the run
    pub fn initial_from_config(config: &Config) -> Self {
        Self::ellipse(
            (config.ellipse_center_row, config.ellipse_center_col),
            (config.ellipse_radius_row, config.ellipse_radius_col),
            config.snake_points,
        )
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Weights of the internal and external snake energies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnakeWeights {
    /// Smoothness (length) weight
    pub alpha: f64,
    /// Rigidity (curvature) weight
    pub beta: f64,
    /// Explicit time step / external force gain
    pub gamma: f64,
}

/// Deformable curve fitting over a scalar intensity field.
///
/// Implementations must be deterministic and return a curve with the same
/// number of samples as `initial`. Non-convergence is not an error: the last
/// iterate is returned.
pub trait CurveSolver: Sync {
    fn refine(&self, image: &IntensityImage, initial: &Curve, weights: SnakeWeights) -> Result<Curve>;
}

/// Semi-implicit active contour with periodic boundary conditions
#[derive(Debug, Clone)]
pub struct ActiveContourSolver {
    /// Weight of the raw intensity in the external energy
    pub w_line: f64,
    /// Weight of the edge magnitude in the external energy
    pub w_edge: f64,
    /// Cap on per-iteration movement of a sample, in pixels
    pub max_px_move: f64,
    pub max_iterations: usize,
    /// Displacement below which the curve counts as settled
    pub convergence: f64,
}

impl Default for ActiveContourSolver {
    fn default() -> Self {
        Self {
            w_line: 0.0,
            w_edge: 1.0,
            max_px_move: 1.0,
            max_iterations: 2500,
            convergence: 0.1,
        }
    }
}

impl ActiveContourSolver {
    pub fn from_config(config: &Config) -> Self {
        Self {
            w_line: config.w_line,
            w_edge: config.w_edge,
            max_px_move: config.max_px_move,
            max_iterations: config.max_iterations,
            convergence: config.convergence,
        }
    }

    /// External energy: weighted sum of intensity and Sobel edge magnitude
    fn external_energy(&self, image: &IntensityImage) -> IntensityImage {
        let (w_line, w_edge) = (self.w_line as f32, self.w_edge as f32);
        if w_edge == 0.0 {
            return map_colors(image, |p| Luma([w_line * p[0]]));
        }
        map_colors2(image, &sobel_magnitude(image), |p, e| {
            Luma([w_line * p[0] + w_edge * e[0]])
        })
    }
}

impl CurveSolver for ActiveContourSolver {
    fn refine(&self, image: &IntensityImage, initial: &Curve, weights: SnakeWeights) -> Result<Curve> {
        let n = initial.len();
        if n == 0 || image.width() == 0 || image.height() == 0 {
            return Ok(initial.clone());
        }

        let energy = self.external_energy(image);
        let (grad_row, grad_col) = central_gradients(&energy);

        let system = internal_energy_matrix(n, weights.alpha, weights.beta)
            + DMatrix::<f64>::identity(n, n) * weights.gamma;
        let inverse = system.try_inverse().ok_or_else(|| {
            ShoeContourError::Solver(format!(
                "snake system matrix is singular (alpha={}, beta={}, gamma={})",
                weights.alpha, weights.beta, weights.gamma
            ))
        })?;

        let mut rows = DVector::from_iterator(n, initial.points().iter().map(|p| p.0));
        let mut cols = DVector::from_iterator(n, initial.points().iter().map(|p| p.1));
        let mut history: VecDeque<(DVector<f64>, DVector<f64>)> = VecDeque::with_capacity(CONVERGENCE_ORDER);

        for iteration in 0..self.max_iterations {
            let f_row = DVector::from_fn(n, |i, _| bilinear(&grad_row, rows[i], cols[i]));
            let f_col = DVector::from_fn(n, |i, _| bilinear(&grad_col, rows[i], cols[i]));

            let next_rows = &inverse * (&rows * weights.gamma + f_row);
            let next_cols = &inverse * (&cols * weights.gamma + f_col);

            for i in 0..n {
                rows[i] += self.max_px_move * (next_rows[i] - rows[i]).tanh();
                cols[i] += self.max_px_move * (next_cols[i] - cols[i]).tanh();
            }

            // Compare against several past configurations; snakes can oscillate.
            let slot = iteration % (CONVERGENCE_ORDER + 1);
            if slot < CONVERGENCE_ORDER {
                if history.len() == CONVERGENCE_ORDER {
                    history.pop_front();
                }
                history.push_back((rows.clone(), cols.clone()));
            } else {
                let displacement = history
                    .iter()
                    .map(|(r, c)| {
                        (0..n)
                            .map(|i| (r[i] - rows[i]).abs() + (c[i] - cols[i]).abs())
                            .fold(0.0, f64::max)
                    })
                    .fold(f64::INFINITY, f64::min);
                if displacement < self.convergence {
                    debug!("Snake converged after {} iterations", iteration + 1);
                    return Ok(to_curve(&rows, &cols));
                }
            }
        }

        debug!(
            "Snake stopped at iteration budget ({}) without converging",
            self.max_iterations
        );
        Ok(to_curve(&rows, &cols))
    }
}

fn to_curve(rows: &DVector<f64>, cols: &DVector<f64>) -> Curve {
    Curve::new(rows.iter().copied().zip(cols.iter().copied()).collect())
}

/// `-alpha * D2 + beta * D4` for a periodic curve of `n` samples
pub fn internal_energy_matrix(n: usize, alpha: f64, beta: f64) -> DMatrix<f64> {
    let mut matrix = DMatrix::<f64>::zeros(n, n);
    // Second difference: [1, -2, 1]; fourth difference: [1, -4, 6, -4, 1]
    let stencil = [
        (-2isize, beta),
        (-1, -alpha - 4.0 * beta),
        (0, 2.0 * alpha + 6.0 * beta),
        (1, -alpha - 4.0 * beta),
        (2, beta),
    ];
    for i in 0..n {
        for &(offset, weight) in &stencil {
            let j = (i as isize + offset).rem_euclid(n as isize) as usize;
            matrix[(i, j)] += weight;
        }
    }
    matrix
}

/// Sobel edge magnitude `sqrt((h^2 + v^2) / 2)` with 1/4-normalized kernels
pub fn sobel_magnitude(image: &IntensityImage) -> IntensityImage {
    let horizontal = filter3x3::<_, f32, f32>(image, &HORIZONTAL_SOBEL.map(|k| k as f32 / 4.0));
    let vertical = filter3x3::<_, f32, f32>(image, &VERTICAL_SOBEL.map(|k| k as f32 / 4.0));
    map_colors2(&horizontal, &vertical, |h, v| {
        Luma([((h[0] * h[0] + v[0] * v[0]) / 2.0).sqrt()])
    })
}

/// Central-difference derivatives along rows and columns, replicating the border
fn central_gradients(field: &IntensityImage) -> (IntensityImage, IntensityImage) {
    #[rustfmt::skip]
    let d_row: [f32; 9] = [
        0.0, -0.5, 0.0,
        0.0,  0.0, 0.0,
        0.0,  0.5, 0.0];
    #[rustfmt::skip]
    let d_col: [f32; 9] = [
         0.0, 0.0, 0.0,
        -0.5, 0.0, 0.5,
         0.0, 0.0, 0.0];
    (
        filter3x3::<_, f32, f32>(field, &d_row),
        filter3x3::<_, f32, f32>(field, &d_col),
    )
}

/// Bilinear sample of `field` at a fractional (row, col), clamped to the grid
fn bilinear(field: &IntensityImage, row: f64, col: f64) -> f64 {
    let (w, h) = field.dimensions();
    let row = row.clamp(0.0, (h - 1) as f64);
    let col = col.clamp(0.0, (w - 1) as f64);

    let r0 = row.floor() as u32;
    let c0 = col.floor() as u32;
    let r1 = (r0 + 1).min(h - 1);
    let c1 = (c0 + 1).min(w - 1);
    let fr = row - r0 as f64;
    let fc = col - c0 as f64;

    let at = |r: u32, c: u32| field.get_pixel(c, r)[0] as f64;
    let top = at(r0, c0) * (1.0 - fc) + at(r0, c1) * fc;
    let bottom = at(r1, c0) * (1.0 - fc) + at(r1, c1) * fc;
    top * (1.0 - fr) + bottom * fr
}
