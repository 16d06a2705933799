// src/refine.rs - Dual-stage snake refinement of a contact mask boundary

use log::debug;

use crate::config::Config;
use crate::contour::{contour_mask, fill_row_spans_with_margin};
use crate::errors::Result;
use crate::image_utils::{blurred_intensity, rasterize_curve};
use crate::mask::{Mask, PointSet};
use crate::snake::{Curve, CurveSolver, SnakeWeights};

/// Parameters of the refinement, fixed for a run
#[derive(Debug, Clone)]
pub struct RefinerSettings {
    pub height: usize,
    pub width: usize,
    pub blur_sigma: f32,
    pub first_pass: SnakeWeights,
    pub second_pass: SnakeWeights,
    pub curve_thickness: u32,
    pub margin_threshold: usize,
    pub max_margin: usize,
}

impl RefinerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            height: config.grid_height,
            width: config.grid_width,
            blur_sigma: config.blur_sigma,
            first_pass: SnakeWeights {
                alpha: config.alpha,
                beta: config.first_pass_beta,
                gamma: config.gamma,
            },
            second_pass: SnakeWeights {
                alpha: config.alpha,
                beta: config.second_pass_beta,
                gamma: config.gamma,
            },
            curve_thickness: config.curve_thickness,
            margin_threshold: config.margin_threshold,
            max_margin: config.max_margin,
        }
    }
}

/// Everything produced while refining one mask
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// Output of the rigid first pass
    pub first_curve: Curve,
    /// Output of the permissive second pass
    pub second_curve: Curve,
    /// Contour of the recombined mask, the second pass input
    pub second_pass_input: Mask,
    /// Raw raster of the second curve
    pub curve_raster: Mask,
    /// Final boundary: extreme-projection contour of `curve_raster`
    pub boundary_mask: Mask,
}

impl RefinementOutcome {
    pub fn boundary_points(&self) -> PointSet {
        self.boundary_mask.to_points()
    }
}

/// Drives two passes of a curve solver over a source mask.
///
/// The first, rigid pass only serves as a stabilizing prior: the source
/// pixels it leaves outside are recombined with its raster, and the contour
/// of that recombination is the target of the second, permissive pass.
pub struct CurveRefiner<'a, S: CurveSolver> {
    solver: &'a S,
    settings: RefinerSettings,
    initial: Curve,
}

impl<'a, S: CurveSolver> CurveRefiner<'a, S> {
    pub fn new(solver: &'a S, settings: RefinerSettings, initial: Curve) -> Self {
        Self {
            solver,
            settings,
            initial,
        }
    }

    pub fn from_config(solver: &'a S, config: &Config) -> Self {
        Self::new(
            solver,
            RefinerSettings::from_config(config),
            Curve::initial_from_config(config),
        )
    }

    pub fn settings(&self) -> &RefinerSettings {
        &self.settings
    }

    /// Run both passes and return every intermediate artifact
    pub fn refine(&self, source: &Mask) -> Result<RefinementOutcome> {
        let s = &self.settings;

        let first_input = blurred_intensity(source, s.blur_sigma);
        let first_curve = self.solver.refine(&first_input, &self.initial, s.first_pass)?;

        let second_pass_input = self.recombine(&first_curve, source);
        debug!(
            "First pass kept {} pixels for the second pass",
            second_pass_input.count()
        );

        let second_input = blurred_intensity(&second_pass_input, s.blur_sigma);
        let second_curve = self.solver.refine(&second_input, &self.initial, s.second_pass)?;

        let curve_raster = self.rasterize(&second_curve);
        let boundary_mask = contour_mask(&curve_raster);

        Ok(RefinementOutcome {
            first_curve,
            second_curve,
            second_pass_input,
            curve_raster,
            boundary_mask,
        })
    }

    /// Final boundary point set of `source`
    pub fn boundary(&self, source: &Mask) -> Result<PointSet> {
        Ok(self.refine(source)?.boundary_points())
    }

    /// Filled region enclosed by the second curve, with the thick-line margin stripped
    pub fn refine_region(&self, source: &Mask) -> Result<Mask> {
        let outcome = self.refine(source)?;
        Ok(self.strip_margin(&outcome.curve_raster))
    }

    /// Rasterize a curve on the run grid
    pub fn rasterize(&self, curve: &Curve) -> Mask {
        rasterize_curve(
            curve,
            self.settings.height,
            self.settings.width,
            self.settings.curve_thickness,
        )
    }

    fn strip_margin(&self, raster: &Mask) -> Mask {
        fill_row_spans_with_margin(raster, self.settings.margin_threshold, self.settings.max_margin)
    }

    /// Combine the first curve with the source pixels it left outside.
    ///
    /// `outside = !inside(curve) & source`, `combined = outside | raster(curve)`,
    /// and the contour of `combined` is returned as a mask.
    pub fn recombine(&self, first_curve: &Curve, source: &Mask) -> Mask {
        let raster = self.rasterize(first_curve);
        let first_curve_mask = !&self.strip_margin(&raster);
        let out_first = &first_curve_mask & source;
        let combined = &out_first | &raster;
        contour_mask(&combined)
    }
}
