//! # Dense motion field estimator based on polynomial expansion.
//!
//! This is an implementation of Gunnar Farnebäck's "Two-Frame Motion Estimation Based on
//! Polynomial Expansion". Neighborhoods of both frames are approximated by quadratic polynomials,
//! and the displacement between them is solved for in closed form, coarse-to-fine over an image
//! pyramid.

use log::*;
use ofvo::estimator::check_pair;
use ofvo::prelude::v1::*;

pub mod flow;
pub mod poly;
pub mod raster;

use flow::{solve, update_equations, EQUATIONS};
use poly::PolyExpansion;
use raster::{kernel_size, Raster};

/// Size of the kernel used for pre-smoothing input frames.
const PRESMOOTH_SIZE: usize = 5;

/// Tunable parameters of the [`FarnebackEstimator`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FarnebackParams {
    /// Scale between consecutive pyramid levels.
    pub pyr_scale: f32,
    /// Maximum number of pyramid levels, including the full resolution one.
    pub levels: usize,
    /// Levels smaller than this on either side are not used.
    pub min_level_size: usize,
    /// Size of the averaging window. Must be odd.
    pub window_size: usize,
    /// Refinement iterations on each level.
    pub iterations: usize,
    /// Half-size of the polynomial expansion neighborhood.
    pub poly_n: usize,
    /// Standard deviation of the polynomial expansion applicability.
    pub poly_sigma: f32,
    /// Standard deviation of the Gaussian applied to input frames. 0 disables it.
    pub presmooth_sigma: f32,
}

impl Default for FarnebackParams {
    fn default() -> Self {
        Self {
            pyr_scale: 0.5,
            levels: 3,
            min_level_size: 32,
            window_size: 15,
            iterations: 3,
            poly_n: 5,
            poly_sigma: 1.2,
            presmooth_sigma: 1.0,
        }
    }
}

impl FarnebackParams {
    pub fn pyr_scale(self, pyr_scale: f32) -> Self {
        Self { pyr_scale, ..self }
    }

    pub fn levels(self, levels: usize) -> Self {
        Self { levels, ..self }
    }

    pub fn min_level_size(self, min_level_size: usize) -> Self {
        Self {
            min_level_size,
            ..self
        }
    }

    pub fn window_size(self, window_size: usize) -> Self {
        Self {
            window_size,
            ..self
        }
    }

    pub fn iterations(self, iterations: usize) -> Self {
        Self { iterations, ..self }
    }

    pub fn poly(self, poly_n: usize, poly_sigma: f32) -> Self {
        Self {
            poly_n,
            poly_sigma,
            ..self
        }
    }

    pub fn presmooth_sigma(self, presmooth_sigma: f32) -> Self {
        Self {
            presmooth_sigma,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.pyr_scale > 0.0 && self.pyr_scale < 1.0) {
            return Err(Error::invalid_config("pyr_scale must be within (0; 1)"));
        }

        if self.levels == 0 || self.iterations == 0 {
            return Err(Error::invalid_config("levels and iterations must be positive"));
        }

        if self.window_size % 2 == 0 {
            return Err(Error::invalid_config(format!(
                "window_size must be odd, got {}",
                self.window_size
            )));
        }

        if !(self.presmooth_sigma.is_finite() && self.presmooth_sigma >= 0.0) {
            return Err(Error::invalid_config("presmooth_sigma must be non-negative"));
        }

        Ok(())
    }
}

/// Dense multi-scale motion field estimator.
///
/// The estimator holds no state between calls, only precomputed kernels.
#[derive(Clone, Debug)]
pub struct FarnebackEstimator {
    params: FarnebackParams,
    poly: PolyExpansion,
}

impl FarnebackEstimator {
    pub fn new(params: FarnebackParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            poly: PolyExpansion::new(params.poly_n, params.poly_sigma)?,
            params,
        })
    }

    pub fn params(&self) -> &FarnebackParams {
        &self.params
    }

    /// Number of pyramid levels usable for a frame of given size.
    pub fn level_count(&self, width: usize, height: usize) -> usize {
        let min = self.params.min_level_size as f32;
        let mut scale = 1.0;
        let mut levels = 1;

        while levels < self.params.levels {
            scale *= self.params.pyr_scale;
            if (width as f32) * scale < min || (height as f32) * scale < min {
                break;
            }
            levels += 1;
        }

        levels
    }

    fn presmooth(&self, frame: &Frame) -> Raster {
        let raster = Raster::from_frame(frame);

        if self.params.presmooth_sigma > 0.0 {
            raster.gaussian_blur(self.params.presmooth_sigma, PRESMOOTH_SIZE)
        } else {
            raster
        }
    }

    /// Compute the flow between two full resolution rasters.
    fn compute(&self, prev: &Raster, curr: &Raster) -> Raster {
        let (width, height) = prev.dim();
        let levels = self.level_count(width, height);
        let pyr_scale = self.params.pyr_scale;

        let mut flow: Option<Raster> = None;

        for k in (0..levels).rev() {
            let scale = pyr_scale.powi(k as i32);
            let lw = ((width as f32 * scale).round() as usize).max(1);
            let lh = ((height as f32 * scale).round() as usize).max(1);

            let level = |img: &Raster| {
                if k == 0 {
                    img.resize(lw, lh)
                } else {
                    let sigma = (1.0 / scale - 1.0) * 0.5;
                    img.gaussian_blur(sigma, kernel_size(sigma)).resize(lw, lh)
                }
            };

            let r0 = self.poly.expand(&level(prev));
            let r1 = self.poly.expand(&level(curr));

            let mut level_flow = match flow.take() {
                Some(coarse) => {
                    let mut upscaled = coarse.resize(lw, lh);
                    upscaled.scale(1.0 / pyr_scale);
                    upscaled
                }
                None => Raster::new(lw, lh, 2),
            };

            let mut eqs = Raster::new(lw, lh, EQUATIONS);
            update_equations(&r0, &r1, &level_flow, &mut eqs);

            for i in 0..self.params.iterations {
                solve(&eqs, self.params.window_size, &mut level_flow);
                if i + 1 < self.params.iterations {
                    update_equations(&r0, &r1, &level_flow, &mut eqs);
                }
            }

            trace!("level {k} ({lw}x{lh}) done");

            flow = Some(level_flow);
        }

        flow.unwrap_or_else(|| Raster::new(width, height, 2))
    }
}

impl MotionFieldEstimator for FarnebackEstimator {
    fn estimate(&self, previous: &Frame, current: &Frame) -> Result<MotionField> {
        check_pair(previous, current)?;

        let (width, height) = current.dim();

        let flow = self.compute(&self.presmooth(previous), &self.presmooth(current));

        MotionField::from_interleaved(width, height, flow.as_slice())
    }
}
