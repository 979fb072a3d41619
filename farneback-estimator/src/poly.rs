//! # Polynomial expansion
//!
//! Approximates the neighborhood of every pixel with a quadratic polynomial
//!
//! ```text
//! f(x, y) ~ c + bx * x + by * y + axx * x^2 + ayy * y^2 + axy * x * y
//! ```
//!
//! found by Gaussian weighted least squares. The weighted moments of the neighborhood are
//! computed with two separable passes and mapped onto the coefficients through the inverse of the
//! Gram matrix of the polynomial basis.

use crate::raster::Raster;
use nalgebra as na;
use ofvo::prelude::v1::*;
use rayon::prelude::*;

/// Number of channels produced by the expansion: `[bx, by, axx, ayy, axy]`.
pub const COEFFS: usize = 5;

/// Polynomial expansion with a fixed neighborhood.
#[derive(Clone, Debug)]
pub struct PolyExpansion {
    radius: usize,
    /// Applicability, `g`, `x * g` and `x^2 * g` for offsets `-radius..=radius`.
    g: Vec<f32>,
    xg: Vec<f32>,
    xxg: Vec<f32>,
    /// Inverse of the Gram matrix of `{1, x, y, x^2, y^2, xy}`.
    inv_gram: na::Matrix6<f64>,
}

impl PolyExpansion {
    /// Create a new expansion.
    ///
    /// # Arguments
    ///
    /// * `radius` - half-size of the neighborhood.
    /// * `sigma` - standard deviation of the Gaussian applicability.
    pub fn new(radius: usize, sigma: f32) -> Result<Self> {
        if radius == 0 || !(sigma > 0.0) {
            return Err(Error::invalid_config(format!(
                "invalid polynomial expansion (radius {radius}, sigma {sigma})"
            )));
        }

        let offsets = (-(radius as isize)..=radius as isize).map(|x| x as f32);

        let g = offsets
            .clone()
            .map(|x| (-(x * x) / (2.0 * sigma * sigma)).exp())
            .collect::<Vec<_>>();
        let sum: f32 = g.iter().sum();
        let g = g.into_iter().map(|v| v / sum).collect::<Vec<_>>();

        let xg = offsets.clone().zip(&g).map(|(x, g)| x * g).collect();
        let xxg = offsets.clone().zip(&g).map(|(x, g)| x * x * g).collect();

        let mut gram = na::Matrix6::<f64>::zeros();

        for (y, gy) in offsets.clone().zip(&g) {
            for (x, gx) in offsets.clone().zip(&g) {
                let (x, y) = (x as f64, y as f64);
                let basis = na::Vector6::new(1.0, x, y, x * x, y * y, x * y);
                gram += basis * basis.transpose() * (*gx as f64 * *gy as f64);
            }
        }

        let inv_gram = gram
            .cholesky()
            .ok_or_else(|| Error::invalid_config("polynomial basis is degenerate"))?
            .inverse();

        Ok(Self {
            radius,
            g,
            xg,
            xxg,
            inv_gram,
        })
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Expand a single channel raster into a [`COEFFS`] channel raster of coefficients.
    pub fn expand(&self, src: &Raster) -> Raster {
        let (width, height) = src.dim();
        let n = self.radius;
        let r = n as isize;

        let mut dst = Raster::new(width, height, COEFFS);

        dst.par_rows_mut().for_each(|(y, drow)| {
            // Vertical moments: sum g, sum y g and sum y^2 g for every column.
            let mut vert = vec![[0f64; 3]; width];

            for k in 0..=2 * n {
                let sy = (y as isize + k as isize - r).clamp(0, height as isize - 1) as usize;
                let (g, yg, yyg) = (self.g[k] as f64, self.xg[k] as f64, self.xxg[k] as f64);

                for (v, &s) in vert.iter_mut().zip(src.row(sy)) {
                    let s = s as f64;
                    v[0] += g * s;
                    v[1] += yg * s;
                    v[2] += yyg * s;
                }
            }

            // Horizontal moments.
            for (x, out) in drow.chunks_exact_mut(COEFFS).enumerate() {
                let mut m = na::Vector6::<f64>::zeros();

                for k in 0..=2 * n {
                    let sx = (x as isize + k as isize - r).clamp(0, width as isize - 1) as usize;
                    let v = vert[sx];
                    let (g, xg, xxg) = (self.g[k] as f64, self.xg[k] as f64, self.xxg[k] as f64);
                    let [v0, v1, v2] = v;

                    m[0] += g * v0;
                    m[1] += xg * v0;
                    m[2] += g * v1;
                    m[3] += xxg * v0;
                    m[4] += g * v2;
                    m[5] += xg * v1;
                }

                let c = self.inv_gram * m;

                for (o, c) in out.iter_mut().zip(c.iter().skip(1)) {
                    *o = *c as f32;
                }
            }
        });

        dst
    }
}
