//! Displacement estimation from a pair of polynomial expansions.

use crate::poly::COEFFS;
use crate::raster::Raster;
use rayon::prelude::*;

/// Confidence of the five outermost rows and columns.
const BORDER: [f32; 5] = [0.14, 0.14, 0.4472, 0.4472, 0.4472];

/// Channels of the normal equation raster: `[g11, g12, g22, h1, h2]`.
pub const EQUATIONS: usize = 5;

/// Regularizer added to the determinant of every 2x2 system.
const DET_EPS: f64 = 1e-3;

fn border_weight(i: usize, len: usize) -> f32 {
    let dist = i.min(len - 1 - i);
    BORDER.get(dist).copied().unwrap_or(1.0)
}

/// Build the per-pixel normal equations `A^T A d = A^T db` for the current flow estimate.
///
/// # Arguments
///
/// * `r0` - expansion of the previous frame.
/// * `r1` - expansion of the current frame.
/// * `flow` - current 2 channel flow estimate.
/// * `eqs` - output raster with [`EQUATIONS`] channels.
pub fn update_equations(r0: &Raster, r1: &Raster, flow: &Raster, eqs: &mut Raster) {
    let (width, height) = r0.dim();

    eqs.par_rows_mut().for_each(|(y, row)| {
        let wy = border_weight(y, height);
        let mut c1 = [0f32; COEFFS];

        for (x, out) in row.chunks_exact_mut(EQUATIONS).enumerate() {
            let c0 = r0.pixel(x, y);
            let d = flow.pixel(x, y);
            let (dx, dy) = (d[0], d[1]);

            // Content that left the frame carries no new information.
            if !r1.sample(x as f32 + dx, y as f32 + dy, &mut c1) {
                c1.copy_from_slice(c0);
            }

            let mut axx = (c0[2] + c1[2]) * 0.5;
            let mut ayy = (c0[3] + c1[3]) * 0.5;
            let mut axy = (c0[4] + c1[4]) * 0.25;

            let mut bx = (c0[0] - c1[0]) * 0.5 + axx * dx + axy * dy;
            let mut by = (c0[1] - c1[1]) * 0.5 + axy * dx + ayy * dy;

            let w = wy * border_weight(x, width);

            if w < 1.0 {
                axx *= w;
                ayy *= w;
                axy *= w;
                bx *= w;
                by *= w;
            }

            out[0] = axx * axx + axy * axy;
            out[1] = axy * (axx + ayy);
            out[2] = ayy * ayy + axy * axy;
            out[3] = axx * bx + axy * by;
            out[4] = axy * bx + ayy * by;
        }
    });
}

/// Average the equations over a square window and solve them for the displacement.
pub fn solve(eqs: &Raster, window: usize, flow: &mut Raster) {
    let blurred = eqs.box_blur(window);

    flow.par_rows_mut().for_each(|(y, row)| {
        let src = blurred.row(y);

        for (d, g) in row.chunks_exact_mut(2).zip(src.chunks_exact(EQUATIONS)) {
            let (g11, g12, g22) = (g[0] as f64, g[1] as f64, g[2] as f64);
            let (h1, h2) = (g[3] as f64, g[4] as f64);

            let idet = 1.0 / (g11 * g22 - g12 * g12 + DET_EPS);

            d[0] = ((g22 * h1 - g12 * h2) * idet) as f32;
            d[1] = ((g11 * h2 - g12 * h1) * idet) as f32;
        }
    });
}
