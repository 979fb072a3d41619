//! Multi-channel floating point rasters and the filters the estimator needs on them.

use ofvo::prelude::v1::Frame;
use rayon::prelude::*;

/// Row-major `f32` image with interleaved channels.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f32>,
}

impl Raster {
    /// Create a zero-filled raster.
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0.0; width * height * channels],
        }
    }

    /// Single channel raster holding the intensities of a frame.
    pub fn from_frame(frame: &Frame) -> Self {
        let (width, height) = frame.dim();
        Self {
            width,
            height,
            channels: 1,
            data: frame.as_slice().iter().map(|&v| v as f32).collect(),
        }
    }

    /// Single channel raster with values produced by `f(x, y)`.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();

        Self {
            width,
            height,
            channels: 1,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    fn stride(&self) -> usize {
        self.width * self.channels
    }

    pub fn row(&self, y: usize) -> &[f32] {
        let stride = self.stride();
        &self.data[y * stride..(y + 1) * stride]
    }

    /// Channels of a single pixel.
    pub fn pixel(&self, x: usize, y: usize) -> &[f32] {
        let off = (y * self.width + x) * self.channels;
        &self.data[off..off + self.channels]
    }

    /// Mutable rows, processed in parallel.
    pub fn par_rows_mut(
        &mut self,
    ) -> impl IndexedParallelIterator<Item = (usize, &mut [f32])> + '_ {
        let stride = self.stride();
        self.data.par_chunks_mut(stride).enumerate()
    }

    /// Multiply every value by `factor`.
    pub fn scale(&mut self, factor: f32) {
        self.data.par_iter_mut().for_each(|v| *v *= factor);
    }

    /// Bilinearly sample all channels at a sub-pixel position.
    ///
    /// Returns `false` and leaves `out` untouched if the position lies outside of the raster.
    pub fn sample(&self, x: f32, y: f32, out: &mut [f32]) -> bool {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;

        if !(x >= 0.0 && y >= 0.0 && x <= max_x && y <= max_y) {
            return false;
        }

        let (x0, y0) = (x.floor() as usize, y.floor() as usize);
        let (fx, fy) = (x - x0 as f32, y - y0 as f32);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let a00 = (1.0 - fx) * (1.0 - fy);
        let a01 = fx * (1.0 - fy);
        let a10 = (1.0 - fx) * fy;
        let a11 = fx * fy;

        let p00 = self.pixel(x0, y0);
        let p01 = self.pixel(x1, y0);
        let p10 = self.pixel(x0, y1);
        let p11 = self.pixel(x1, y1);

        for (c, o) in out.iter_mut().enumerate().take(self.channels) {
            *o = a00 * p00[c] + a01 * p01[c] + a10 * p10[c] + a11 * p11[c];
        }

        true
    }

    /// Bilinear resize with pixel centers aligned, as done when building image pyramids.
    pub fn resize(&self, width: usize, height: usize) -> Self {
        if (width, height) == self.dim() {
            return self.clone();
        }

        let rx = self.width as f32 / width as f32;
        let ry = self.height as f32 / height as f32;
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let channels = self.channels;

        let mut out = Self::new(width, height, channels);

        out.par_rows_mut().for_each(|(y, row)| {
            let sy = ((y as f32 + 0.5) * ry - 0.5).clamp(0.0, max_y);
            for (x, px) in row.chunks_exact_mut(channels).enumerate() {
                let sx = ((x as f32 + 0.5) * rx - 0.5).clamp(0.0, max_x);
                self.sample(sx, sy, px);
            }
        });

        out
    }

    /// Convolve every channel with a separable kernel, replicating border pixels.
    pub fn convolve(&self, kernel: &[f32]) -> Self {
        self.convolve_cols(kernel).convolve_rows(kernel)
    }

    /// Vertical pass.
    fn convolve_cols(&self, kernel: &[f32]) -> Self {
        let half = (kernel.len() / 2) as isize;
        let mut out = Self::new(self.width, self.height, self.channels);

        out.par_rows_mut().for_each(|(y, row)| {
            for (k, &kv) in kernel.iter().enumerate() {
                let sy = clamp_index(y as isize + k as isize - half, self.height);
                for (d, s) in row.iter_mut().zip(self.row(sy)) {
                    *d += kv * s;
                }
            }
        });

        out
    }

    /// Horizontal pass.
    fn convolve_rows(&self, kernel: &[f32]) -> Self {
        let half = (kernel.len() / 2) as isize;
        let channels = self.channels;
        let mut out = Self::new(self.width, self.height, channels);

        out.par_rows_mut().for_each(|(y, row)| {
            let src = self.row(y);
            for (x, px) in row.chunks_exact_mut(channels).enumerate() {
                for (k, &kv) in kernel.iter().enumerate() {
                    let sx = clamp_index(x as isize + k as isize - half, self.width);
                    let sp = &src[sx * channels..(sx + 1) * channels];
                    for (d, s) in px.iter_mut().zip(sp) {
                        *d += kv * s;
                    }
                }
            }
        });

        out
    }

    /// Gaussian blur with the given sigma and odd kernel size.
    pub fn gaussian_blur(&self, sigma: f32, ksize: usize) -> Self {
        self.convolve(&gaussian_kernel(sigma, ksize))
    }

    /// Normalized box filter of given (odd) size.
    pub fn box_blur(&self, size: usize) -> Self {
        self.convolve(&vec![1.0 / size as f32; size])
    }
}

/// Replicate border addressing.
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Normalized 1D Gaussian kernel of size `ksize`.
pub fn gaussian_kernel(sigma: f32, ksize: usize) -> Vec<f32> {
    let half = (ksize / 2) as f32;
    let denom = 2.0 * sigma * sigma;

    let kernel = (0..ksize)
        .map(|i| {
            let x = i as f32 - half;
            (-(x * x) / denom).exp()
        })
        .collect::<Vec<_>>();

    let sum: f32 = kernel.iter().sum();
    kernel.into_iter().map(|v| v / sum).collect()
}

/// Kernel size matching a sigma, `round(5 sigma)` made odd and at least 3.
pub fn kernel_size(sigma: f32) -> usize {
    (((sigma * 5.0).round() as usize) | 1).max(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn ramp(width: usize, height: usize) -> Raster {
        let frame = Frame::from_fn(width, height, |x, y| (x * 10 + y) as u8).unwrap();
        Raster::from_frame(&frame)
    }

    #[test]
    fn kernel_is_normalized() {
        let k = gaussian_kernel(1.2, 7);
        assert_eq!(k.len(), 7);
        assert_approx_eq!(k.iter().sum::<f32>(), 1.0, 1e-6);
        assert_eq!(k[0], k[6]);
        assert!(k[3] > k[2] && k[2] > k[1]);
    }

    #[test]
    fn kernel_sizes() {
        assert_eq!(kernel_size(0.0), 3);
        assert_eq!(kernel_size(0.5), 3);
        assert_eq!(kernel_size(1.5), 9);
        assert_eq!(kernel_size(1.0), 5);
    }

    #[test]
    fn blur_keeps_constant() {
        let raster = Raster::from_frame(&Frame::new(9, 7, vec![77; 63]).unwrap());
        let blurred = raster.gaussian_blur(1.0, 5);
        for v in blurred.as_slice() {
            assert_approx_eq!(*v, 77.0, 1e-4);
        }
    }

    #[test]
    fn blur_keeps_linear_ramp_inside() {
        let raster = ramp(20, 20);
        let blurred = raster.box_blur(3);
        for y in 1..19 {
            for x in 1..19 {
                assert_approx_eq!(blurred.pixel(x, y)[0], raster.pixel(x, y)[0], 1e-3);
            }
        }
    }

    #[test]
    fn sample_exact_and_between() {
        let raster = ramp(8, 8);
        let mut out = [0.0];

        assert!(raster.sample(3.0, 2.0, &mut out));
        assert_eq!(out[0], 32.0);

        assert!(raster.sample(3.5, 2.5, &mut out));
        assert_approx_eq!(out[0], 37.5, 1e-5);

        assert!(raster.sample(7.0, 7.0, &mut out));
        assert_eq!(out[0], 77.0);

        assert!(!raster.sample(7.5, 0.0, &mut out));
        assert!(!raster.sample(0.0, -0.1, &mut out));
    }

    #[test]
    fn resize_halves() {
        let raster = ramp(16, 8);
        let half = raster.resize(8, 4);
        assert_eq!(half.dim(), (8, 4));
        // Destination pixel 1 covers source pixels 2 and 3.
        assert_approx_eq!(half.pixel(1, 1)[0], 25.0 + 2.5, 1e-4);
        assert_eq!(raster.resize(16, 8), raster);
    }

    #[test]
    fn multi_channel_convolution() {
        let mut raster = Raster::new(5, 5, 2);
        raster.par_rows_mut().for_each(|(_, row)| {
            for px in row.chunks_exact_mut(2) {
                px[0] = 1.0;
                px[1] = -2.0;
            }
        });
        let blurred = raster.box_blur(3);
        assert_eq!(blurred.channels(), 2);
        for px in blurred.as_slice().chunks_exact(2) {
            assert_approx_eq!(px[0], 1.0, 1e-6);
            assert_approx_eq!(px[1], -2.0, 1e-6);
        }
    }
}
