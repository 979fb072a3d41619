use farneback_estimator::{FarnebackEstimator, FarnebackParams};
use nalgebra as na;
use ofvo::prelude::v1::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Smooth random texture built from a few plane waves.
struct Texture {
    waves: Vec<(f32, f32, f32)>,
}

impl Texture {
    fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let waves = (0..6)
            .map(|_| {
                let wavelength = rng.gen_range(16.0..40.0);
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                let k = std::f32::consts::TAU / wavelength;
                (k * angle.cos(), k * angle.sin(), rng.gen_range(0.0..std::f32::consts::TAU))
            })
            .collect();

        Self { waves }
    }

    fn value(&self, x: f32, y: f32) -> u8 {
        let v = self
            .waves
            .iter()
            .map(|(kx, ky, phase)| 15.0 * (kx * x + ky * y + phase).sin())
            .sum::<f32>();
        (128.0 + v).round().clamp(0.0, 255.0) as u8
    }

    /// Frame of the texture, moved by `(dx, dy)` pixels.
    fn frame(&self, width: usize, height: usize, dx: f32, dy: f32) -> Frame {
        Frame::from_fn(width, height, |x, y| {
            self.value(x as f32 - dx, y as f32 - dy)
        })
        .unwrap()
    }
}

fn center_mean(field: &MotionField, radius: usize) -> na::Vector2<f32> {
    let (w, h) = field.dim();
    let (cx, cy) = (w / 2, h / 2);
    let mut sum = na::Vector2::zeros();
    let mut count = 0.0;

    for y in cy - radius..cy + radius {
        for x in cx - radius..cx + radius {
            sum += field.get_motion(x, y);
            count += 1.0;
        }
    }

    sum / count
}

#[test]
fn recovers_integer_shift() {
    let texture = Texture::new(7);
    let estimator = FarnebackEstimator::new(FarnebackParams::default()).unwrap();

    for (dx, dy) in [(2.0, 1.0), (-1.0, 0.0), (0.0, -3.0)] {
        let prev = texture.frame(128, 128, 0.0, 0.0);
        let curr = texture.frame(128, 128, dx, dy);

        let field = estimator.estimate(&prev, &curr).unwrap();
        assert_eq!(field.dim(), (128, 128));

        let mean = center_mean(&field, 16);
        assert!(
            (mean.x - dx).abs() < 0.3 && (mean.y - dy).abs() < 0.3,
            "expected ({dx}, {dy}), got {mean:?}"
        );
    }
}

#[test]
fn identical_frames_have_no_motion() {
    let texture = Texture::new(42);
    let estimator = FarnebackEstimator::new(FarnebackParams::default()).unwrap();
    let frame = texture.frame(96, 64, 0.0, 0.0);

    let field = estimator.estimate(&frame, &frame).unwrap();

    assert_eq!(field, MotionField::zeros(96, 64));
}

#[test]
fn field_matches_frame_dimensions() {
    let texture = Texture::new(1);
    let estimator = FarnebackEstimator::new(FarnebackParams::default()).unwrap();

    for (w, h) in [(40, 24), (65, 33), (128, 72)] {
        let prev = texture.frame(w, h, 0.0, 0.0);
        let curr = texture.frame(w, h, 1.0, 1.0);
        let field = estimator.estimate(&prev, &curr).unwrap();
        assert_eq!(field.dim(), (w, h));
        assert!(field.as_slice().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn dimension_mismatch() {
    let texture = Texture::new(3);
    let estimator = FarnebackEstimator::new(FarnebackParams::default()).unwrap();

    let res = estimator.estimate(
        &texture.frame(64, 48, 0.0, 0.0),
        &texture.frame(48, 64, 0.0, 0.0),
    );

    assert_eq!(res, Err(Error::dimension_mismatch((64, 48), (48, 64))));
}

#[test]
fn deterministic() {
    let texture = Texture::new(9);
    let estimator = FarnebackEstimator::new(FarnebackParams::default()).unwrap();
    let prev = texture.frame(80, 80, 0.0, 0.0);
    let curr = texture.frame(80, 80, 1.5, -0.5);

    let a = estimator.estimate(&prev, &curr).unwrap();
    let b = estimator.estimate(&prev, &curr).unwrap();

    assert_eq!(a, b);
}
