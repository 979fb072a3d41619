use assert_approx_eq::assert_approx_eq;
use nalgebra as na;
use ofvo::prelude::v1::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Finds the single integer shift that best explains the frame pair, and reports it for every
/// pixel.
struct GlobalShift {
    range: isize,
}

impl GlobalShift {
    fn cost(previous: &Frame, current: &Frame, dx: isize, dy: isize) -> f64 {
        let (w, h) = current.dim();
        let margin = 8;
        let mut cost = 0.0;

        for y in margin..h - margin {
            for x in margin..w - margin {
                let px = (x as isize - dx) as usize;
                let py = (y as isize - dy) as usize;
                let d = current.get(x, y) as f64 - previous.get(px, py) as f64;
                cost += d * d;
            }
        }

        cost
    }
}

impl MotionFieldEstimator for GlobalShift {
    fn estimate(&self, previous: &Frame, current: &Frame) -> Result<MotionField> {
        ofvo::estimator::check_pair(previous, current)?;

        let mut best = (f64::INFINITY, 0, 0);

        for dy in -self.range..=self.range {
            for dx in -self.range..=self.range {
                let cost = Self::cost(previous, current, dx, dy);
                if cost < best.0 {
                    best = (cost, dx, dy);
                }
            }
        }

        let (w, h) = current.dim();
        let mut field = MotionField::zeros(w, h);
        let motion = na::Vector2::new(best.1 as f32, best.2 as f32);

        for y in 0..h {
            for x in 0..w {
                field.set_motion(x, y, motion);
            }
        }

        Ok(field)
    }
}

/// Random texture that can be looked at through a moving window.
struct Ground {
    width: usize,
    data: Vec<u8>,
}

impl Ground {
    fn new(width: usize, height: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(1234);
        Self {
            width,
            data: (0..width * height).map(|_| rng.gen()).collect(),
        }
    }

    fn view(&self, x0: usize, y0: usize, w: usize, h: usize) -> Frame {
        // Camera moving by +x sees the ground move by -x.
        Frame::from_fn(w, h, |x, y| self.data[(y0 + y) * self.width + x0 + x]).unwrap()
    }
}

fn estimator() -> VelocityEstimator<GlobalShift> {
    VelocityEstimator::new(GlobalShift { range: 3 }, PipelineConfig::default()).unwrap()
}

#[test]
fn translation_to_velocity() {
    let ground = Ground::new(200, 200);
    let camera = CameraGeometry::from_degrees(60.0, 60.0).with_resolution(48, 48);
    let mut ve = estimator();

    // Ground content moves by +2 pixels in x every frame.
    let views = [(60, 50), (58, 50), (56, 50), (54, 50)];

    let estimates = views
        .iter()
        .map(|&(x, y)| {
            ve.step(ground.view(x, y, 48, 48), None, 8.0, 0.1, &camera)
                .unwrap()
        })
        .collect::<Vec<_>>();

    assert_eq!(estimates[0].status, EstimateStatus::Bootstrap);

    let angle = 2.0 * 60f32.to_radians() / 48.0;
    let expected = 8.0 * angle.tan() / 0.1;

    for est in &estimates[1..] {
        assert_eq!(est.status, EstimateStatus::Measured);
        assert_approx_eq!(est.vx, expected, 1e-4);
        assert_approx_eq!(est.vy, 0.0, 1e-6);
    }

    assert_eq!(ve.motion_at(0, 0), Some(na::Vector2::new(2.0, 0.0)));
}

#[test]
fn hovering_decays() {
    let ground = Ground::new(100, 100);
    let camera = CameraGeometry::from_degrees(60.0, 60.0);
    let mut ve = estimator();

    ve.step(ground.view(20, 20, 40, 40), None, 5.0, 0.1, &camera)
        .unwrap();
    let moving = ve
        .step(ground.view(20, 19, 40, 40), None, 5.0, 0.1, &camera)
        .unwrap();
    assert_eq!(moving.status, EstimateStatus::Measured);
    assert!(moving.vy > 0.0);

    let mut last = moving.speed;

    for _ in 0..3 {
        let est = ve
            .step(ground.view(20, 19, 40, 40), None, 5.0, 0.1, &camera)
            .unwrap();
        assert_eq!(est.status, EstimateStatus::Damped);
        assert!(est.speed < last);
        assert_approx_eq!(est.speed, last * 0.5, 1e-3);
        last = est.speed;
    }
}

#[test]
fn rotation_is_removed() {
    let ground = Ground::new(100, 100);
    let camera = CameraGeometry::from_degrees(60.0, 60.0);
    let mut ve = estimator();

    // 2 pixels of apparent motion on a 40 pixel wide frame over 0.1 s.
    let yaw = 2.0 / (20.0 * 0.1);
    let gyro = Some(GyroSample::new(yaw, 0.0, 0.0));

    ve.step(ground.view(30, 30, 40, 40), gyro, 5.0, 0.1, &camera)
        .unwrap();
    let est = ve
        .step(ground.view(28, 30, 40, 40), gyro, 5.0, 0.1, &camera)
        .unwrap();

    assert_eq!(est.status, EstimateStatus::Measured);
    assert_approx_eq!(est.vx, 0.0, 1e-4);
    assert_approx_eq!(est.vy, 0.0, 1e-4);
}

#[test]
fn rejected_tick_keeps_reference() {
    let ground = Ground::new(100, 100);
    let camera = CameraGeometry::from_degrees(60.0, 60.0);
    let mut ve = estimator();

    ve.step(ground.view(30, 30, 40, 40), None, 5.0, 0.1, &camera)
        .unwrap();

    let rejected = ve
        .step(ground.view(29, 30, 40, 40), None, f32::NAN, 0.1, &camera)
        .unwrap();
    assert_eq!(
        rejected,
        VelocityEstimate::zero(EstimateStatus::InvalidInput(InvalidInput::Altitude))
    );

    // Compared against the first frame, not the rejected one.
    ve.step(ground.view(28, 30, 40, 40), None, 5.0, 0.1, &camera)
        .unwrap();
    assert_eq!(ve.motion_at(5, 5), Some(na::Vector2::new(2.0, 0.0)));
}
