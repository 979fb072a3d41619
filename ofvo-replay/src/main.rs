//! Replay recorded downward camera frames and telemetry through the velocity estimation pipeline.

use anyhow::{anyhow, Context, Result};
use clap::*;
use farneback_estimator::FarnebackEstimator;
use log::*;
use ofvo::prelude::v1::{Frame, VelocityEstimate, VelocityEstimator};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

mod config;
mod flo;
mod telemetry;

use config::ReplayConfig;
use telemetry::Telemetry;

/// Everything a replay run needs.
#[derive(Debug, Clone)]
struct Options {
    frames: PathBuf,
    telemetry: PathBuf,
    config: ReplayConfig,
    output: Option<PathBuf>,
    flow_out: Option<PathBuf>,
}

/// Single line of the output CSV.
#[derive(Serialize, Debug, Clone, PartialEq)]
struct EstimateRow {
    frame: usize,
    vx: f32,
    vy: f32,
    speed: f32,
    dir_x: Option<f32>,
    dir_y: Option<f32>,
    status: String,
}

impl EstimateRow {
    fn new(frame: usize, estimate: &VelocityEstimate) -> Self {
        let dir = estimate.direction();

        Self {
            frame,
            vx: estimate.vx,
            vy: estimate.vy,
            speed: estimate.speed,
            dir_x: dir.map(|d| d.x),
            dir_y: dir.map(|d| d.y),
            status: estimate.status.to_string(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("ofvo-replay")
        .version(crate_version!())
        .about("Estimate ground velocity from recorded downward camera frames")
        .arg(
            Arg::new("frames")
                .long("frames")
                .short('f')
                .takes_value(true)
                .required(true)
                .help("directory with one image file per frame"),
        )
        .arg(
            Arg::new("telemetry")
                .long("telemetry")
                .short('t')
                .takes_value(true)
                .required(true)
                .help("CSV with dt,altitude,yaw_rate,pitch_rate,roll_rate rows"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .help("JSON configuration file"),
        )
        .arg(
            Arg::new("hfov")
                .long("hfov")
                .takes_value(true)
                .help("horizontal field-of-view in degrees"),
        )
        .arg(
            Arg::new("vfov")
                .long("vfov")
                .takes_value(true)
                .help("vertical field-of-view in degrees"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .takes_value(true)
                .help("output CSV, standard output if omitted"),
        )
        .arg(
            Arg::new("flow-out")
                .long("flow-out")
                .takes_value(true)
                .help("directory to write a .flo file for every frame into"),
        )
        .get_matches();

    let config = match matches.value_of("config") {
        Some(path) => ReplayConfig::load(path)?,
        None => ReplayConfig::default(),
    };

    let hfov = matches
        .value_of("hfov")
        .map(str::parse::<f32>)
        .transpose()
        .context("invalid --hfov")?;
    let vfov = matches
        .value_of("vfov")
        .map(str::parse::<f32>)
        .transpose()
        .context("invalid --vfov")?;

    let options = Options {
        frames: matches
            .value_of("frames")
            .ok_or_else(|| anyhow!("missing --frames"))?
            .into(),
        telemetry: matches
            .value_of("telemetry")
            .ok_or_else(|| anyhow!("missing --telemetry"))?
            .into(),
        config: config.fov_degrees(hfov, vfov),
        output: matches.value_of("output").map(<_>::into),
        flow_out: matches.value_of("flow-out").map(<_>::into),
    };

    let ticks = run(&options)?;

    info!("processed {ticks} frames");

    Ok(())
}

/// Image files of a directory, sorted by name.
fn frame_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("unable to read {}", dir.display()))?
        .map(|e| Ok(e?.path()))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .filter(|p| p.is_file() && image::ImageFormat::from_path(p).is_ok())
        .collect::<Vec<_>>();

    paths.sort();

    Ok(paths)
}

fn load_frame(path: &Path) -> Result<Frame> {
    let img = image::open(path)
        .with_context(|| format!("unable to decode {}", path.display()))?
        .to_luma8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(width as usize, height as usize, img.into_raw())?)
}

/// Replay all frames, returning the number of processed ticks.
fn run(options: &Options) -> Result<usize> {
    let frames = frame_paths(&options.frames)?;
    let telemetry = Telemetry::from_csv(
        std::fs::File::open(&options.telemetry)
            .with_context(|| format!("unable to open {}", options.telemetry.display()))?,
    )?;

    if frames.len() != telemetry.len() {
        warn!(
            "{} frames, but {} telemetry rows, replaying the shorter",
            frames.len(),
            telemetry.len()
        );
    }

    let config = &options.config;
    let estimator = FarnebackEstimator::new(config.estimator)?;
    let mut velocity = VelocityEstimator::new(estimator, config.pipeline)?;

    if let Some(dir) = &options.flow_out {
        std::fs::create_dir_all(dir)?;
    }

    let output: Box<dyn Write> = match &options.output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    };

    let mut writer = csv::Writer::from_writer(output);

    let mut ticks = 0;

    for (i, (path, row)) in frames.iter().zip(&telemetry).enumerate() {
        let frame = load_frame(path)?;

        let estimate = velocity
            .step(frame, row.gyro(), row.altitude, row.dt, &config.camera)
            .with_context(|| format!("frame {} ({})", i, path.display()))?;

        debug!("frame {i}: {estimate:?}");

        writer.serialize(EstimateRow::new(i, &estimate))?;

        if let (Some(dir), Some(field)) = (&options.flow_out, velocity.last_field()) {
            flo::save(dir.join(format!("{i:06}.flo")), field)?;
        }

        ticks += 1;
    }

    writer.flush()?;

    Ok(ticks)
}
