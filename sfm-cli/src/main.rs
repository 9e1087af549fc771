mod dataset;

use dataset::{load_frame, until_error, Dataset};
use log::*;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use sfm::{export_ply, CancelToken, Reconstruction, SfmSettings, TwoViewPipeline};
use sfm_core::nalgebra::Point2;
use sfm_features::Matcher;
use sfm_pinhole::CameraIntrinsics;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};
use structopt::StructOpt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown dataset {0:?}, expected \"malaga\" or \"colmap\"")]
    UnknownDataset(String),
    #[error("principal point needs exactly two values, got {0}")]
    PrincipalPoint(usize),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("feature error: {0}")]
    Features(#[from] sfm_features::Error),
}

#[derive(StructOpt, Clone)]
#[structopt(
    name = "sfm",
    about = "Reconstructs a colored point cloud and camera trajectory from consecutive image pairs"
)]
struct Opt {
    /// The directory holding the image sequence
    #[structopt(long, parse(from_os_str))]
    image_dir: PathBuf,
    /// The naming convention of the images: "malaga" or "colmap"
    #[structopt(long, default_value = "colmap")]
    dataset: Dataset,
    /// Output PLY file to deposit the point cloud and trajectory
    #[structopt(
        short,
        long,
        parse(from_os_str),
        default_value = "colored_point_cloud_with_trajectory.ply"
    )]
    output: PathBuf,
    /// The file where settings are specified.
    ///
    /// This is in the JSON format of `sfm::SfmSettings`. Missing fields take their defaults.
    #[structopt(short, long, parse(from_os_str))]
    settings: Option<PathBuf>,
    /// The focal length in pixels
    #[structopt(long, default_value = "800.0")]
    focal_length: f64,
    /// The principal point in pixels
    #[structopt(long, number_of_values = 2, value_names = &["CX", "CY"])]
    principal_point: Vec<f64>,
    /// The Harris sensitivity constant
    #[structopt(long)]
    k_harris: Option<f64>,
    /// The Harris response a corner must exceed
    #[structopt(long)]
    threshold_harris: Option<f64>,
    /// The number of RANSAC samples per pair
    #[structopt(long)]
    ransac_iterations: Option<usize>,
    /// The epipolar residual under which a match is an inlier
    #[structopt(long)]
    ransac_threshold: Option<f64>,
    /// The seed of the RANSAC random number generator
    #[structopt(long, default_value = "0")]
    seed: u64,
    /// Require matches to be mutual nearest neighbors
    #[structopt(long)]
    mutual: bool,
}

impl Opt {
    fn intrinsics(&self) -> Result<CameraIntrinsics, Error> {
        let principal_point = match self.principal_point[..] {
            [] => Point2::new(512.0, 384.0),
            [cx, cy] => Point2::new(cx, cy),
            _ => return Err(Error::PrincipalPoint(self.principal_point.len())),
        };
        Ok(CameraIntrinsics::identity()
            .focal(self.focal_length)
            .principal_point(principal_point))
    }

    fn settings(&self) -> Result<SfmSettings, Error> {
        let mut settings = match &self.settings {
            Some(path) => {
                info!("loading settings from {}", path.display());
                serde_json::from_reader(File::open(path)?)?
            }
            None => {
                info!("using default settings");
                SfmSettings::default()
            }
        };
        if let Some(k) = self.k_harris {
            settings.harris_k = k;
        }
        if let Some(threshold) = self.threshold_harris {
            settings.harris_threshold = threshold;
        }
        if let Some(iterations) = self.ransac_iterations {
            settings.ransac_iterations = iterations;
        }
        if let Some(threshold) = self.ransac_threshold {
            settings.ransac_threshold = threshold;
        }
        if self.mutual {
            settings.matching = Matcher::mutual();
        }
        Ok(settings)
    }
}

fn run(opt: Opt) -> Result<(), Error> {
    let intrinsics = opt.intrinsics()?;
    let settings = opt.settings()?;
    let pipeline = TwoViewPipeline::new(settings, intrinsics);

    let paths = opt.dataset.paths(&opt.image_dir)?;
    info!(
        "found {} images in {}",
        paths.len(),
        opt.image_dir.display()
    );
    // Frames are decoded one at a time as the sequence advances.
    let mut load_error = None;
    let frames = until_error(paths.iter().map(|path| load_frame(path)), &mut load_error);

    let mut rng = Pcg64::seed_from_u64(opt.seed);
    let mut reconstruction = Reconstruction::new();
    let report =
        reconstruction.process_sequence(&pipeline, frames, &mut rng, &CancelToken::new())?;
    if let Some(e) = load_error {
        return Err(e);
    }
    if report.reconstructed == 0 {
        warn!("no image pair could be reconstructed");
    }

    info!("exporting the reconstruction to {}", opt.output.display());
    let mut writer = BufWriter::new(File::create(&opt.output)?);
    export_ply(&mut writer, &reconstruction)?;
    writer.flush()?;
    Ok(())
}

fn main() {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();
    if let Err(e) = run(opt) {
        error!("{}", e);
        std::process::exit(1);
    }
}
