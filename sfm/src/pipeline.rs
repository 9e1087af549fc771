use crate::SfmSettings;
use eight_point::FundamentalMatrix;
use log::*;
use rand::Rng;
use sfm_consensus::Ransac;
use sfm_core::{
    sample_consensus::{Consensus, Estimator},
    ColoredPoint, FeatureMatch, KeyPoint, Match, ProjectionMatrix, RelativePose,
};
use sfm_features::{Descriptor, Frame};
use sfm_geom::in_front_of_both;
use sfm_pinhole::{CameraIntrinsics, EssentialMatrix};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use thiserror::Error;

/// The reasons a pair of images produces no reconstruction.
///
/// Apart from [`PairError::Features`], which comes from invalid settings, these are expected
/// on real sequences and the pair is simply skipped.
#[derive(Debug, Error)]
pub enum PairError {
    #[error("only {matches} matches, at least {required} are needed")]
    InsufficientMatches { matches: usize, required: usize },
    #[error("no fundamental matrix could be estimated from the matches")]
    NoConsensus,
    #[error("the essential matrix could not be decomposed")]
    DegenerateEssential,
    #[error("no pose hypothesis places a majority of points in front of each camera")]
    NoValidPose,
    #[error("processing was cancelled")]
    Cancelled,
    #[error(transparent)]
    Features(#[from] sfm_features::Error),
}

/// A flag shared between the caller and a running reconstruction.
///
/// Cancelling stops processing at the next stage boundary. The partial results of the pair in
/// progress are discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<(), PairError> {
        if self.is_cancelled() {
            Err(PairError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The keypoints of a frame and their index-aligned descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub keypoints: Vec<KeyPoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Everything accepted from one image pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairReconstruction {
    /// The accepted pose of the second camera relative to the first.
    pub pose: RelativePose,
    /// The position of the accepted pose in the hypothesis order.
    pub hypothesis: usize,
    /// The fundamental matrix estimated by RANSAC.
    pub fundamental: FundamentalMatrix,
    /// The number of descriptor matches.
    pub matches: usize,
    /// The matches consistent with the fundamental matrix.
    pub inliers: Vec<Match>,
    /// The triangulated inliers in front of both cameras, in the first camera's frame.
    pub points: Vec<ColoredPoint>,
}

/// Runs every stage of two-view reconstruction for one pair of frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoViewPipeline {
    pub settings: SfmSettings,
    pub intrinsics: CameraIntrinsics,
}

impl TwoViewPipeline {
    pub fn new(settings: SfmSettings, intrinsics: CameraIntrinsics) -> Self {
        Self {
            settings,
            intrinsics,
        }
    }

    /// Detects corners and describes them.
    pub fn extract(&self, frame: &Frame) -> Result<Features, sfm_features::Error> {
        let keypoints = self.settings.harris().detect(frame.gray())?;
        let descriptors = self.settings.patch_extractor().extract(frame.gray(), &keypoints)?;
        debug!("Extracted {} features", keypoints.len());
        Ok(Features {
            keypoints,
            descriptors,
        })
    }

    /// Reconstructs the pair `a`, `b` from scratch.
    pub fn process_pair<R: Rng>(
        &self,
        a: &Frame,
        b: &Frame,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<PairReconstruction, PairError> {
        cancel.check()?;
        let features_a = self.extract(a)?;
        cancel.check()?;
        let features_b = self.extract(b)?;
        self.process_features(a, &features_a, &features_b, rng, cancel)
    }

    /// Reconstructs a pair from already extracted features.
    ///
    /// `first` is the first frame of the pair, which supplies the point colors.
    pub fn process_features<R: Rng>(
        &self,
        first: &Frame,
        features_a: &Features,
        features_b: &Features,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<PairReconstruction, PairError> {
        cancel.check()?;
        let matches = self
            .settings
            .matching
            .match_descriptors(&features_a.descriptors, &features_b.descriptors);
        let required = <eight_point::EightPoint as Estimator<FeatureMatch>>::MIN_SAMPLES;
        if matches.len() < required {
            return Err(PairError::InsufficientMatches {
                matches: matches.len(),
                required,
            });
        }
        let pixel_matches: Vec<FeatureMatch> = matches
            .iter()
            .map(|m| m.feature_match(&features_a.keypoints, &features_b.keypoints))
            .collect();

        cancel.check()?;
        trace!("Running RANSAC on {} matches", pixel_matches.len());
        let mut ransac = Ransac::new(self.settings.ransac_threshold, rng)
            .iterations(self.settings.ransac_iterations);
        let (fundamental, inlier_indices) = ransac
            .model_inliers(&self.settings.eight_point(), pixel_matches.iter().copied())
            .ok_or(PairError::NoConsensus)?;
        debug!(
            "Fundamental matrix supported by {} of {} matches",
            inlier_indices.len(),
            matches.len()
        );

        cancel.check()?;
        let essential = EssentialMatrix::from_fundamental(&fundamental, &self.intrinsics);
        let hypotheses = essential
            .possible_unscaled_poses(self.settings.svd_epsilon, self.settings.svd_max_iterations)
            .ok_or(PairError::DegenerateEssential)?;
        let inliers: Vec<Match> = inlier_indices.iter().map(|&ix| matches[ix]).collect();
        let normalized: Vec<FeatureMatch> = inlier_indices
            .iter()
            .map(|&ix| self.intrinsics.calibrate_match(pixel_matches[ix]))
            .collect();

        cancel.check()?;
        let selector = self.settings.pose_selector();
        let (hypothesis, pose) = selector
            .select(&hypotheses, &normalized)
            .ok_or(PairError::NoValidPose)?;

        let first_camera = ProjectionMatrix::identity();
        let second_camera = pose.projection();
        let points: Vec<ColoredPoint> = selector
            .triangulate_all(&pose, &normalized)
            .zip(&inliers)
            .filter_map(|(point, &Match(ix, _))| {
                let point = point.filter(|p| in_front_of_both(&first_camera, &second_camera, p))?;
                let KeyPoint { x, y } = features_a.keypoints[ix];
                Some(ColoredPoint {
                    point,
                    color: first.color().normalized_rgb(x, y),
                })
            })
            .collect();
        cancel.check()?;

        info!(
            "Pair reconstructed: {} matches, {} inliers, hypothesis {}, {} points",
            matches.len(),
            inliers.len(),
            hypothesis,
            points.len()
        );
        Ok(PairReconstruction {
            pose,
            hypothesis,
            fundamental,
            matches: matches.len(),
            inliers,
            points,
        })
    }
}
