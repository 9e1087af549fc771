use crate::{CancelToken, Features, PairError, PairReconstruction, TwoViewPipeline};
use log::*;
use rand::Rng;
use sfm_core::nalgebra::{Point3, Vector3};
use sfm_features::Frame;

/// The points, colors, and camera trajectory accumulated over a sequence.
///
/// `points` and `colors` are index-aligned. The trajectory holds one translation per
/// reconstructed pair, in sequence order. Each pair's points stay in the frame of that pair's
/// first camera; pairs are not chained into a common frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconstruction {
    pub points: Vec<Point3<f64>>,
    pub colors: Vec<[f64; 3]>,
    pub trajectory: Vec<Vector3<f64>>,
}

/// What happened while processing a sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceReport {
    /// Pairs whose reconstruction was added.
    pub reconstructed: usize,
    /// Pairs skipped because they could not be reconstructed.
    pub skipped: usize,
    /// Whether processing stopped early because of cancellation.
    pub cancelled: bool,
}

impl Reconstruction {
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends the points of a pair and its translation.
    pub fn extend(&mut self, pair: PairReconstruction) {
        self.trajectory.push(pair.pose.translation);
        for colored in pair.points {
            self.points.push(colored.point);
            self.colors.push(colored.color);
        }
    }

    /// Reconstructs every consecutive pair of `frames` and accumulates the results.
    ///
    /// Features are extracted once per frame. Pairs that cannot be reconstructed are logged and
    /// skipped. Cancellation stops processing without adding the pair in progress. Only
    /// configuration errors abort the sequence.
    pub fn process_sequence<R: Rng>(
        &mut self,
        pipeline: &TwoViewPipeline,
        frames: impl IntoIterator<Item = Frame>,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<SequenceReport, sfm_features::Error> {
        let mut report = SequenceReport::default();
        let mut previous: Option<(Frame, Features)> = None;
        for (index, frame) in frames.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let features = pipeline.extract(&frame)?;
            if let Some((first, first_features)) = &previous {
                match pipeline.process_features(first, first_features, &features, rng, cancel) {
                    Ok(pair) => {
                        self.extend(pair);
                        report.reconstructed += 1;
                    }
                    Err(PairError::Cancelled) => {
                        report.cancelled = true;
                        break;
                    }
                    Err(PairError::Features(e)) => return Err(e),
                    Err(e) => {
                        warn!("Skipping pair {}-{}: {}", index - 1, index, e);
                        report.skipped += 1;
                    }
                }
            }
            previous = Some((frame, features));
        }
        if report.cancelled {
            info!("Reconstruction cancelled");
        }
        info!(
            "Reconstructed {} pairs, skipped {}, {} points",
            report.reconstructed,
            report.skipped,
            self.len()
        );
        Ok(report)
    }
}
