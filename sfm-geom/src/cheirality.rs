use crate::LinearTriangulator;
use log::*;
use sfm_core::{nalgebra::Point3, FeatureMatch, ProjectionMatrix, RelativePose};

/// Whether a point is strictly in front of both cameras.
pub fn in_front_of_both(first: &ProjectionMatrix, second: &ProjectionMatrix, point: &Point3<f64>) -> bool {
    first.depth(point) > 0.0 && second.depth(point) > 0.0
}

/// Picks the pose hypothesis that places most triangulated points in front of each camera.
///
/// The first camera is always `[I | 0]`, and the matches are in normalized image coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct PoseSelector {
    pub triangulator: LinearTriangulator,
}

impl PoseSelector {
    pub fn new(triangulator: LinearTriangulator) -> Self {
        Self { triangulator }
    }

    /// Triangulates every match under `pose`. Matches that cannot be triangulated give `None`.
    pub fn triangulate_all<'a>(
        &'a self,
        pose: &RelativePose,
        matches: &'a [FeatureMatch],
    ) -> impl Iterator<Item = Option<Point3<f64>>> + 'a {
        let first = ProjectionMatrix::identity();
        let second = pose.projection();
        matches
            .iter()
            .map(move |&FeatureMatch(a, b)| self.triangulator.triangulate(&first, &second, a, b))
    }

    /// The number of matches that triangulate in front of the first camera and the number that
    /// triangulate in front of the second camera, counted independently.
    pub fn positive_depth_counts(&self, pose: &RelativePose, matches: &[FeatureMatch]) -> (usize, usize) {
        let first = ProjectionMatrix::identity();
        let second = pose.projection();
        self.triangulate_all(pose, matches)
            .flatten()
            .fold((0, 0), |(in_first, in_second), point| {
                (
                    in_first + usize::from(first.depth(&point) > 0.0),
                    in_second + usize::from(second.depth(&point) > 0.0),
                )
            })
    }

    /// A pose passes when strictly more than half of the matches are in front of the first camera
    /// and strictly more than half are in front of the second camera.
    ///
    /// The two majorities need not be made of the same points.
    pub fn passes(&self, pose: &RelativePose, matches: &[FeatureMatch]) -> bool {
        let (in_first, in_second) = self.positive_depth_counts(pose, matches);
        trace!(
            "{} and {} of {} points in front of the first and second camera",
            in_first,
            in_second,
            matches.len()
        );
        2 * in_first > matches.len() && 2 * in_second > matches.len()
    }

    /// Tests the hypotheses in order and returns the index and pose of the first that passes.
    ///
    /// ```
    /// use sfm_core::nalgebra::{Point2, Point3, Rotation3, Vector3};
    /// use sfm_core::{FeatureMatch, RelativePose};
    /// use sfm_geom::PoseSelector;
    ///
    /// let truth = RelativePose::new(Rotation3::identity(), Vector3::new(-1.0, 0.0, 0.0));
    /// let matches: Vec<FeatureMatch> = [Point3::new(0.5, 0.2, 4.0), Point3::new(-1.0, 0.3, 6.0)]
    ///     .iter()
    ///     .map(|&p| {
    ///         let q = truth.transform(p);
    ///         FeatureMatch(Point2::new(p.x / p.z, p.y / p.z), Point2::new(q.x / q.z, q.y / q.z))
    ///     })
    ///     .collect();
    /// let flipped = RelativePose::new(Rotation3::identity(), Vector3::new(1.0, 0.0, 0.0));
    /// let (index, _) = PoseSelector::default().select(&[flipped, truth], &matches).unwrap();
    /// assert_eq!(index, 1);
    /// ```
    pub fn select(&self, hypotheses: &[RelativePose], matches: &[FeatureMatch]) -> Option<(usize, RelativePose)> {
        let selected = hypotheses
            .iter()
            .copied()
            .enumerate()
            .find(|(_, pose)| self.passes(pose, matches));
        match selected {
            Some((index, _)) => debug!("Accepted pose hypothesis {}", index),
            None => debug!("No pose hypothesis passed the cheirality test"),
        }
        selected
    }
}
