use crate::{ImagePoint, KeyPoint};
use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A correspondence between keypoint `.0` of image A and keypoint `.1` of image B.
///
/// Both are indices into the keypoint (and descriptor) lists of their images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Match(pub usize, pub usize);

impl Match {
    /// Looks up the pixel positions of both sides of the match.
    ///
    /// Panics if either index is out of bounds, which would break the invariant
    /// that matches index into the keypoint lists they were produced from.
    pub fn feature_match(self, a: &[KeyPoint], b: &[KeyPoint]) -> FeatureMatch {
        FeatureMatch(a[self.0].image_point(), b[self.1].image_point())
    }
}

/// The pixel positions of a match, as consumed by the epipolar estimators.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FeatureMatch(pub Point2<f64>, pub Point2<f64>);
