use nalgebra::Point3;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A triangulated point in the first camera's frame of its pair, tagged with the color
/// sampled from the first image at the originating keypoint.
///
/// The color channels are red, green, and blue in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ColoredPoint {
    pub point: Point3<f64>,
    pub color: [f64; 3],
}
