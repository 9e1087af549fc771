//! The pinhole camera model: converting pixel coordinates into normalized image coordinates
//! with the intrinsic matrix `K`, and recovering relative poses from the essential matrix.

mod essential;

pub use essential::*;

use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use sfm_core::{
    nalgebra::{Matrix3, Point2, Vector2, Vector3},
    FeatureMatch, ImagePoint,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A point in normalized image coordinates: a pixel position with the intrinsics removed, so
/// that `(x, y, 1)` is the direction of the ray through the pixel in the camera's frame.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct NormalizedKeyPoint(pub Point2<f64>);

impl NormalizedKeyPoint {
    /// Appends `1.0`, giving the point on the virtual image plane at depth one.
    pub fn to_homogeneous(self) -> Vector3<f64> {
        self.0.to_homogeneous()
    }
}

impl ImagePoint for NormalizedKeyPoint {
    fn image_point(&self) -> Point2<f64> {
        self.0
    }
}

/// This contains intrinsic camera parameters as per
/// [this Wikipedia page](https://en.wikipedia.org/wiki/Camera_resectioning#Intrinsic_parameters).
///
/// Both images of a pair are assumed to come from the same camera.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraIntrinsics {
    pub focals: Vector2<f64>,
    pub principal_point: Point2<f64>,
    pub skew: f64,
}

impl CameraIntrinsics {
    /// Creates camera intrinsics that would create an identity intrinsic matrix.
    /// This would imply that the pixel positions have an origin at `0,0`,
    /// the pixel distance unit is the focal length, pixels are square,
    /// and there is no skew.
    pub fn identity() -> Self {
        Self {
            focals: Vector2::new(1.0, 1.0),
            skew: 0.0,
            principal_point: Point2::new(0.0, 0.0),
        }
    }

    pub fn focal(self, focal: f64) -> Self {
        Self {
            focals: Vector2::new(focal, focal),
            ..self
        }
    }

    pub fn principal_point(self, principal_point: Point2<f64>) -> Self {
        Self {
            principal_point,
            ..self
        }
    }

    pub fn skew(self, skew: f64) -> Self {
        Self { skew, ..self }
    }

    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.focals.x,  self.skew,      self.principal_point.x,
            0.0,            self.focals.y,  self.principal_point.y,
            0.0,            0.0,            1.0,
        )
    }

    /// Takes in a point from an image in pixel coordinates and
    /// converts it to a [`NormalizedKeyPoint`], which is `K⁻¹·x`.
    ///
    /// ```
    /// use sfm_core::{nalgebra::{Point2, Vector2}, KeyPoint};
    /// use sfm_pinhole::CameraIntrinsics;
    ///
    /// let intrinsics = CameraIntrinsics {
    ///     focals: Vector2::new(800.0, 900.0),
    ///     principal_point: Point2::new(500.0, 600.0),
    ///     skew: 1.7,
    /// };
    /// let kp = KeyPoint::new(471, 322);
    /// let nkp = intrinsics.calibrate(kp);
    /// let pixel = intrinsics.matrix() * nkp.to_homogeneous();
    /// assert!((pixel - Point2::new(471.0, 322.0).to_homogeneous()).norm() < 1e-9);
    /// ```
    pub fn calibrate<P>(&self, point: P) -> NormalizedKeyPoint
    where
        P: ImagePoint,
    {
        let centered = point.image_point() - self.principal_point;
        let y = centered.y / self.focals.y;
        let x = (centered.x - self.skew * y) / self.focals.x;
        NormalizedKeyPoint(Point2::new(x, y))
    }

    /// Converts a [`NormalizedKeyPoint`] back into pixel coordinates.
    pub fn uncalibrate(&self, projection: NormalizedKeyPoint) -> Point2<f64> {
        let y = projection.y * self.focals.y;
        let x = projection.x * self.focals.x + self.skew * projection.y;
        Point2::new(x, y) + self.principal_point.coords
    }

    /// Calibrates both sides of a pixel match.
    pub fn calibrate_match(&self, FeatureMatch(a, b): FeatureMatch) -> FeatureMatch {
        FeatureMatch(self.calibrate(a).0, self.calibrate(b).0)
    }
}
