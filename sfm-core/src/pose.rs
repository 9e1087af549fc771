use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Matrix3x4, Point3, Rotation3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The pose of the second camera of a pair relative to the first.
///
/// A point `X` in the first camera's frame appears at `R·X + t` in the second camera's frame.
/// The translation of a pose recovered from two views is only known up to scale, so poses
/// produced by the decomposition carry a unit-length translation.
///
/// The rotation is stored as a [`Rotation3`] but it is not re-orthonormalized when built from
/// a decomposition, so decoy hypotheses (for instance a reflection) can also be represented.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RelativePose {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl RelativePose {
    pub fn new(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// The pose of the first camera: no rotation and no translation.
    pub fn identity() -> Self {
        Self::new(Rotation3::identity(), Vector3::zeros())
    }

    /// Maps a point from the first camera's frame into the second camera's frame.
    pub fn transform(&self, point: Point3<f64>) -> Point3<f64> {
        self.rotation * point + self.translation
    }

    /// The intrinsic-free projection matrix `[R | t]`.
    pub fn projection(&self) -> ProjectionMatrix {
        (*self).into()
    }
}

/// A 3x4 camera projection matrix.
///
/// In this workspace projection matrices are intrinsic-free (`[R | t]`) and act on
/// normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ProjectionMatrix(pub Matrix3x4<f64>);

impl ProjectionMatrix {
    /// The reference camera `[I | 0]`.
    pub fn identity() -> Self {
        Self(Matrix3x4::identity())
    }

    /// Projects a euclidean point, returning the homogeneous image coordinate.
    pub fn project(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.0 * point.to_homogeneous()
    }

    /// The depth of a point is the third homogeneous coordinate of its projection.
    ///
    /// ```
    /// use sfm_core::{ProjectionMatrix, RelativePose};
    /// use sfm_core::nalgebra::{Point3, Rotation3, Vector3};
    ///
    /// let point = Point3::new(0.2, -0.1, 4.0);
    /// assert_eq!(ProjectionMatrix::identity().depth(&point), 4.0);
    ///
    /// let behind = RelativePose::new(Rotation3::identity(), Vector3::new(0.0, 0.0, -5.0));
    /// assert!(behind.projection().depth(&point) < 0.0);
    /// ```
    pub fn depth(&self, point: &Point3<f64>) -> f64 {
        self.project(point).z
    }
}

impl From<RelativePose> for ProjectionMatrix {
    fn from(pose: RelativePose) -> Self {
        let rot = pose.rotation.matrix();
        Self(Matrix3x4::from_columns(&[
            rot.column(0),
            rot.column(1),
            rot.column(2),
            pose.translation.column(0),
        ]))
    }
}
