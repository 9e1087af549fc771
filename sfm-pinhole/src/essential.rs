use crate::CameraIntrinsics;
use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use eight_point::FundamentalMatrix;
use log::*;
use sfm_core::{
    nalgebra::{Matrix3, Rotation3, Vector3, SVD},
    sample_consensus::Model,
    FeatureMatch, RelativePose,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// This stores an essential matrix, which is satisfied by the following constraint:
///
/// transpose(x2) * E * x1 = 0
///
/// Where `x1` and `x2` are homogeneous normalized image coordinates. The essential matrix is the
/// fundamental matrix with the camera intrinsics removed, so it only depends on the relative
/// pose: `E = [t]ₓ·R`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct EssentialMatrix(pub Matrix3<f64>);

impl EssentialMatrix {
    /// Removes the intrinsics shared by both views from a fundamental matrix: `E = Kᵗ·F·K`.
    pub fn from_fundamental(fundamental: &FundamentalMatrix, intrinsics: &CameraIntrinsics) -> Self {
        let k = intrinsics.matrix();
        Self(k.transpose() * fundamental.0 * k)
    }

    /// Returns two possible rotations for the essential matrix along with a translation
    /// bearing of arbitrary length and sign.
    ///
    /// `U` and `Vᵗ` of the singular value decomposition are negated when their determinant is
    /// negative so that both rotations are proper. The rotations are `U·W·Vᵗ` and `U·Wᵗ·Vᵗ`, and
    /// the translation is the last column of `U`.
    ///
    /// `epsilon` is the threshold by which the singular value decomposition is considered
    /// complete. `max_iterations` is the maximum number of iterations that singular value
    /// decomposition will run on this matrix.
    ///
    /// ```
    /// use sfm_core::{nalgebra::{Rotation3, Vector3}, RelativePose};
    /// use sfm_pinhole::EssentialMatrix;
    ///
    /// let pose = RelativePose::new(
    ///     Rotation3::from_euler_angles(0.2, 0.3, 0.4),
    ///     Vector3::new(-0.8, 0.4, 0.5),
    /// );
    /// let (rot_a, rot_b, t) = EssentialMatrix::from(pose)
    ///     .possible_rotations_unscaled_translation(1e-12, 1000)
    ///     .unwrap();
    /// // At least one rotation is correct.
    /// let close = |rot: Rotation3<f64>| (rot.matrix() - pose.rotation.matrix()).norm() < 1e-6;
    /// assert!(close(rot_a) || close(rot_b));
    /// // The translation points in the same (or reverse) direction.
    /// assert!(1.0 - t.normalize().dot(&pose.translation.normalize()).abs() < 1e-9);
    /// ```
    pub fn possible_rotations_unscaled_translation(
        &self,
        epsilon: f64,
        max_iterations: usize,
    ) -> Option<(Rotation3<f64>, Rotation3<f64>, Vector3<f64>)> {
        // `W` from https://en.wikipedia.org/wiki/Essential_matrix#Finding_one_solution.
        let w = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let wt = w.transpose();

        let svd = SVD::try_new(self.0, true, true, epsilon, max_iterations)?;
        let (mut u, mut v_t) = (svd.u?, svd.v_t?);
        if u.determinant() < 0.0 {
            u = -u;
        }
        if v_t.determinant() < 0.0 {
            v_t = -v_t;
        }
        Some((
            Rotation3::from_matrix_unchecked(u * w * v_t),
            Rotation3::from_matrix_unchecked(u * wt * v_t),
            u.column(2).into_owned(),
        ))
    }

    /// See [`EssentialMatrix::possible_rotations_unscaled_translation`].
    ///
    /// This returns the four pose hypotheses in the order they are tested:
    /// `(R1, t)`, `(R1, -t)`, `(R2, t)`, `(R2, -t)`.
    ///
    /// ```
    /// use sfm_core::{nalgebra::{Rotation3, Vector3}, RelativePose};
    /// use sfm_pinhole::EssentialMatrix;
    ///
    /// let pose = RelativePose::new(
    ///     Rotation3::from_euler_angles(0.2, 0.3, 0.4),
    ///     Vector3::new(-0.8, 0.4, 0.5),
    /// );
    /// let poses = EssentialMatrix::from(pose).possible_unscaled_poses(1e-12, 1000).unwrap();
    /// let one_correct = poses.iter().any(|candidate| {
    ///     let rotation_residual = (candidate.rotation.matrix() - pose.rotation.matrix()).norm();
    ///     let translation_residual =
    ///         1.0 - candidate.translation.dot(&pose.translation.normalize());
    ///     rotation_residual < 1e-6 && translation_residual < 1e-9
    /// });
    /// assert!(one_correct);
    /// ```
    pub fn possible_unscaled_poses(&self, epsilon: f64, max_iterations: usize) -> Option<[RelativePose; 4]> {
        let (rot_a, rot_b, t) = self.possible_rotations_unscaled_translation(epsilon, max_iterations)?;
        trace!("Decomposed essential matrix, translation bearing {:?}", t);
        Some([
            RelativePose::new(rot_a, t),
            RelativePose::new(rot_a, -t),
            RelativePose::new(rot_b, t),
            RelativePose::new(rot_b, -t),
        ])
    }
}

/// Generates an essential matrix corresponding to this relative camera pose.
///
/// If a point `a` in the first camera's frame is transformed using [`RelativePose::transform`]
/// into `b`, then the normalized image coordinates of `a` and `b` give a residual of
/// approximately `0.0`.
impl From<RelativePose> for EssentialMatrix {
    fn from(pose: RelativePose) -> Self {
        Self(pose.translation.cross_matrix() * pose.rotation.matrix())
    }
}

/// The residual of a match of normalized image coordinates.
impl Model<FeatureMatch> for EssentialMatrix {
    fn residual(&self, data: &FeatureMatch) -> f64 {
        let &FeatureMatch(a, b) = data;
        (b.to_homogeneous().transpose() * self.0 * a.to_homogeneous())[0].abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NormalizedKeyPoint;
    use approx::assert_relative_eq;
    use sfm_core::nalgebra::{Point2, Point3};

    fn pose() -> RelativePose {
        RelativePose::new(
            Rotation3::from_euler_angles(-0.05, 0.1, 0.02),
            Vector3::new(0.6, -0.1, 0.2),
        )
    }

    #[test]
    fn rotations_are_proper() {
        let essential = EssentialMatrix::from(pose());
        for candidate in essential.possible_unscaled_poses(1e-12, 1000).unwrap() {
            let matrix = candidate.rotation.matrix();
            assert_relative_eq!(matrix.determinant(), 1.0, epsilon = 1e-9);
            assert_relative_eq!(matrix * matrix.transpose(), Matrix3::identity(), epsilon = 1e-9);
            assert_relative_eq!(candidate.translation.norm(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn hypotheses_come_in_sign_pairs() {
        let poses = EssentialMatrix::from(pose()).possible_unscaled_poses(1e-12, 1000).unwrap();
        assert_eq!(poses[0].rotation, poses[1].rotation);
        assert_eq!(poses[2].rotation, poses[3].rotation);
        assert_eq!(poses[0].translation, -poses[1].translation);
        assert_eq!(poses[0].translation, poses[2].translation);
        assert_eq!(poses[2].translation, -poses[3].translation);
    }

    #[test]
    fn fundamental_to_essential_removes_intrinsics() {
        let intrinsics = CameraIntrinsics::identity()
            .focal(800.0)
            .principal_point(Point2::new(512.0, 384.0));
        let k_inv = intrinsics.matrix().try_inverse().unwrap();
        let truth = EssentialMatrix::from(pose());
        let fundamental = FundamentalMatrix(k_inv.transpose() * truth.0 * k_inv);
        let essential = EssentialMatrix::from_fundamental(&fundamental, &intrinsics);
        assert_relative_eq!(essential.0, truth.0, epsilon = 1e-10);

        // The epipolar constraint holds for a projected point in both representations.
        let a = Point3::new(0.3, -0.4, 5.0);
        let b = pose().transform(a);
        let na = NormalizedKeyPoint(Point2::new(a.x / a.z, a.y / a.z));
        let nb = NormalizedKeyPoint(Point2::new(b.x / b.z, b.y / b.z));
        assert!(essential.residual(&FeatureMatch(na.0, nb.0)) < 1e-12);
        let pixels = FeatureMatch(intrinsics.uncalibrate(na), intrinsics.uncalibrate(nb));
        assert!(fundamental.residual(&pixels) < 1e-9);
    }
}
