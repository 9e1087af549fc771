use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use sfm_core::{
    nalgebra::{Matrix3, Vector3, SVD},
    sample_consensus::Model,
    FeatureMatch,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// This stores a fundamental matrix, which is satisfied by the following constraint:
///
/// transpose(x2) * F * x1 = 0
///
/// Where `x1` and `x2` are homogeneous pixel coordinates (`z = 1`) of the same scene point seen
/// in the first and second image. Unlike the essential matrix, `F` absorbs the camera intrinsics,
/// so it can be estimated from raw keypoint positions.
///
/// A valid fundamental matrix has rank 2. Estimators produce matrices with unit Frobenius norm.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FundamentalMatrix(pub Matrix3<f64>);

impl FundamentalMatrix {
    /// Zeroes the smallest singular value, giving the closest rank 2 matrix in Frobenius norm.
    ///
    /// ```
    /// use eight_point::FundamentalMatrix;
    /// use sfm_core::nalgebra::Matrix3;
    ///
    /// let full_rank = FundamentalMatrix(Matrix3::new(2.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 3.0));
    /// let fixed = full_rank.enforce_rank_two(1e-12, 1000).unwrap();
    /// assert!(fixed.determinant().abs() < 1e-12);
    /// ```
    pub fn enforce_rank_two(self, epsilon: f64, max_iterations: usize) -> Option<Self> {
        let mut svd = SVD::try_new(self.0, true, true, epsilon, max_iterations)?;
        // Singular values are sorted, so the last one is the smallest.
        svd.singular_values[2] = 0.0;
        svd.recompose().ok().map(Self)
    }

    /// Singular values in descending order.
    pub fn singular_values(&self, epsilon: f64, max_iterations: usize) -> Option<Vector3<f64>> {
        SVD::try_new(self.0, false, false, epsilon, max_iterations).map(|svd| svd.singular_values)
    }

    /// Scales the matrix to unit Frobenius norm. Returns `None` for the zero matrix.
    pub fn normalize(self) -> Option<Self> {
        let norm = self.0.norm();
        if norm > 0.0 && norm.is_finite() {
            Some(Self(self.0 / norm))
        } else {
            None
        }
    }
}

impl Model<FeatureMatch> for FundamentalMatrix {
    /// The algebraic epipolar error `|x2ᵗ·F·x1|`.
    fn residual(&self, data: &FeatureMatch) -> f64 {
        let &FeatureMatch(a, b) = data;
        // The result is a 1x1 matrix which we must get element 0 from.
        (b.to_homogeneous().transpose() * self.0 * a.to_homogeneous())[0].abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfm_core::nalgebra::Point2;

    #[test]
    fn residual_of_horizontal_motion() {
        // Pure motion along x keeps every point on its row.
        let f = FundamentalMatrix(Matrix3::new(0.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0));
        let same_row = FeatureMatch(Point2::new(10.0, 20.0), Point2::new(3.0, 20.0));
        assert_eq!(f.residual(&same_row), 0.0);
        let off_row = FeatureMatch(Point2::new(10.0, 20.0), Point2::new(3.0, 22.5));
        assert_eq!(f.residual(&off_row), 2.5);
    }

    #[test]
    fn rank_two_keeps_the_largest_singular_values() {
        let f = FundamentalMatrix(Matrix3::from_diagonal(&Vector3::new(1.0, 5.0, 3.0)));
        let fixed = f.enforce_rank_two(1e-12, 1000).unwrap();
        let singular = fixed.singular_values(1e-12, 1000).unwrap();
        assert!((singular[0] - 5.0).abs() < 1e-12);
        assert!((singular[1] - 3.0).abs() < 1e-12);
        assert!(singular[2].abs() < 1e-12);
        assert!(fixed[(0, 0)].abs() < 1e-12);
    }

    #[test]
    fn zero_matrix_cannot_be_normalized() {
        assert_eq!(FundamentalMatrix(Matrix3::zeros()).normalize(), None);
        let unit = FundamentalMatrix(Matrix3::repeat(2.0)).normalize().unwrap();
        assert!((unit.norm() - 1.0).abs() < 1e-12);
    }
}
