//! The normalized eight-point algorithm for estimating a [`FundamentalMatrix`] from pixel
//! correspondences.

mod fundamental;

pub use fundamental::FundamentalMatrix;

use float_ord::FloatOrd;
use log::*;
use sfm_core::{
    nalgebra::{Matrix3, Point2, SMatrix, SVector},
    sample_consensus::Estimator,
    FeatureMatch,
};

/// A sample is rejected when its second smallest eigenvalue is this small relative to the
/// largest, which means the solution is not unique.
const DEGENERACY_RATIO: f64 = 1e-12;

/// The similarity transform that moves the centroid of the points to the origin and makes their
/// mean distance from it `√2`.
fn hartley_normalization(points: impl Iterator<Item = Point2<f64>> + Clone) -> Option<Matrix3<f64>> {
    let count = points.clone().count() as f64;
    let centroid = points.clone().fold(Point2::origin(), |acc, p| acc + p.coords) / count;
    let mean_distance = points.map(|p| (p - centroid).norm()).sum::<f64>() / count;
    if !(mean_distance > 0.0) {
        return None;
    }
    let scale = std::f64::consts::SQRT_2 / mean_distance;
    #[rustfmt::skip]
    let transform = Matrix3::new(
        scale, 0.0,   -scale * centroid.x,
        0.0,   scale, -scale * centroid.y,
        0.0,   0.0,   1.0,
    );
    Some(transform)
}

/// Accumulates `AᵗA` for the epipolar system `A·f = 0`, where each match contributes the row
/// `[x2·x1, x2·y1, x2, y2·x1, y2·y1, y2, x1, y1, 1]` and `f` is `F` in row-major order.
fn encode_epipolar_equation(
    matches: impl Iterator<Item = FeatureMatch>,
    t1: &Matrix3<f64>,
    t2: &Matrix3<f64>,
) -> SMatrix<f64, 9, 9> {
    let mut ata = SMatrix::<f64, 9, 9>::zeros();
    for FeatureMatch(a, b) in matches {
        let a = t1 * a.to_homogeneous();
        let b = t2 * b.to_homogeneous();
        let mut row = SVector::<f64, 9>::zeros();
        for j in 0..3 {
            row.fixed_rows_mut::<3>(3 * j).copy_from(&(b[j] * a));
        }
        ata += row * row.transpose();
    }
    ata
}

/// Performs the
/// [eight-point algorithm](https://en.wikipedia.org/wiki/Eight-point_algorithm)
/// by Richard Hartley and Andrew Zisserman, with Hartley's coordinate normalization.
///
/// `epsilon` and `iterations` bound the eigen and singular value decompositions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EightPoint {
    pub epsilon: f64,
    pub iterations: usize,
}

impl EightPoint {
    pub fn new() -> Self {
        Default::default()
    }

    /// Estimates the rank 2 fundamental matrix, with unit Frobenius norm, that best satisfies
    /// the epipolar constraint for all of the matches in the least squares sense.
    ///
    /// Returns `None` with fewer than 8 matches, for degenerate configurations (coincident or
    /// collinear points, for instance), or if a decomposition does not converge.
    ///
    /// ```
    /// use eight_point::EightPoint;
    /// use sfm_core::{nalgebra::Point2, sample_consensus::Model, FeatureMatch};
    ///
    /// // The second camera moved sideways, so every point stays on its row.
    /// let matches: Vec<FeatureMatch> = [
    ///     (100.0, 60.0, 50.0), (300.0, 80.0, 260.0), (420.0, 120.0, 395.0),
    ///     (150.0, 200.0, 130.0), (260.0, 250.0, 250.0), (380.0, 300.0, 372.0),
    ///     (90.0, 330.0, 85.0), (200.0, 130.0, 196.0),
    /// ]
    /// .iter()
    /// .map(|&(x1, y, x2)| FeatureMatch(Point2::new(x1, y), Point2::new(x2, y)))
    /// .collect();
    /// let fundamental = EightPoint::new().from_matches(matches.iter().copied()).unwrap();
    /// for m in &matches {
    ///     assert!(fundamental.residual(m) < 1e-6);
    /// }
    /// ```
    pub fn from_matches<I>(&self, data: I) -> Option<FundamentalMatrix>
    where
        I: Iterator<Item = FeatureMatch> + Clone,
    {
        if data.clone().count() < <Self as Estimator<FeatureMatch>>::MIN_SAMPLES {
            return None;
        }
        let t1 = hartley_normalization(data.clone().map(|FeatureMatch(a, _)| a))?;
        let t2 = hartley_normalization(data.clone().map(|FeatureMatch(_, b)| b))?;
        let ata = encode_epipolar_equation(data, &t1, &t2);
        let eigens = ata.try_symmetric_eigen(self.epsilon, self.iterations)?;

        let mut order: [usize; 9] = [0, 1, 2, 3, 4, 5, 6, 7, 8];
        order.sort_unstable_by_key(|&ix| FloatOrd(eigens.eigenvalues[ix]));
        let smallest = eigens.eigenvalues[order[0]];
        let second = eigens.eigenvalues[order[1]];
        let largest = eigens.eigenvalues[order[8]];
        if second <= largest * DEGENERACY_RATIO {
            trace!(
                "Degenerate eight-point sample: eigenvalues {:e}, {:e}, largest {:e}",
                smallest,
                second,
                largest
            );
            return None;
        }

        let eigenvector = eigens.eigenvectors.column(order[0]);
        // The solution is stored row-major, while `from_iterator` fills columns first.
        let normalized = Matrix3::from_iterator(eigenvector.iter().copied()).transpose();
        let normalized = FundamentalMatrix(normalized).enforce_rank_two(self.epsilon, self.iterations)?;
        FundamentalMatrix(t2.transpose() * normalized.0 * t1).normalize()
    }
}

impl Default for EightPoint {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            iterations: 1000,
        }
    }
}

impl Estimator<FeatureMatch> for EightPoint {
    type Model = FundamentalMatrix;
    type ModelIter = Option<FundamentalMatrix>;
    const MIN_SAMPLES: usize = 8;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = FeatureMatch> + Clone,
    {
        self.from_matches(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_centers_and_scales() {
        let points = [Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(4.0, 2.0), Point2::new(0.0, 2.0)];
        let t = hartley_normalization(points.iter().copied()).unwrap();
        let moved: Vec<Point2<f64>> = points
            .iter()
            .map(|p| Point2::from_homogeneous(t * p.to_homogeneous()).unwrap())
            .collect();
        let centroid = moved.iter().fold(Point2::origin(), |acc, p| acc + p.coords) / 4.0;
        assert!(centroid.coords.norm() < 1e-12);
        let mean = moved.iter().map(|p| p.coords.norm()).sum::<f64>() / 4.0;
        assert!((mean - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn coincident_points_are_rejected() {
        let m = FeatureMatch(Point2::new(3.0, 4.0), Point2::new(5.0, 6.0));
        assert_eq!(EightPoint::new().from_matches(std::iter::repeat(m).take(8)), None);
    }

    #[test]
    fn too_few_matches_are_rejected() {
        let matches = (0..7).map(|i| {
            let i = i as f64;
            FeatureMatch(Point2::new(i, i * i), Point2::new(i * 2.0, i + 1.0))
        });
        assert_eq!(EightPoint::new().from_matches(matches), None);
    }
}
