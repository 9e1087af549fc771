use sfm_core::{
    nalgebra::{Matrix4, Point2, Point3, SVD},
    ProjectionMatrix,
};

/// Homogeneous solutions whose last coordinate is this small are points at infinity.
const INFINITY_THRESHOLD: f64 = 1e-12;

/// Linear triangulation by the direct linear transform.
///
/// Each view contributes two rows of the cross product constraint `x × (P·X) = 0`:
/// `x·P₃ − P₁` and `y·P₃ − P₂`, where `Pᵢ` is row `i` of the projection matrix. The
/// homogeneous point is the right singular vector of the smallest singular value.
///
/// ```
/// use sfm_core::nalgebra::{Point2, Point3, Rotation3, Vector3};
/// use sfm_core::{ProjectionMatrix, RelativePose};
/// use sfm_geom::LinearTriangulator;
///
/// let point = Point3::new(0.3, 0.1, 2.0);
/// let pose = RelativePose::new(Rotation3::new(Vector3::new(0.1, 0.1, 0.1)), Vector3::new(0.1, 0.1, 0.1));
/// let moved = pose.transform(point);
/// let triangulated = LinearTriangulator::new()
///     .triangulate(
///         &ProjectionMatrix::identity(),
///         &pose.projection(),
///         Point2::new(point.x / point.z, point.y / point.z),
///         Point2::new(moved.x / moved.z, moved.y / moved.z),
///     )
///     .unwrap();
/// assert!((point - triangulated).norm() < 1e-9);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct LinearTriangulator {
    epsilon: f64,
    max_iterations: usize,
}

impl LinearTriangulator {
    /// Creates a `LinearTriangulator` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the epsilon used in the singular value decomposition.
    ///
    /// Default is `1e-12`.
    #[must_use]
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }

    /// Set the maximum number of iterations for the singular value decomposition.
    ///
    /// Default is `1000`.
    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// Triangulates the point seen at `a` by `first` and at `b` by `second`.
    ///
    /// Returns `None` if the decomposition fails or the solution lies at infinity.
    pub fn triangulate(
        &self,
        first: &ProjectionMatrix,
        second: &ProjectionMatrix,
        a: Point2<f64>,
        b: Point2<f64>,
    ) -> Option<Point3<f64>> {
        let mut system = Matrix4::<f64>::zeros();
        for (view, (projection, x)) in [(first, a), (second, b)].iter().enumerate() {
            let third = projection.row(2);
            system.set_row(2 * view, &(x.x * third - projection.row(0)));
            system.set_row(2 * view + 1, &(x.y * third - projection.row(1)));
        }

        let svd = SVD::try_new(system, false, true, self.epsilon, self.max_iterations)?;
        // Singular values are sorted, so the last row of `Vᵗ` is the null space.
        let homogeneous = svd.v_t?.row(3).transpose();
        if homogeneous.w.abs() < INFINITY_THRESHOLD {
            return None;
        }
        Point3::from_homogeneous(homogeneous).filter(|point| point.iter().all(|n| n.is_finite()))
    }
}

impl Default for LinearTriangulator {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            max_iterations: 1000,
        }
    }
}
