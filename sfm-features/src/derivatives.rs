use crate::{convolution::correlate, Error, GrayImage};
use ndarray::{array, Array2};
use std::{fmt, str::FromStr};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The kernel used to compute intensity gradients.
///
/// Each variant defines the horizontal kernel. The vertical kernel is its transpose.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(rename_all = "kebab-case"))]
pub enum GradientKernel {
    /// The 3x3 Sobel operator.
    #[default]
    Sobel,
    /// A 1x2 backward difference `[-1, 1]`.
    FiniteDifference,
}

impl GradientKernel {
    pub fn horizontal(self) -> Array2<f64> {
        match self {
            GradientKernel::Sobel => array![[-1., 0., 1.], [-2., 0., 2.], [-1., 0., 1.]],
            GradientKernel::FiniteDifference => array![[-1., 1.]],
        }
    }

    pub fn vertical(self) -> Array2<f64> {
        self.horizontal().reversed_axes()
    }

    /// Compute the horizontal and vertical gradients `(Ix, Iy)` of an image.
    pub fn gradients(self, image: &GrayImage) -> (Array2<f64>, Array2<f64>) {
        let horizontal = correlate(image.ref_array2(), self.horizontal().view());
        let vertical = correlate(image.ref_array2(), self.vertical().view());
        (horizontal, vertical)
    }
}

impl FromStr for GradientKernel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sobel" => Ok(GradientKernel::Sobel),
            "finite-difference" => Ok(GradientKernel::FiniteDifference),
            other => Err(Error::UnknownKernel(other.to_owned())),
        }
    }
}

impl fmt::Display for GradientKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GradientKernel::Sobel => "sobel",
            GradientKernel::FiniteDifference => "finite-difference",
        })
    }
}
