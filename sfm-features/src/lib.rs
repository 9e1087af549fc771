//! Sparse features for two-view reconstruction: Harris corners, normalized intensity patches,
//! and nearest-neighbor matching with a ratio test.
//!
//! ```
//! use sfm_features::{GrayImage, Harris, Matcher, PatchExtractor};
//!
//! let mut image = GrayImage::new(32, 32);
//! image.put(10, 12, 200.0);
//! image.put(20, 8, 200.0);
//! image.put(24, 12, 40.0);
//!
//! let keypoints = Harris::new(1e10).detect(&image).unwrap();
//! let descriptors = PatchExtractor::default().extract(&image, &keypoints).unwrap();
//! let matches = Matcher::default().match_descriptors(&descriptors, &descriptors);
//! assert_eq!(keypoints.len(), 2);
//! assert_eq!(matches.len(), 2);
//! ```

pub mod convolution;
mod derivatives;
mod descriptors;
mod harris;
mod image;
mod matching;

pub use crate::image::{ColorImage, Frame, GrayImage};
pub use derivatives::GradientKernel;
pub use descriptors::{Descriptor, PatchExtractor};
pub use harris::{local_maxima, Harris};
pub use matching::Matcher;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown gradient kernel {0:?}, expected \"sobel\" or \"finite-difference\"")]
    UnknownKernel(String),
    #[error("{name} must be odd, got {size}")]
    EvenWindow { name: &'static str, size: usize },
    #[error("grayscale image is {gray:?} but color image is {color:?}")]
    DimensionMismatch {
        gray: (usize, usize),
        color: (usize, usize),
    },
}
