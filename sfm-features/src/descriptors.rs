use crate::{harris::check_odd, Error, GrayImage};
use derive_more::{AsRef, Deref, From};
use log::*;
use sfm_core::KeyPoint;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Added to the patch standard deviation so that constant patches normalize to zero.
const STD_EPSILON: f64 = 1e-10;

/// A flattened, normalized intensity patch.
///
/// The values have zero mean and unit (population) variance, except for constant patches,
/// which produce an all-zero vector.
#[derive(Debug, Clone, PartialEq, Deref, AsRef, From)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Descriptor(pub Vec<f64>);

impl Descriptor {
    /// Euclidean distance to another descriptor of the same length.
    pub fn distance(&self, other: &Descriptor) -> f64 {
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

/// Extracts square patches around keypoints.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PatchExtractor {
    /// Side of the patch (odd). Descriptors have `size * size` values.
    pub size: usize,
}

impl Default for PatchExtractor {
    fn default() -> Self {
        Self { size: 9 }
    }
}

impl PatchExtractor {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    /// Extract one descriptor per keypoint, in the same order as the keypoints.
    ///
    /// Pixels of the patch outside of the image read as zero.
    pub fn extract(&self, image: &GrayImage, keypoints: &[KeyPoint]) -> Result<Vec<Descriptor>, Error> {
        check_odd("patch_size", self.size)?;
        #[cfg(not(feature = "rayon"))]
        let descriptors: Vec<Descriptor> = keypoints.iter().map(|&kp| self.patch(image, kp)).collect();
        #[cfg(feature = "rayon")]
        let descriptors: Vec<Descriptor> = keypoints.par_iter().map(|&kp| self.patch(image, kp)).collect();
        debug!("Extracted {} descriptors", descriptors.len());
        Ok(descriptors)
    }

    fn patch(&self, image: &GrayImage, keypoint: KeyPoint) -> Descriptor {
        let half = (self.size / 2) as isize;
        let (width, height) = (image.width() as isize, image.height() as isize);
        let mut values = Vec::with_capacity(self.size * self.size);
        for dy in -half..=half {
            for dx in -half..=half {
                let x = keypoint.x as isize + dx;
                let y = keypoint.y as isize + dy;
                let inside = x >= 0 && y >= 0 && x < width && y < height;
                values.push(if inside {
                    image.get(x as usize, y as usize)
                } else {
                    0.0
                });
            }
        }
        normalize(&mut values);
        Descriptor(values)
    }
}

fn normalize(values: &mut [f64]) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let std = variance.sqrt() + STD_EPSILON;
    for v in values.iter_mut() {
        *v = (*v - mean) / std;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;

    #[test]
    fn descriptors_are_standardized() {
        let mut rng = Pcg64::seed_from_u64(7);
        let image = GrayImage(Array2::from_shape_fn((20, 30), |_| rng.gen_range(0.0..255.0)));
        let keypoints = [KeyPoint::new(10, 10), KeyPoint::new(0, 0), KeyPoint::new(29, 19)];
        let descriptors = PatchExtractor::default().extract(&image, &keypoints).unwrap();
        assert_eq!(descriptors.len(), 3);
        for descriptor in &descriptors {
            assert_eq!(descriptor.len(), 81);
            let mean = descriptor.iter().sum::<f64>() / 81.0;
            let variance = descriptor.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 81.0;
            assert_relative_eq!(mean, 0.0, epsilon = 1e-9);
            assert_relative_eq!(variance, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn constant_patch_is_all_zero() {
        let image = GrayImage(Array2::from_elem((15, 15), 42.0));
        let descriptors = PatchExtractor::default()
            .extract(&image, &[KeyPoint::new(7, 7)])
            .unwrap();
        assert!(descriptors[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn patch_is_row_major_and_zero_padded() {
        let mut image = GrayImage::new(5, 5);
        image.put(1, 0, 9.0);
        let descriptors = PatchExtractor::new(3)
            .extract(&image, &[KeyPoint::new(0, 0)])
            .unwrap();
        let descriptor = &descriptors[0];
        // The patch is all zero except the pixel right of the keypoint.
        let peak = descriptor
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
        assert_eq!(peak.0, 5);
        assert!(descriptor.iter().enumerate().all(|(i, &v)| i == 5 || v == descriptor[0]));
    }

    #[test]
    fn even_patch_size_is_rejected() {
        let result = PatchExtractor::new(8).extract(&GrayImage::new(4, 4), &[]);
        assert!(matches!(result, Err(Error::EvenWindow { size: 8, .. })));
    }
}
