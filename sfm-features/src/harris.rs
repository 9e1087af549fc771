use crate::{derivatives::GradientKernel, Error, GrayImage};
use log::*;
use ndarray::{s, Array2, ArrayView2};
use sfm_core::KeyPoint;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Contains the configuration parameters of the Harris corner detector.
///
/// The most important parameter to pay attention to is `threshold`, whose scale depends on the
/// intensity range of the image and on the window size. For 8-bit intensities and a 3x3 window,
/// strong corners respond in the `1e6` to `1e11` range. [`Harris::new`] can be used to set the
/// threshold and let all other parameters remain default.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Harris {
    /// Side of the square window the structure tensor is summed over (odd)
    pub window_size: usize,
    /// Sensitivity constant `k` of the response `det - k·trace²`
    pub k: f64,
    /// Response a pixel must strictly exceed to become a keypoint candidate
    pub threshold: f64,
    /// Side of the non-maximum suppression window (odd)
    pub nms_window_size: usize,
    /// Kernel used for the image gradients
    pub kernel: GradientKernel,
}

impl Harris {
    /// This convenience constructor is provided for the very common case
    /// that the response threshold needs to be modified.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), Error> {
        check_odd("window_size", self.window_size)?;
        check_odd("nms_window_size", self.nms_window_size)
    }

    /// Compute the Harris response `R = (Sxx·Syy − Sxy²) − k·(Sxx + Syy)²` for every pixel.
    ///
    /// `Sxx`, `Syy` and `Sxy` are the sums of `Ix²`, `Iy²` and `Ix·Iy` over the window centered on
    /// the pixel. Pixels whose window would leave the image keep a response of `0`.
    pub fn response(&self, image: &GrayImage) -> Result<Array2<f64>, Error> {
        self.validate()?;
        let (ix, iy) = self.kernel.gradients(image);
        trace!("Computing gradients finished.");
        let ixx = &ix * &ix;
        let iyy = &iy * &iy;
        let ixy = &ix * &iy;
        Ok(windowed_response(
            ixx.view(),
            iyy.view(),
            ixy.view(),
            self.window_size,
            self.k,
        ))
    }

    /// Find the corners of an image.
    ///
    /// Keypoints are ordered by row, then by column.
    ///
    /// ```
    /// use sfm_core::KeyPoint;
    /// use sfm_features::{GrayImage, Harris};
    ///
    /// let mut image = GrayImage::new(21, 21);
    /// image.put(10, 10, 200.0);
    /// let keypoints = Harris::new(1e10).detect(&image).unwrap();
    /// assert_eq!(keypoints, vec![KeyPoint::new(10, 10)]);
    /// ```
    pub fn detect(&self, image: &GrayImage) -> Result<Vec<KeyPoint>, Error> {
        let response = self.response(image)?;
        trace!("Computing detector response finished.");
        let keypoints = local_maxima(response.view(), self.threshold, self.nms_window_size);
        debug!(
            "Detected {} corners on a {} x {} image",
            keypoints.len(),
            image.width(),
            image.height()
        );
        Ok(keypoints)
    }
}

impl Default for Harris {
    fn default() -> Harris {
        Harris {
            window_size: 3,
            k: 0.04,
            threshold: 1e6,
            nms_window_size: 3,
            kernel: GradientKernel::Sobel,
        }
    }
}

pub(crate) fn check_odd(name: &'static str, size: usize) -> Result<(), Error> {
    if size % 2 == 1 {
        Ok(())
    } else {
        Err(Error::EvenWindow { name, size })
    }
}

fn windowed_response(
    ixx: ArrayView2<f64>,
    iyy: ArrayView2<f64>,
    ixy: ArrayView2<f64>,
    window_size: usize,
    k: f64,
) -> Array2<f64> {
    let (height, width) = ixx.dim();
    let offset = window_size / 2;
    let mut response = Array2::zeros((height, width));
    if height < window_size || width < window_size {
        return response;
    }

    let pixel_response = |y: usize, x: usize| {
        let window = s![y - offset..=y + offset, x - offset..=x + offset];
        let sxx = ixx.slice(window).sum();
        let syy = iyy.slice(window).sum();
        let sxy = ixy.slice(window).sum();
        let det = sxx * syy - sxy * sxy;
        let trace = sxx + syy;
        det - k * trace * trace
    };

    let rows = offset..height - offset;
    #[cfg(not(feature = "rayon"))]
    let computed: Vec<Vec<f64>> = rows
        .map(|y| (offset..width - offset).map(|x| pixel_response(y, x)).collect())
        .collect();
    #[cfg(feature = "rayon")]
    let computed: Vec<Vec<f64>> = rows
        .into_par_iter()
        .map(|y| (offset..width - offset).map(|x| pixel_response(y, x)).collect())
        .collect();

    for (row_out, row_in) in response
        .slice_mut(s![offset..height - offset, offset..width - offset])
        .rows_mut()
        .into_iter()
        .zip(computed)
    {
        for (out, r) in row_out.into_iter().zip(row_in) {
            *out = r;
        }
    }
    response
}

/// Keep the pixels whose response is strictly above `threshold` and equal to the maximum of
/// the `window_size` window centered on them.
///
/// Equal responses inside one window all survive. Pixels whose window would leave the
/// response map are rejected.
pub fn local_maxima(response: ArrayView2<f64>, threshold: f64, window_size: usize) -> Vec<KeyPoint> {
    let (height, width) = response.dim();
    let half = window_size / 2;
    response
        .indexed_iter()
        .filter(|&(_, &r)| r > threshold)
        .filter(|&((y, x), &r)| {
            if y < half || x < half || y + half >= height || x + half >= width {
                return false;
            }
            let window = response.slice(s![y - half..=y + half, x - half..=x + half]);
            let max = window.fold(f64::NEG_INFINITY, |max, &v| max.max(v));
            r == max
        })
        .map(|((y, x), _)| KeyPoint::new(x, y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn impulse(size: usize, value: f64) -> GrayImage {
        let mut image = GrayImage::new(size, size);
        image.put(size / 2, size / 2, value);
        image
    }

    #[test]
    fn uniform_image_has_zero_response() {
        let image = GrayImage(Array2::from_elem((12, 15), 97.0));
        let response = Harris::default().response(&image).unwrap();
        // The zero padding of the convolution creates gradients on the outermost pixels, which
        // only reach the response two pixels from the border.
        for ((y, x), &r) in response.indexed_iter() {
            if (2..10).contains(&y) && (2..13).contains(&x) {
                assert_eq!(r, 0.0, "at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn impulse_response_peaks_at_center() {
        let response = Harris::default().response(&impulse(21, 200.0)).unwrap();
        // Sxx = Syy = 12·A² and Sxy = 0 at the center.
        let s = 12.0 * 200.0 * 200.0;
        assert_eq!(response[(10, 10)], s * s - 0.04 * (2.0 * s) * (2.0 * s));
        let max = response.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        assert_eq!(max, response[(10, 10)]);
    }

    #[test]
    fn threshold_accepts_and_rejects_single_corner() {
        let image = impulse(21, 200.0);
        let peak = Harris::default().response(&image).unwrap()[(10, 10)];
        let below = Harris::new(peak * 0.99).detect(&image).unwrap();
        assert_eq!(below, vec![KeyPoint::new(10, 10)]);
        let above = Harris::new(peak * 1.01).detect(&image).unwrap();
        assert!(above.is_empty());
    }

    #[test]
    fn response_is_zero_where_window_leaves_image() {
        let harris = Harris {
            window_size: 5,
            ..Default::default()
        };
        let response = harris.response(&impulse(9, 255.0)).unwrap();
        for i in 0..9 {
            for edge in [0, 1, 7, 8] {
                assert_eq!(response[(edge, i)], 0.0);
                assert_eq!(response[(i, edge)], 0.0);
            }
        }
    }

    #[test]
    fn even_windows_are_rejected() {
        let harris = Harris {
            nms_window_size: 4,
            ..Default::default()
        };
        assert!(matches!(
            harris.detect(&impulse(9, 1.0)),
            Err(Error::EvenWindow {
                name: "nms_window_size",
                size: 4
            })
        ));
    }

    #[test]
    fn plateau_keeps_every_equal_maximum() {
        let response = array![
            [0., 0., 0., 0.],
            [0., 5., 5., 0.],
            [0., 1., 1., 0.],
            [0., 0., 0., 0.],
        ];
        let keypoints = local_maxima(response.view(), 2.0, 3);
        assert_eq!(keypoints, vec![KeyPoint::new(1, 1), KeyPoint::new(2, 1)]);
    }

    #[test]
    fn maxima_on_the_border_are_rejected() {
        let response = array![[9., 0., 0.], [0., 1., 0.], [0., 0., 0.]];
        assert!(local_maxima(response.view(), 0.5, 3).is_empty());
    }
}
