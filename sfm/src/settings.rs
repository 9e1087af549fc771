use eight_point::EightPoint;
use sfm_features::{GradientKernel, Harris, Matcher, PatchExtractor};
use sfm_geom::{LinearTriangulator, PoseSelector};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The settings for two-view reconstruction.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SfmSettings {
    /// The side of the window the Harris structure tensor is summed over
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_harris_window_size")
    )]
    pub harris_window_size: usize,
    /// The Harris sensitivity constant `k`
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_harris_k"))]
    pub harris_k: f64,
    /// The response a corner must exceed
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_harris_threshold")
    )]
    pub harris_threshold: f64,
    /// The side of the non-maximum suppression window
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_nms_window_size")
    )]
    pub nms_window_size: usize,
    /// The kernel used for image gradients
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub gradient_kernel: GradientKernel,
    /// The side of the descriptor patch
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_patch_size"))]
    pub patch_size: usize,
    /// How descriptors are matched between the two images
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub matching: Matcher,
    /// The number of RANSAC samples
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_ransac_iterations")
    )]
    pub ransac_iterations: usize,
    /// The epipolar residual under which a match is an inlier
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_ransac_threshold")
    )]
    pub ransac_threshold: f64,
    /// The convergence threshold of every eigen and singular value decomposition
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_svd_epsilon"))]
    pub svd_epsilon: f64,
    /// The iteration cap of every eigen and singular value decomposition
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_svd_max_iterations")
    )]
    pub svd_max_iterations: usize,
}

impl SfmSettings {
    pub fn harris(&self) -> Harris {
        Harris {
            window_size: self.harris_window_size,
            k: self.harris_k,
            threshold: self.harris_threshold,
            nms_window_size: self.nms_window_size,
            kernel: self.gradient_kernel,
        }
    }

    pub fn patch_extractor(&self) -> PatchExtractor {
        PatchExtractor::new(self.patch_size)
    }

    pub fn eight_point(&self) -> EightPoint {
        EightPoint {
            epsilon: self.svd_epsilon,
            iterations: self.svd_max_iterations,
        }
    }

    pub fn pose_selector(&self) -> PoseSelector {
        PoseSelector::new(
            LinearTriangulator::new()
                .epsilon(self.svd_epsilon)
                .max_iterations(self.svd_max_iterations),
        )
    }
}

impl Default for SfmSettings {
    fn default() -> Self {
        Self {
            harris_window_size: default_harris_window_size(),
            harris_k: default_harris_k(),
            harris_threshold: default_harris_threshold(),
            nms_window_size: default_nms_window_size(),
            gradient_kernel: GradientKernel::default(),
            patch_size: default_patch_size(),
            matching: Matcher::default(),
            ransac_iterations: default_ransac_iterations(),
            ransac_threshold: default_ransac_threshold(),
            svd_epsilon: default_svd_epsilon(),
            svd_max_iterations: default_svd_max_iterations(),
        }
    }
}

fn default_harris_window_size() -> usize {
    3
}

fn default_harris_k() -> f64 {
    0.04
}

fn default_harris_threshold() -> f64 {
    1e6
}

fn default_nms_window_size() -> usize {
    3
}

fn default_patch_size() -> usize {
    9
}

fn default_ransac_iterations() -> usize {
    1000
}

fn default_ransac_threshold() -> f64 {
    0.01
}

fn default_svd_epsilon() -> f64 {
    1e-12
}

fn default_svd_max_iterations() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_follows_settings() {
        let settings = SfmSettings {
            harris_k: 0.03,
            harris_threshold: 5000.0,
            harris_window_size: 5,
            ..Default::default()
        };
        let harris = settings.harris();
        assert_eq!(harris.k, 0.03);
        assert_eq!(harris.threshold, 5000.0);
        assert_eq!(harris.window_size, 5);
        assert_eq!(harris.nms_window_size, 3);
        assert_eq!(settings.patch_extractor(), PatchExtractor::default());
        assert_eq!(settings.eight_point(), EightPoint::default());
    }

    #[cfg(feature = "serde-serialize")]
    #[test]
    fn partial_json_keeps_defaults() {
        let settings: SfmSettings =
            serde_json::from_str(r#"{ "harris_threshold": 5000.0, "matching": { "mutual": 0.7 } }"#).unwrap();
        assert_eq!(settings.harris_threshold, 5000.0);
        assert_eq!(settings.matching, Matcher::Mutual(0.7));
        assert_eq!(settings.ransac_iterations, 1000);
        assert_eq!(settings.gradient_kernel, GradientKernel::Sobel);
    }
}
