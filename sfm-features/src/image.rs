use crate::Error;
use derive_more::{Deref, DerefMut};
use image::DynamicImage;
use log::*;
use ndarray::{Array2, Array3, ArrayView2};

/// A grayscale image stored row-major as `f64` intensities.
///
/// Intensities keep the scale of the source (0 to 255 for 8-bit images), since the
/// detector thresholds are expressed in that scale.
#[derive(Debug, Clone, PartialEq, Deref, DerefMut)]
pub struct GrayImage(pub Array2<f64>);

impl GrayImage {
    /// Convert any image to grayscale using the image crate's luma conversion.
    pub fn from_dynamic(input_image: &DynamicImage) -> Self {
        let gray = input_image.to_luma8();
        debug!("Loaded a {} x {} grayscale image", gray.width(), gray.height());
        Self(Array2::from_shape_fn(
            (gray.height() as usize, gray.width() as usize),
            |(y, x)| f64::from(gray.get_pixel(x as u32, y as u32)[0]),
        ))
    }

    /// A black image.
    pub fn new(width: usize, height: usize) -> Self {
        Self(Array2::zeros((height, width)))
    }

    pub fn ref_array2(&self) -> ArrayView2<f64> {
        self.0.view()
    }

    pub fn width(&self) -> usize {
        self.0.ncols()
    }

    pub fn height(&self) -> usize {
        self.0.nrows()
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.0[(y, x)]
    }

    pub fn put(&mut self, x: usize, y: usize, pixel_value: f64) {
        self.0[(y, x)] = pixel_value;
    }
}

/// An 8-bit RGB image stored as `height x width x 3`.
#[derive(Debug, Clone, PartialEq, Deref, DerefMut)]
pub struct ColorImage(pub Array3<u8>);

impl ColorImage {
    pub fn from_dynamic(input_image: &DynamicImage) -> Self {
        let rgb = input_image.to_rgb8();
        Self(Array3::from_shape_fn(
            (rgb.height() as usize, rgb.width() as usize, 3),
            |(y, x, c)| rgb.get_pixel(x as u32, y as u32)[c],
        ))
    }

    /// A color image with every pixel set to `rgb`.
    pub fn from_pixel(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        Self(Array3::from_shape_fn((height, width, 3), |(_, _, c)| rgb[c]))
    }

    pub fn width(&self) -> usize {
        self.0.dim().1
    }

    pub fn height(&self) -> usize {
        self.0.dim().0
    }

    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        [self.0[(y, x, 0)], self.0[(y, x, 1)], self.0[(y, x, 2)]]
    }

    /// The color at a pixel with each channel scaled into `[0, 1]`.
    pub fn normalized_rgb(&self, x: usize, y: usize) -> [f64; 3] {
        self.get(x, y).map(|channel| f64::from(channel) / 255.0)
    }
}

/// One image of a sequence: the grayscale image the features come from and the color image
/// used to tag reconstructed points.
///
/// Both images always have the same dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    gray: GrayImage,
    color: ColorImage,
}

impl Frame {
    /// Pairs a grayscale and a color image, which must have the same dimensions.
    pub fn new(gray: GrayImage, color: ColorImage) -> Result<Self, Error> {
        let gray_dims = (gray.width(), gray.height());
        let color_dims = (color.width(), color.height());
        if gray_dims != color_dims {
            return Err(Error::DimensionMismatch {
                gray: gray_dims,
                color: color_dims,
            });
        }
        Ok(Self { gray, color })
    }

    /// Builds both images of the frame from a decoded image.
    pub fn from_dynamic(input_image: &DynamicImage) -> Self {
        Self {
            gray: GrayImage::from_dynamic(input_image),
            color: ColorImage::from_dynamic(input_image),
        }
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn color(&self) -> &ColorImage {
        &self.color
    }

    pub fn width(&self) -> usize {
        self.gray.width()
    }

    pub fn height(&self) -> usize {
        self.gray.height()
    }
}
