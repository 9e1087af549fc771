use ndarray::{Array2, ArrayView2};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Zero-padded 2D correlation of `image` with `kernel`.
///
/// The output has the shape of the input. The kernel is not flipped, so
///
/// ```text
/// output[i, j] = Σ kernel[ky, kx] · image[i + ky - kh/2, j + kx - kw/2]
/// ```
///
/// where samples outside the image read as `0`.
///
/// Rows of the output are independent and are computed in parallel with the `rayon` feature.
///
/// ```
/// use ndarray::array;
/// use sfm_features::convolution::correlate;
///
/// let image = array![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]];
/// let kernel = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
/// // Correlating an impulse yields the kernel rotated by 180 degrees.
/// let expected = array![[9.0, 8.0, 7.0], [6.0, 5.0, 4.0], [3.0, 2.0, 1.0]];
/// assert_eq!(correlate(image.view(), kernel.view()), expected);
/// ```
pub fn correlate(image: ArrayView2<f64>, kernel: ArrayView2<f64>) -> Array2<f64> {
    let (height, width) = image.dim();
    let (kernel_height, kernel_width) = kernel.dim();
    if width == 0 || height == 0 {
        return Array2::zeros((height, width));
    }
    let pad_y = kernel_height / 2;
    let pad_x = kernel_width / 2;

    let process_row = |(i, row_out): (usize, &mut [f64])| {
        for (j, out) in row_out.iter_mut().enumerate() {
            let mut sum = 0.0;
            for ((ky, kx), &weight) in kernel.indexed_iter() {
                // Offsets are applied in signed space since the window may start before the image.
                let y = (i + ky) as isize - pad_y as isize;
                let x = (j + kx) as isize - pad_x as isize;
                if y < 0 || x < 0 || y >= height as isize || x >= width as isize {
                    continue;
                }
                sum += weight * image[(y as usize, x as usize)];
            }
            *out = sum;
        }
    };

    let mut output = vec![0.0; width * height];
    #[cfg(not(feature = "rayon"))]
    output
        .chunks_exact_mut(width)
        .enumerate()
        .for_each(process_row);
    #[cfg(feature = "rayon")]
    output
        .par_chunks_exact_mut(width)
        .enumerate()
        .for_each(process_row);
    Array2::from_shape_vec((height, width), output).expect("output has one value per pixel")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;

    fn random_image(rng: &mut Pcg64, height: usize, width: usize) -> Array2<f64> {
        Array2::from_shape_fn((height, width), |_| rng.gen_range(0.0..255.0))
    }

    #[test]
    fn zero_kernel_gives_zero_output() {
        let mut rng = Pcg64::seed_from_u64(0);
        let image = random_image(&mut rng, 7, 11);
        let kernel = Array2::zeros((3, 3));
        let output = correlate(image.view(), kernel.view());
        assert_eq!(output.dim(), image.dim());
        assert!(output.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn correlation_is_linear() {
        let mut rng = Pcg64::seed_from_u64(1);
        let a = random_image(&mut rng, 9, 13);
        let b = random_image(&mut rng, 9, 13);
        let kernel = array![[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
        let (sa, sb) = (0.7, -2.5);
        let combined = &a * sa + &b * sb;
        let lhs = correlate(combined.view(), kernel.view());
        let rhs = correlate(a.view(), kernel.view()) * sa + correlate(b.view(), kernel.view()) * sb;
        for (l, r) in lhs.iter().zip(rhs.iter()) {
            assert_relative_eq!(l, r, epsilon = 1e-9);
        }
    }

    #[test]
    fn borders_read_as_zero() {
        let image = Array2::from_elem((3, 4), 1.0);
        let kernel = Array2::from_elem((3, 3), 1.0);
        let output = correlate(image.view(), kernel.view());
        assert_eq!(output[(0, 0)], 4.0);
        assert_eq!(output[(0, 1)], 6.0);
        assert_eq!(output[(1, 1)], 9.0);
        assert_eq!(output[(2, 3)], 4.0);
    }

    #[test]
    fn even_width_kernel_looks_backwards() {
        let image = array![[1.0, 4.0, 9.0]];
        let kernel = array![[-1.0, 1.0]];
        let output = correlate(image.view(), kernel.view());
        assert_eq!(output, array![[1.0, 3.0, 5.0]]);
    }
}
