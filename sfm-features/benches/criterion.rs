use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use sfm_features::{convolution::correlate, GradientKernel, GrayImage, Harris, Matcher, PatchExtractor};

fn noise_image(width: usize, height: usize) -> GrayImage {
    let mut rng = Pcg64::seed_from_u64(0);
    GrayImage(Array2::from_shape_fn((height, width), |_| rng.gen_range(0.0..255.0)))
}

fn bench_correlate(c: &mut Criterion) {
    let image = noise_image(640, 480);
    let kernel = GradientKernel::Sobel.horizontal();
    c.bench_function("correlate_sobel", |b| {
        b.iter(|| correlate(image.ref_array2(), kernel.view()))
    });
}

fn bench_harris(c: &mut Criterion) {
    let image = noise_image(640, 480);
    let harris = Harris::default();
    c.bench_function("harris_detect", |b| b.iter(|| harris.detect(&image).unwrap()));
}

fn bench_match(c: &mut Criterion) {
    let image = noise_image(640, 480);
    let keypoints = Harris::new(1e9).detect(&image).unwrap();
    let descriptors = PatchExtractor::default().extract(&image, &keypoints).unwrap();
    c.bench_function("match_descriptors", |b| {
        b.iter(|| Matcher::default().match_descriptors(&descriptors, &descriptors))
    });
}

criterion_group!(
    name = features;
    config = Criterion::default().sample_size(10);
    targets = bench_correlate, bench_harris, bench_match
);
criterion_main!(features);
