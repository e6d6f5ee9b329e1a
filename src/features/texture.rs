//! Gray-level co-occurrence statistics and uniform LBP histograms.
//!
//! Both follow scikit-image's `graycomatrix`/`graycoprops` and
//! `local_binary_pattern(P=8, R=1, method="uniform")`, which the tabular
//! models were trained against.

use std::f64::consts::PI;

use image::{GrayImage, Luma};
use ndarray::prelude::*;
use tracing::debug;

use super::FeatureMap;
use crate::errors::{ImgFeatError, Result};

pub const GLCM_LEVELS: usize = 256;
pub const LBP_POINTS: usize = 8;
pub const LBP_BINS: usize = LBP_POINTS + 2;

/// Co-occurrence statistics, in emission order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlcmStats {
    pub contrast: f64,
    pub dissimilarity: f64,
    pub homogeneity: f64,
    pub energy: f64,
    pub correlation: f64,
    pub asm: f64,
}

impl GlcmStats {
    pub fn named(&self) -> [(&'static str, f64); 6] {
        [
            ("GLCM_contrast", self.contrast),
            ("GLCM_dissimilarity", self.dissimilarity),
            ("GLCM_homogeneity", self.homogeneity),
            ("GLCM_energy", self.energy),
            ("GLCM_correlation", self.correlation),
            ("GLCM_ASM", self.asm),
        ]
    }
}

/// Symmetric, normalized co-occurrence matrix for horizontal neighbours at
/// distance 1. An image without pairs (width 1) yields an all-zero matrix.
pub fn co_occurrence(image: &GrayImage) -> Array2<f64> {
    let mut counts = Array2::<u64>::zeros((GLCM_LEVELS, GLCM_LEVELS));
    let width = image.width() as usize;
    if width > 1 {
        for row in image.as_raw().chunks_exact(width) {
            for pair in row.windows(2) {
                counts[[usize::from(pair[0]), usize::from(pair[1])]] += 1;
            }
        }
    }

    let symmetric = &counts + &counts.t();
    let total = match symmetric.sum() {
        0 => 1.0,
        n => n as f64,
    };
    symmetric.mapv(|count| count as f64 / total)
}

pub fn glcm_stats(glcm: &Array2<f64>) -> GlcmStats {
    let (mut mean_i, mut mean_j) = (0.0, 0.0);
    for ((i, j), &p) in glcm.indexed_iter() {
        mean_i += i as f64 * p;
        mean_j += j as f64 * p;
    }

    let mut contrast = 0.0;
    let mut dissimilarity = 0.0;
    let mut homogeneity = 0.0;
    let mut asm = 0.0;
    let (mut var_i, mut var_j, mut covariance) = (0.0, 0.0, 0.0);
    for ((i, j), &p) in glcm.indexed_iter() {
        if p == 0.0 {
            continue;
        }
        let diff = i as f64 - j as f64;
        contrast += p * diff * diff;
        dissimilarity += p * diff.abs();
        homogeneity += p / (1.0 + diff * diff);
        asm += p * p;

        let (di, dj) = (i as f64 - mean_i, j as f64 - mean_j);
        var_i += p * di * di;
        var_j += p * dj * dj;
        covariance += p * di * dj;
    }

    let (std_i, std_j) = (var_i.sqrt(), var_j.sqrt());
    // constant images have no spread; correlation is defined as 1
    let correlation = if std_i < 1e-15 || std_j < 1e-15 {
        1.0
    } else {
        covariance / (std_i * std_j)
    };

    GlcmStats {
        contrast,
        dissimilarity,
        homogeneity,
        energy: asm.sqrt(),
        correlation,
        asm,
    }
}

/// Circular sampling offsets `(row, col)` for radius 1, rounded half to even
/// at 5 decimals.
fn sample_offsets() -> [(f64, f64); LBP_POINTS] {
    let round5 = |v: f64| (v * 1e5).round_ties_even() / 1e5;
    std::array::from_fn(|k| {
        let angle = 2.0 * PI * k as f64 / LBP_POINTS as f64;
        (round5(-angle.sin()), round5(angle.cos()))
    })
}

/// Bilinear sample with zero outside the image.
fn bilinear(image: &GrayImage, r: f64, c: f64) -> f64 {
    let (height, width) = (i64::from(image.height()), i64::from(image.width()));
    let at = |r: f64, c: f64| -> f64 {
        let (r, c) = (r as i64, c as i64);
        if r < 0 || c < 0 || r >= height || c >= width {
            0.0
        } else {
            let Luma([v]) = *image.get_pixel(c as u32, r as u32);
            f64::from(v)
        }
    };

    let (min_r, max_r) = (r.floor(), r.ceil());
    let (min_c, max_c) = (c.floor(), c.ceil());
    let (dr, dc) = (r - min_r, c - min_c);

    let top = (1.0 - dc) * at(min_r, min_c) + dc * at(min_r, max_c);
    let bottom = (1.0 - dc) * at(max_r, min_c) + dc * at(max_r, max_c);
    (1.0 - dr) * top + dr * bottom
}

/// Uniform LBP code per pixel: the number of set bits for patterns with at
/// most two transitions, `LBP_POINTS + 1` otherwise.
pub fn lbp_codes(image: &GrayImage) -> Array2<u8> {
    let offsets = sample_offsets();
    let (width, height) = image.dimensions();

    Array2::from_shape_fn((height as usize, width as usize), |(r, c)| {
        let Luma([center]) = *image.get_pixel(c as u32, r as u32);
        let center = f64::from(center);

        let mut bits = [false; LBP_POINTS];
        for (bit, &(dr, dc)) in bits.iter_mut().zip(&offsets) {
            *bit = bilinear(image, r as f64 + dr, c as f64 + dc) - center >= 0.0;
        }

        // transitions are counted without wrapping around
        let changes = bits.windows(2).filter(|pair| pair[0] != pair[1]).count();
        if changes <= 2 {
            bits.iter().filter(|&&bit| bit).count() as u8
        } else {
            (LBP_POINTS + 1) as u8
        }
    })
}

pub fn lbp_histogram(image: &GrayImage) -> [u64; LBP_BINS] {
    let mut histogram = [0u64; LBP_BINS];
    for &code in lbp_codes(image).iter() {
        histogram[usize::from(code)] += 1;
    }
    histogram
}

/// Texture features for one grayscale image: six `GLCM_*` statistics
/// followed by `LBP_0`..`LBP_9` bin counts.
pub fn extract_texture_features(image: &GrayImage) -> Result<FeatureMap> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ImgFeatError::invalid_input(
            "texture feature extraction",
            "grayscale image has no pixels",
        ));
    }

    let stats = glcm_stats(&co_occurrence(image));
    let histogram = lbp_histogram(image);

    let mut features = FeatureMap::with_capacity(6 + LBP_BINS);
    for (name, value) in stats.named() {
        features.insert(name, value);
    }
    for (bin, &count) in histogram.iter().enumerate() {
        features.insert(format!("LBP_{}", bin), count as f64);
    }

    debug!(
        width = image.width(),
        height = image.height(),
        homogeneity = stats.homogeneity,
        "extracted texture features"
    );
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_sample_offsets() {
        let offsets = sample_offsets();
        assert_eq!(offsets[0], (0.0, 1.0));
        assert_eq!(offsets[1], (-0.70711, 0.70711));
        assert_eq!(offsets[2], (-1.0, 0.0));
        assert_eq!(offsets[4], (0.0, -1.0));
        assert_eq!(offsets[6], (1.0, 0.0));
    }

    #[test]
    fn test_uniform_image_glcm() {
        let image = GrayImage::from_pixel(12, 7, Luma([93]));
        let glcm = co_occurrence(&image);
        assert_close(glcm.sum(), 1.0);
        assert_close(glcm[[93, 93]], 1.0);

        let stats = glcm_stats(&glcm);
        assert_close(stats.homogeneity, 1.0);
        assert_close(stats.energy, 1.0);
        assert_close(stats.asm, 1.0);
        assert_close(stats.contrast, 0.0);
        assert_close(stats.correlation, 1.0);
    }

    #[test]
    fn test_two_level_glcm() {
        let image = GrayImage::from_raw(2, 1, vec![0, 1]).unwrap();
        let stats = glcm_stats(&co_occurrence(&image));
        assert_close(stats.contrast, 1.0);
        assert_close(stats.dissimilarity, 1.0);
        assert_close(stats.homogeneity, 0.5);
        assert_close(stats.asm, 0.5);
        assert_close(stats.energy, 0.5f64.sqrt());
        assert_close(stats.correlation, -1.0);
    }

    #[test]
    fn test_single_column_has_no_pairs() {
        let image = GrayImage::from_raw(1, 3, vec![10, 20, 30]).unwrap();
        let stats = glcm_stats(&co_occurrence(&image));
        assert_eq!(stats.homogeneity, 0.0);
        assert_eq!(stats.energy, 0.0);
        assert_eq!(stats.correlation, 1.0);
    }

    #[test]
    fn test_uniform_black_lbp_single_bin() {
        let image = GrayImage::new(9, 6);
        let histogram = lbp_histogram(&image);
        assert_eq!(histogram[8], 54);
        assert_eq!(histogram.iter().sum::<u64>(), 54);
    }

    #[test]
    fn test_uniform_gray_lbp_interior() {
        let image = GrayImage::from_pixel(5, 4, Luma([100]));
        let codes = lbp_codes(&image);
        for ((r, c), &code) in codes.indexed_iter() {
            let interior = r > 0 && r < 3 && c > 0 && c < 4;
            assert_eq!(code == 8, interior, "pixel ({}, {}) code {}", r, c, code);
        }
    }

    #[test]
    fn test_lbp_dark_and_bright_centers() {
        let mut pit = GrayImage::from_pixel(3, 3, Luma([50]));
        pit.put_pixel(1, 1, Luma([10]));
        assert_eq!(lbp_codes(&pit)[[1, 1]], 8);

        let mut peak = GrayImage::from_pixel(3, 3, Luma([10]));
        peak.put_pixel(1, 1, Luma([50]));
        assert_eq!(lbp_codes(&peak)[[1, 1]], 0);
    }

    #[test]
    fn test_lbp_non_uniform_pattern() {
        // alternating bright/dark neighbours around a mid-gray center
        let image = GrayImage::from_raw(3, 3, vec![0, 255, 0, 255, 128, 255, 0, 255, 0]).unwrap();
        assert_eq!(lbp_codes(&image)[[1, 1]], 9);
    }

    #[test]
    fn test_lbp_codes_asymmetric_patch() {
        // diagonal samples land between unequal neighbours, so the
        // interpolation weights decide whether a bit is set
        let image = GrayImage::from_raw(3, 3, vec![2, 3, 0, 1, 2, 0, 1, 1, 3]).unwrap();
        let codes = lbp_codes(&image);
        assert_eq!(
            codes,
            ndarray::array![[2, 0, 8], [5, 1, 8], [3, 5, 0]]
        );
    }

    #[test]
    fn test_feature_names() -> Result<()> {
        let image = GrayImage::from_fn(8, 8, |x, y| Luma([(x * 31 + y * 7) as u8]));
        let features = extract_texture_features(&image)?;
        let names: Vec<_> = features.names().collect();

        assert_eq!(features.len(), 16);
        assert_eq!(names[0], "GLCM_contrast");
        assert_eq!(names[5], "GLCM_ASM");
        assert_eq!(names[6], "LBP_0");
        assert_eq!(names[15], "LBP_9");
        let total: f64 = (0..10)
            .filter_map(|bin| features.get(&format!("LBP_{}", bin)))
            .sum();
        assert_eq!(total, 64.0);
        Ok(())
    }

    #[test]
    fn test_empty_image_rejected() {
        assert!(matches!(
            extract_texture_features(&GrayImage::new(0, 3)),
            Err(ImgFeatError::InvalidInput { .. })
        ));
    }
}
