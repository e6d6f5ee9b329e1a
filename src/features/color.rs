//! Per-channel colour statistics across RGB, L\*a\*b\*, HSV and grayscale.

use image::{DynamicImage, GrayImage, RgbImage};
use tracing::debug;

use super::FeatureMap;
use crate::errors::{ImgFeatError, Result};
use crate::imageops_ai::ConvertColor;

/// Representation tag and channel labels, in emission order.
pub const COLOR_SPACES: [(&str, &[&str]); 4] = [
    ("RGB", &["R", "G", "B"]),
    ("LAB", &["L", "A", "B"]),
    ("HSV", &["H", "S", "V"]),
    ("GRAY", &["Gray"]),
];

/// Exact running sums for one 8-bit channel.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelStats {
    count: u64,
    sum: u64,
    sum_sq: u64,
}

impl ChannelStats {
    fn push(&mut self, value: u8) {
        let value = u64::from(value);
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    fn mean(&self) -> f64 {
        self.sum as f64 / self.count as f64
    }

    /// Population standard deviation. The variance numerator
    /// `n * Σx² - (Σx)²` is computed in integers, so it is never negative and
    /// is exactly zero for a constant channel.
    fn std(&self) -> f64 {
        let n = u128::from(self.count);
        let sum = u128::from(self.sum);
        let numerator = n * u128::from(self.sum_sq) - sum * sum;
        (numerator as f64).sqrt() / self.count as f64
    }
}

fn channel_stats<'a>(samples: impl Iterator<Item = &'a [u8]>, channels: usize) -> Vec<ChannelStats> {
    let mut stats = vec![ChannelStats::default(); channels];
    for pixel in samples {
        for (stat, &value) in stats.iter_mut().zip(pixel) {
            stat.push(value);
        }
    }
    stats
}

fn rgb_stats(image: &RgbImage) -> Vec<ChannelStats> {
    channel_stats(image.as_raw().chunks_exact(3), 3)
}

fn gray_stats(image: &GrayImage) -> Vec<ChannelStats> {
    channel_stats(image.as_raw().chunks_exact(1), 1)
}

/// Colour features for one image: `Mean_`/`Std_` per channel of every
/// representation in [`COLOR_SPACES`], followed by the derived chrominance
/// scalars `Yellow`, `Cyan`, `Magenta`, `Brightness` and `Chroma`.
///
/// Gray inputs are expanded to RGB and alpha is discarded.
pub fn extract_color_features(image: &DynamicImage) -> Result<FeatureMap> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ImgFeatError::invalid_input(
            "color feature extraction",
            "image has no pixels",
        ));
    }

    let rgb = image.to_rgb8();
    let per_space = [
        rgb_stats(&rgb),
        rgb_stats(&rgb.to_lab()),
        rgb_stats(&rgb.to_hsv()),
        gray_stats(&rgb.to_gray()),
    ];

    let mut features = FeatureMap::with_capacity(25);
    for ((space, labels), stats) in COLOR_SPACES.iter().zip(&per_space) {
        for (label, stat) in labels.iter().zip(stats) {
            features.insert(format!("Mean_{}_{}", space, label), stat.mean());
            features.insert(format!("Std_{}_{}", space, label), stat.std());
        }
    }

    let [r, g, b] = [0, 1, 2].map(|i| per_space[0][i].mean());
    features.insert("Yellow", (r + g - b) / 2.0);
    features.insert("Cyan", (g + b - r) / 2.0);
    features.insert("Magenta", r + b);
    features.insert("Brightness", (r + g + b) / 3.0);
    features.insert("Chroma", r.max(g).max(b) - r.min(g).min(b));

    debug!(
        width = rgb.width(),
        height = rgb.height(),
        count = features.len(),
        "extracted color features"
    );
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, Rgba, RgbaImage};

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("feature present");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_feature_names_and_order() -> Result<()> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])));
        let features = extract_color_features(&image)?;
        let names: Vec<_> = features.names().collect();

        assert_eq!(features.len(), 25);
        assert_eq!(
            &names[..4],
            &["Mean_RGB_R", "Std_RGB_R", "Mean_RGB_G", "Std_RGB_G"]
        );
        assert!(names.contains(&"Mean_LAB_A"));
        assert!(names.contains(&"Std_HSV_V"));
        assert_eq!(names[19], "Std_GRAY_Gray");
        assert_eq!(
            &names[20..],
            &["Yellow", "Cyan", "Magenta", "Brightness", "Chroma"]
        );
        Ok(())
    }

    #[test]
    fn test_uniform_image_has_zero_std() -> Result<()> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(17, 9, Rgb([37, 141, 222])));
        let features = extract_color_features(&image)?;
        for (name, value) in features.iter().filter(|(n, _)| n.starts_with("Std_")) {
            assert_eq!(value, 0.0, "{}", name);
        }
        Ok(())
    }

    #[test]
    fn test_solid_red_chrominance() -> Result<()> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 0, 0])));
        let features = extract_color_features(&image)?;

        assert_close(features.get("Yellow"), 127.5);
        assert_close(features.get("Cyan"), -127.5);
        assert_close(features.get("Magenta"), 255.0);
        assert_close(features.get("Brightness"), 85.0);
        assert_close(features.get("Chroma"), 255.0);
        assert_close(features.get("Mean_HSV_S"), 255.0);
        assert_close(features.get("Mean_GRAY_Gray"), 76.0);
        Ok(())
    }

    #[test]
    fn test_population_std() -> Result<()> {
        // half black, half white: mean 127.5, population std 127.5
        let image = DynamicImage::ImageLuma8(GrayImage::from_fn(4, 2, |x, _| {
            Luma([if x < 2 { 0 } else { 255 }])
        }));
        let features = extract_color_features(&image)?;
        assert_close(features.get("Mean_RGB_G"), 127.5);
        assert_close(features.get("Std_RGB_G"), 127.5);
        assert_close(features.get("Std_GRAY_Gray"), 127.5);
        Ok(())
    }

    #[test]
    fn test_alpha_is_ignored() -> Result<()> {
        let opaque = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([9, 8, 7, 255])));
        let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([9, 8, 7, 0])));
        assert_eq!(extract_color_features(&opaque)?, extract_color_features(&clear)?);
        Ok(())
    }

    #[test]
    fn test_empty_image_rejected() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(matches!(
            extract_color_features(&image),
            Err(ImgFeatError::InvalidInput { .. })
        ));
    }
}
