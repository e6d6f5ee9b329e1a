use image::{imageops, imageops::FilterType, GrayImage, ImageBuffer, Luma, Pixel, Primitive, Rgb};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use num_traits::AsPrimitive;

use crate::{
    errors::{ImgFeatError, Result},
    imageops_ai::Placement,
    traits::TabularPredictor,
};

/// Class index above which a pixel counts as foreground.
///
/// Comparing an argmax class index against a probability-style threshold only
/// separates background from foreground for two-class models.
pub const FOREGROUND_THRESHOLD: f32 = 0.5;

/// `(1, H, W, 3)` tensor scaled into `0.0..=1.0` from an RGB canvas.
pub fn to_input_tensor<S>(image: &ImageBuffer<Rgb<S>, Vec<S>>) -> Array4<f32>
where
    Rgb<S>: Pixel<Subpixel = S>,
    S: Primitive + AsPrimitive<f32> + 'static,
{
    let max: f32 = S::DEFAULT_MAX_VALUE.as_();
    // (C, H, W) -> (1, H, W, C)
    image
        .as_ndarray3()
        .permuted_axes([1, 2, 0])
        .insert_axis(Axis(0))
        .mapv(|v| v.as_() / max)
}

/// Binary `{0, 255}` mask from a `(1, H, W, classes)` probability tensor:
/// per-pixel argmax over classes (ties resolve to the lowest index), then
/// class index `> 0.5` is foreground.
pub fn derive_mask(probabilities: ArrayView4<f32>) -> Result<GrayImage> {
    let (batch, height, width, classes) = probabilities.dim();
    if batch != 1 || classes == 0 {
        return Err(ImgFeatError::predictor(
            "mask derivation",
            format!(
                "expected output shape (1, H, W, classes), got {:?}",
                probabilities.shape()
            ),
        ));
    }
    if probabilities.iter().any(|p| p.is_nan()) {
        return Err(ImgFeatError::predictor(
            "mask derivation",
            "model output contains NaN",
        ));
    }

    let scores = probabilities.index_axis(Axis(0), 0);
    let mut mask = GrayImage::new(width as u32, height as u32);
    for (y, row) in scores.outer_iter().enumerate() {
        for (x, pixel) in row.outer_iter().enumerate() {
            let class = pixel
                .iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (index, &score)| {
                    if score > best.1 {
                        (index, score)
                    } else {
                        best
                    }
                })
                .0;
            let value = if class as f32 > FOREGROUND_THRESHOLD { 255 } else { 0 };
            mask.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }
    Ok(mask)
}

/// Map a canvas mask back onto the source geometry: crop the placement
/// rectangle and resize with nearest-neighbour sampling so values stay binary.
pub fn restore_mask(mask: &GrayImage, placement: Placement, width: u32, height: u32) -> Result<GrayImage> {
    let Placement {
        x,
        y,
        width: w,
        height: h,
    } = placement;
    if x + w > mask.width() || y + h > mask.height() {
        return Err(ImgFeatError::DimensionMismatch {
            expected: (x + w, y + h),
            actual: mask.dimensions(),
        });
    }

    let cropped = imageops::crop_imm(mask, x, y, w, h).to_image();
    if cropped.dimensions() == (width, height) {
        return Ok(cropped);
    }
    Ok(imageops::resize(&cropped, width, height, FilterType::Nearest))
}

/// Standardization fitted at training time: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Zero scales (constant training features) are treated as 1.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        if mean.len() != scale.len() {
            return Err(ImgFeatError::Configuration {
                message: format!(
                    "scaler has {} means but {} scales",
                    mean.len(),
                    scale.len()
                ),
            });
        }
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();
        Ok(Self { mean, scale })
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        check_width("scaler transform", self.len(), features.len())?;
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect())
    }
}

/// Ordinary linear model `intercept + Σ coefficient * x`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegressor {
    coefficients: Vec<f64>,
    intercept: f64,
    feature_names: Option<Vec<String>>,
}

impl LinearRegressor {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            feature_names: None,
        }
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self> {
        check_width("feature names", self.coefficients.len(), names.len())?;
        self.feature_names = Some(names);
        Ok(self)
    }
}

impl TabularPredictor for LinearRegressor {
    fn expected_features(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        check_width("linear prediction", self.coefficients.len(), features.len())?;
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>())
    }
}

/// Applies a fitted scaler before delegating to the wrapped predictor.
#[derive(Debug, Clone)]
pub struct ScaledPredictor<P> {
    scaler: StandardScaler,
    inner: P,
}

impl<P: TabularPredictor> ScaledPredictor<P> {
    pub fn new(scaler: StandardScaler, inner: P) -> Self {
        Self { scaler, inner }
    }
}

impl<P: TabularPredictor> TabularPredictor for ScaledPredictor<P> {
    fn expected_features(&self) -> Option<&[String]> {
        self.inner.expected_features()
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        let scaled = self.scaler.transform(features)?;
        self.inner.predict(&scaled)
    }
}

fn check_width(operation: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ImgFeatError::predictor(
            operation,
            format!("expected {} features, got {}", expected, actual),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_input_tensor_layout() {
        let image = RgbImage::from_fn(4, 2, |x, y| Rgb([x as u8 * 50, y as u8 * 255, 51]));
        let tensor = to_input_tensor(&image);

        assert_eq!(tensor.shape(), &[1, 2, 4, 3]);
        assert_eq!(tensor[[0, 0, 3, 0]], 150.0 / 255.0);
        assert_eq!(tensor[[0, 1, 0, 1]], 1.0);
        assert_eq!(tensor[[0, 1, 2, 2]], 0.2);
    }

    #[test]
    fn test_derive_mask_two_classes() -> Result<()> {
        // pixel (0, 0) background, (1, 0) foreground
        let probs = Array4::from_shape_vec((1, 1, 2, 2), vec![0.9, 0.1, 0.3, 0.7])?;
        let mask = derive_mask(probs.view())?;
        assert_eq!(mask.dimensions(), (2, 1));
        assert_eq!(mask.into_raw(), vec![0, 255]);
        Ok(())
    }

    #[test]
    fn test_derive_mask_tie_is_background() -> Result<()> {
        let probs = Array4::from_elem((1, 3, 3, 2), 0.5f32);
        let mask = derive_mask(probs.view())?;
        assert!(mask.pixels().all(|p| p[0] == 0));
        Ok(())
    }

    #[test]
    fn test_derive_mask_rejects_batches() {
        let probs = Array4::<f32>::zeros((2, 4, 4, 2));
        assert!(matches!(
            derive_mask(probs.view()),
            Err(ImgFeatError::Predictor { .. })
        ));
    }

    #[test]
    fn test_restore_mask() -> Result<()> {
        let mut canvas = GrayImage::new(8, 8);
        for y in 2..6 {
            for x in 0..8 {
                canvas.put_pixel(x, y, Luma([255]));
            }
        }
        let placement = Placement {
            x: 0,
            y: 2,
            width: 8,
            height: 4,
        };
        let restored = restore_mask(&canvas, placement, 16, 8)?;
        assert_eq!(restored.dimensions(), (16, 8));
        assert!(restored.pixels().all(|p| p[0] == 255));
        Ok(())
    }

    #[test]
    fn test_restore_mask_out_of_bounds() {
        let placement = Placement {
            x: 4,
            y: 0,
            width: 8,
            height: 8,
        };
        assert!(matches!(
            restore_mask(&GrayImage::new(8, 8), placement, 8, 8),
            Err(ImgFeatError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_scaled_linear_prediction() -> Result<()> {
        let scaler = StandardScaler::new(vec![1.0, 10.0], vec![2.0, 0.0])?;
        let model = LinearRegressor::new(vec![3.0, -1.0], 0.5)
            .with_feature_names(vec!["a".to_string(), "b".to_string()])?;
        let predictor = ScaledPredictor::new(scaler, model);

        // (5 - 1) / 2 = 2, (12 - 10) / 1 = 2 -> 0.5 + 6 - 2
        assert_eq!(predictor.predict(&[5.0, 12.0])?, 4.5);
        assert_eq!(predictor.expected_features().map(<[String]>::len), Some(2));
        Ok(())
    }

    #[test]
    fn test_width_mismatch_is_predictor_error() {
        let model = LinearRegressor::new(vec![1.0, 1.0], 0.0);
        assert!(matches!(
            model.predict(&[1.0]),
            Err(ImgFeatError::Predictor { .. })
        ));
    }
}
