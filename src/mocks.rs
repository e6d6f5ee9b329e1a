use crate::errors::{ImgFeatError, Result};
use crate::traits::{SegmentationModel, TabularPredictor};
use ndarray::prelude::*;

/// テスト用のモックセグメンテーションモデル
///
/// Two-class output: a pixel is foreground when its mean normalized
/// intensity is above `threshold`.
#[derive(Debug, Clone)]
pub struct MockSegmentationModel {
    pub threshold: f32,
}

impl MockSegmentationModel {
    pub const fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Default for MockSegmentationModel {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl SegmentationModel for MockSegmentationModel {
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (batch, height, width, _) = tensor.dim();
        let intensity = tensor.mean_axis(Axis(3)).ok_or_else(|| {
            ImgFeatError::predictor("mock segmentation", "input tensor has no channels")
        })?;

        let mut output = Array4::<f32>::zeros((batch, height, width, 2));
        for ((b, y, x), &value) in intensity.indexed_iter() {
            let foreground = if value > self.threshold { 0.9 } else { 0.1 };
            output[[b, y, x, 0]] = 1.0 - foreground;
            output[[b, y, x, 1]] = foreground;
        }
        Ok(output)
    }
}

/// テスト用のモック表形式モデル：特徴量の重み付き和を返す
#[derive(Debug, Clone, Default)]
pub struct MockTabularPredictor {
    pub feature_names: Option<Vec<String>>,
}

impl MockTabularPredictor {
    pub fn with_schema<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            feature_names: Some(names.into_iter().map(Into::into).collect()),
        }
    }
}

impl TabularPredictor for MockTabularPredictor {
    fn expected_features(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        Ok(features
            .iter()
            .enumerate()
            .map(|(i, v)| (i + 1) as f64 * v)
            .sum())
    }
}

/// Always fails, standing in for a missing or unloaded model.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableModel;

impl SegmentationModel for UnavailableModel {
    fn predict(&self, _tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        Err(ImgFeatError::predictor("segmentation", "model is not loaded"))
    }
}

impl TabularPredictor for UnavailableModel {
    fn expected_features(&self) -> Option<&[String]> {
        None
    }

    fn predict(&self, _features: &[f64]) -> Result<f64> {
        Err(ImgFeatError::predictor("tabular prediction", "model is not loaded"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_segmentation_shape() -> Result<()> {
        let mock = MockSegmentationModel::default();
        let input = Array4::<f32>::ones((1, 8, 6, 3));

        let output = mock.predict(input.view())?;
        assert_eq!(output.shape(), &[1, 8, 6, 2]);
        assert!(output.iter().step_by(2).all(|&bg| (bg - 0.1).abs() < 1e-6));
        Ok(())
    }

    #[test]
    fn test_mock_tabular_weights() -> Result<()> {
        let mock = MockTabularPredictor::with_schema(["a", "b"]);
        assert_eq!(mock.expected_features().map(<[String]>::len), Some(2));
        assert_eq!(mock.predict(&[1.0, 2.0])?, 5.0);
        Ok(())
    }

    #[test]
    fn test_unavailable_model_fails() {
        let input = Array4::<f32>::zeros((1, 2, 2, 3));
        assert!(SegmentationModel::predict(&UnavailableModel, input.view()).is_err());
        assert!(TabularPredictor::predict(&UnavailableModel, &[1.0]).is_err());
    }
}
