use std::sync::Arc;

use crate::errors::Result;
use ndarray::prelude::*;

/// セグメンテーションモデルの抽象化
///
/// The network itself lives outside this crate; pipelines receive an
/// implementation at construction time so tests can substitute a fake.
pub trait SegmentationModel: Send + Sync {
    /// `(1, H, W, 3)` normalized input to `(1, H, W, classes)` probabilities.
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>>;
}

/// 表形式の回帰・分類モデルの抽象化
pub trait TabularPredictor: Send + Sync {
    /// Ordered feature names fixed at training time, if the model carries them.
    fn expected_features(&self) -> Option<&[String]>;

    /// Predict a single scalar from a vector ordered like `expected_features`.
    fn predict(&self, features: &[f64]) -> Result<f64>;
}

impl<T: SegmentationModel + ?Sized> SegmentationModel for Arc<T> {
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        (**self).predict(tensor)
    }
}

impl<T: TabularPredictor + ?Sized> TabularPredictor for Arc<T> {
    fn expected_features(&self) -> Option<&[String]> {
        (**self).expected_features()
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        (**self).predict(features)
    }
}
