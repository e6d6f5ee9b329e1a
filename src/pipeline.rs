use image::{DynamicImage, GrayImage, RgbaImage};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    config::PipelineConfig,
    errors::{ImgFeatError, Result},
    features::{self, FeatureMap},
    imageops_ai::{composite_alpha, normalize_with_placement, ConvertColor, Placement},
    model::{derive_mask, restore_mask, to_input_tensor},
    traits::{SegmentationModel, TabularPredictor},
};

/// Background removal: normalize, classify pixels, composite the mask as alpha.
pub struct SegmentationPipeline<M: SegmentationModel> {
    model: M,
    config: PipelineConfig,
}

impl<M: SegmentationModel> SegmentationPipeline<M> {
    pub const fn new(model: M, config: PipelineConfig) -> Self {
        Self { model, config }
    }

    /// Binary mask on the `target_size` canvas plus the canvas itself.
    fn canvas_mask(&self, image: &DynamicImage) -> Result<(DynamicImage, GrayImage, Placement)> {
        let target_size = self.config.target_size;
        let (canvas, placement) =
            normalize_with_placement(&DynamicImage::ImageRgb8(image.to_rgb8()), target_size)?;
        let tensor = to_input_tensor(&canvas.to_rgb8());
        debug!(target_size, ?placement, "running segmentation model");

        let probabilities = self.model.predict(tensor.view())?;
        let mask = derive_mask(probabilities.view())?;
        if mask.dimensions() != (target_size, target_size) {
            return Err(ImgFeatError::DimensionMismatch {
                expected: (target_size, target_size),
                actual: mask.dimensions(),
            });
        }
        Ok((canvas, mask, placement))
    }

    /// Mask predicted for `image`, restored to the image's own size.
    pub fn mask(&self, image: &DynamicImage) -> Result<GrayImage> {
        let (_, mask, placement) = self.canvas_mask(image)?;
        restore_mask(&mask, placement, image.width(), image.height())
    }

    /// RGBA copy of `image` with background pixels made transparent.
    pub fn segment(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let mask = self.mask(image)?;
        composite_alpha(image, &mask)
    }

    /// Composite on the padded canvas, exactly what the model saw.
    pub fn segment_canvas(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let (canvas, mask, _) = self.canvas_mask(image)?;
        composite_alpha(&canvas, &mask)
    }

    /// Encoded bytes in, PNG bytes out.
    pub fn segment_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let image = crate::decode_image(bytes)?;
        let segmented = self.segment(&image)?;
        info!(
            width = segmented.width(),
            height = segmented.height(),
            "segmentation finished"
        );
        crate::encode_png(&DynamicImage::ImageRgba8(segmented))
    }
}

/// Scalar prediction plus the features actually handed to the predictor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    #[serde(rename = "prediction")]
    pub value: f64,
    pub features: FeatureMap,
}

/// Feature-based prediction: color and texture extraction, schema matching,
/// then one call into the tabular predictor.
pub struct PredictionPipeline<P: TabularPredictor> {
    predictor: P,
    config: PipelineConfig,
}

impl<P: TabularPredictor> PredictionPipeline<P> {
    pub const fn new(predictor: P, config: PipelineConfig) -> Self {
        Self { predictor, config }
    }

    pub fn predict(&self, image: &DynamicImage) -> Result<Prediction> {
        let merged = extract_features(image)?;
        let features = match self.predictor.expected_features() {
            Some(schema) => features::match_schema(&merged, schema, self.config.schema_policy)?,
            None => merged,
        };
        features.check_finite()?;

        let vector: Vec<f64> = features.values().collect();
        let value = self.predictor.predict(&vector)?;
        if !value.is_finite() {
            return Err(ImgFeatError::predictor(
                "tabular prediction",
                format!("predictor returned non-finite value {}", value),
            ));
        }

        info!(value, features = features.len(), "prediction finished");
        Ok(Prediction { value, features })
    }

    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction> {
        self.predict(&crate::decode_image(bytes)?)
    }
}

/// Color features of the image followed by texture features of its
/// grayscale reduction, merged with texture taking precedence.
pub fn extract_features(image: &DynamicImage) -> Result<FeatureMap> {
    let color = features::extract_color_features(image)?;
    let gray = match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_rgb8().to_gray(),
    };
    let texture = features::extract_texture_features(&gray)?;
    Ok(features::merge(&color, &texture))
}
