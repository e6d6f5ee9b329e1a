pub mod config;
pub mod errors;
pub mod features;
pub mod imageops_ai;
pub mod model;
pub mod pipeline;
pub mod traits;

pub mod mocks;

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

pub use config::{PipelineConfig, SchemaPolicy};
pub use errors::{ImgFeatError, Result};
pub use features::FeatureMap;
pub use imageops_ai::Placement;
pub use pipeline::{extract_features, Prediction, PredictionPipeline, SegmentationPipeline};
pub use traits::*;

/// Decode PNG/JPEG/WebP bytes. Empty or unreadable input is `InvalidInput`.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(ImgFeatError::invalid_input("image decoding", "no bytes"));
    }
    let image = image::load_from_memory(bytes)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ImgFeatError::invalid_input(
            "image decoding",
            "decoded image has no pixels",
        ));
    }
    Ok(image)
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
