use tracing::warn;

use super::FeatureMap;
use crate::config::SchemaPolicy;
use crate::errors::{ImgFeatError, Result};

/// Ordered merge of the two extractor outputs.
///
/// Color entries come first and texture entries are appended in their own
/// order. On a name collision the texture value wins and takes the colour
/// entry's position. The extractors use disjoint names, so this only matters
/// for hand-built maps.
pub fn merge(color: &FeatureMap, texture: &FeatureMap) -> FeatureMap {
    let mut merged = FeatureMap::with_capacity(color.len() + texture.len());
    for (name, value) in color.iter().chain(texture.iter()) {
        merged.insert(name, value);
    }
    merged
}

/// Project `features` onto `schema`, in schema order.
///
/// With [`SchemaPolicy::Fill`] a name the extractors did not produce becomes
/// `0.0` and the filled names are logged at `warn`.
/// [`SchemaPolicy::Strict`] fails instead, listing all missing names.
pub fn match_schema(
    features: &FeatureMap,
    schema: &[String],
    policy: SchemaPolicy,
) -> Result<FeatureMap> {
    let mut matched = FeatureMap::with_capacity(schema.len());
    let mut missing = Vec::new();

    for name in schema {
        let value = features.get(name).unwrap_or_else(|| {
            missing.push(name.clone());
            0.0
        });
        matched.insert(name.as_str(), value);
    }

    if !missing.is_empty() {
        match policy {
            SchemaPolicy::Fill => {
                warn!(missing = ?missing, "filled missing schema features with 0.0");
            }
            SchemaPolicy::Strict => return Err(ImgFeatError::SchemaMismatch { missing }),
        }
    }

    Ok(matched)
}

/// Merge both maps and lay them out as the predictor's input vector.
///
/// Without a schema the vector follows the merged map's order. A non-finite
/// value in the laid-out vector is an `InvalidInput` error.
pub fn assemble(
    color: &FeatureMap,
    texture: &FeatureMap,
    schema: Option<&[String]>,
    policy: SchemaPolicy,
) -> Result<Vec<f64>> {
    let merged = merge(color, texture);
    let ordered = match schema {
        Some(schema) => match_schema(&merged, schema, policy)?,
        None => merged,
    };
    ordered.check_finite()?;
    Ok(ordered.values().collect())
}
