use clap::{Args, ValueEnum};
use image::ImageFormat;

/// Edge length of the square canvas the segmentation model was trained on.
pub const DEFAULT_TARGET_SIZE: u32 = 512;

/// What to do when the predictor expects a feature the extractors did not produce.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchemaPolicy {
    /// Substitute `0.0` and log a warning.
    #[default]
    Fill,
    /// Fail with `SchemaMismatch`.
    Strict,
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Canvas edge length for the segmentation path
    #[arg(
        long,
        default_value_t = DEFAULT_TARGET_SIZE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub target_size: u32,

    /// Handling of schema features missing from the extracted map
    #[arg(long, value_enum, default_value_t = SchemaPolicy::Fill)]
    pub schema_policy: SchemaPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            schema_policy: SchemaPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub const fn with_target_size(mut self, target_size: u32) -> Self {
        self.target_size = target_size;
        self
    }

    pub const fn with_schema_policy(mut self, schema_policy: SchemaPolicy) -> Self {
        self.schema_policy = schema_policy;
        self
    }
}

pub fn check_format(s: &str) -> Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.writing_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(s.to_string())
}
