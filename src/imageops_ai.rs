pub mod convert_color;
pub mod mask;
pub mod padding;
pub mod resize;

pub use convert_color::ConvertColor;
pub use mask::{binarize, composite_alpha, ReplaceAlpha};
pub use padding::{normalize, normalize_with_placement, Placement};
pub use resize::resize_linear;
