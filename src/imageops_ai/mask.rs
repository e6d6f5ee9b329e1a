use image::{DynamicImage, GrayImage, Luma, RgbaImage};

use crate::errors::{ImgFeatError, Result};

pub trait ReplaceAlpha {
    /// Overwrite the alpha channel with `mask`, leaving colour channels untouched.
    fn replace_alpha_mut(&mut self, mask: &GrayImage) -> Result<()>;
}

impl ReplaceAlpha for RgbaImage {
    fn replace_alpha_mut(&mut self, mask: &GrayImage) -> Result<()> {
        if self.dimensions() != mask.dimensions() {
            return Err(ImgFeatError::DimensionMismatch {
                expected: self.dimensions(),
                actual: mask.dimensions(),
            });
        }

        for (pixel, &Luma([alpha])) in self.pixels_mut().zip(mask.pixels()) {
            pixel[3] = alpha;
        }
        Ok(())
    }
}

/// Convert `image` to RGBA and use `mask` as its alpha channel
/// (0 = transparent background, 255 = opaque foreground).
pub fn composite_alpha(image: &DynamicImage, mask: &GrayImage) -> Result<RgbaImage> {
    let mut rgba = image.to_rgba8();
    rgba.replace_alpha_mut(mask)?;
    Ok(rgba)
}

/// Map any 8-bit gray mask onto {0, 255}: values above 127 are foreground.
pub fn binarize(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let Luma([value]) = *mask.get_pixel(x, y);
        Luma([if value > 127 { 255 } else { 0 }])
    })
}
