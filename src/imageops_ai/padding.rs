use image::{imageops, DynamicImage, GenericImageView, ImageBuffer, Pixel, Primitive};
use serde::Serialize;

use super::resize::resize_linear;
use crate::errors::{ImgFeatError, Result};

/// Where the resized content sits inside the padded canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Leading offsets of a `width x height` image centered on a
/// `pad_width x pad_height` canvas. Both offsets are floored, so an odd
/// remainder ends up on the right/bottom edge.
pub fn to_position(width: u32, height: u32, pad_width: u32, pad_height: u32) -> Option<(u32, u32)> {
    if width > pad_width || height > pad_height {
        return None;
    }

    Some(((pad_width - width) / 2, (pad_height - height) / 2))
}

pub fn padding<I, P, S>(
    image: &I,
    pad_width: u32,
    pad_height: u32,
    color: P,
) -> Option<(ImageBuffer<P, Vec<S>>, Placement)>
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = S>,
    S: Primitive,
{
    let (width, height) = image.dimensions();

    to_position(width, height, pad_width, pad_height).map(|(x, y)| {
        let mut canvas = ImageBuffer::from_pixel(pad_width, pad_height, color);
        // replace, not overlay: alpha pixels must be copied verbatim
        imageops::replace(&mut canvas, image, i64::from(x), i64::from(y));
        let placement = Placement {
            x,
            y,
            width,
            height,
        };
        (canvas, placement)
    })
}

/// Dimensions after scaling the longer edge to `target_size`.
///
/// Rounds half to even, matching the reference preprocessing the models were
/// trained with; each edge is kept within `1..=target_size`.
pub fn scaled_dimensions(width: u32, height: u32, target_size: u32) -> (u32, u32) {
    let scale = f64::from(target_size) / f64::from(width.max(height));
    let scale_edge =
        |edge: u32| ((f64::from(edge) * scale).round_ties_even() as u32).clamp(1, target_size);
    (scale_edge(width), scale_edge(height))
}

/// Resize with OpenCV-compatible bilinear interpolation so the longer edge
/// equals `target_size`, then center on a black `target_size x target_size`
/// canvas.
pub fn normalize_buffer<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    target_size: u32,
) -> Result<(ImageBuffer<P, Vec<u8>>, Placement)>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ImgFeatError::invalid_input(
            "geometry normalization",
            format!("image has no pixels ({}x{})", width, height),
        ));
    }
    if target_size == 0 {
        return Err(ImgFeatError::invalid_input(
            "geometry normalization",
            "target size must be positive",
        ));
    }

    let (new_width, new_height) = scaled_dimensions(width, height, target_size);
    let resized = resize_linear(image, new_width, new_height);

    let black = *P::from_slice(&[0u8; 4][..usize::from(P::CHANNEL_COUNT)]);
    padding(&resized, target_size, target_size, black).ok_or_else(|| {
        ImgFeatError::invalid_input(
            "geometry normalization",
            format!(
                "resized image {}x{} exceeds canvas {}",
                new_width, new_height, target_size
            ),
        )
    })
}

/// [`normalize_buffer`] for any decoded image, keeping the colour type of
/// 8-bit gray, gray+alpha, RGB and RGBA inputs. Other depths become RGB8.
pub fn normalize_with_placement(
    image: &DynamicImage,
    target_size: u32,
) -> Result<(DynamicImage, Placement)> {
    let (image, placement) = match image {
        DynamicImage::ImageLuma8(buffer) => {
            let (canvas, placement) = normalize_buffer(buffer, target_size)?;
            (DynamicImage::ImageLuma8(canvas), placement)
        }
        DynamicImage::ImageLumaA8(buffer) => {
            let (canvas, placement) = normalize_buffer(buffer, target_size)?;
            (DynamicImage::ImageLumaA8(canvas), placement)
        }
        DynamicImage::ImageRgba8(buffer) => {
            let (canvas, placement) = normalize_buffer(buffer, target_size)?;
            (DynamicImage::ImageRgba8(canvas), placement)
        }
        DynamicImage::ImageRgb8(buffer) => {
            let (canvas, placement) = normalize_buffer(buffer, target_size)?;
            (DynamicImage::ImageRgb8(canvas), placement)
        }
        other => {
            let (canvas, placement) = normalize_buffer(&other.to_rgb8(), target_size)?;
            (DynamicImage::ImageRgb8(canvas), placement)
        }
    };
    Ok((image, placement))
}

pub fn normalize(image: &DynamicImage, target_size: u32) -> Result<DynamicImage> {
    normalize_with_placement(image, target_size).map(|(image, _)| image)
}
