//! Bilinear resize of 8-bit buffers, bit-compatible with OpenCV's scalar
//! `INTER_LINEAR` path: pixel-center sampling, 11-bit fixed-point weights and
//! a rounded 22-bit descale. An exact 2x downscale on both axes averages 2x2
//! blocks, as OpenCV switches to its fast area path there.

use image::{ImageBuffer, Pixel};

const WEIGHT_BITS: u32 = 11;
const WEIGHT_SCALE: f32 = (1 << WEIGHT_BITS) as f32;
const DESCALE_BITS: u32 = 2 * WEIGHT_BITS;

/// Source index and weights for one destination column (or row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tap {
    index: usize,
    near: i32,
    far: i32,
}

/// `src` must be positive.
fn taps(src: u32, dst: u32) -> Vec<Tap> {
    let scale = 1.0 / (f64::from(dst) / f64::from(src));
    let last = src as usize - 1;

    (0..dst)
        .map(|d| {
            let position = ((f64::from(d) + 0.5) * scale - 0.5) as f32;
            let floor = position.floor();
            let (index, frac) = if floor < 0.0 {
                (0, 0.0)
            } else if floor as usize >= last {
                (last, 0.0)
            } else {
                (floor as usize, position - floor)
            };
            Tap {
                index,
                near: ((1.0 - frac) * WEIGHT_SCALE).round_ties_even() as i32,
                far: (frac * WEIGHT_SCALE).round_ties_even() as i32,
            }
        })
        .collect()
}

/// Horizontal pass over one source row, kept in 11-bit fixed point.
fn horizontal(row: &[u8], taps: &[Tap], channels: usize) -> Vec<i32> {
    taps.iter()
        .flat_map(|tap| {
            let base = tap.index * channels;
            (0..channels).map(move |c| {
                let near = i32::from(row[base + c]) * tap.near;
                if tap.far == 0 {
                    near
                } else {
                    near + i32::from(row[base + channels + c]) * tap.far
                }
            })
        })
        .collect()
}

fn resize_bilinear(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst: &mut [u8],
    width: u32,
    height: u32,
    channels: usize,
) {
    let x_taps = taps(src_width, width);
    let y_taps = taps(src_height, height);
    let src_stride = src_width as usize * channels;
    let dst_stride = width as usize * channels;
    let source_row = |y: usize| horizontal(&src[y * src_stride..][..src_stride], &x_taps, channels);

    for (out_row, tap) in dst.chunks_exact_mut(dst_stride).zip(&y_taps) {
        let top = source_row(tap.index);
        let bottom = (tap.far != 0).then(|| source_row(tap.index + 1));

        for (i, out) in out_row.iter_mut().enumerate() {
            let mut value = top[i] * tap.near + (1 << (DESCALE_BITS - 1));
            if let Some(bottom) = &bottom {
                value += bottom[i] * tap.far;
            }
            *out = (value >> DESCALE_BITS).clamp(0, 255) as u8;
        }
    }
}

fn halve(src: &[u8], src_width: u32, dst: &mut [u8], width: u32, channels: usize) {
    let src_stride = src_width as usize * channels;
    let dst_stride = width as usize * channels;

    for (y, out_row) in dst.chunks_exact_mut(dst_stride).enumerate() {
        let top = &src[2 * y * src_stride..][..src_stride];
        let bottom = &src[(2 * y + 1) * src_stride..][..src_stride];

        for (i, out) in out_row.iter_mut().enumerate() {
            let j = 2 * (i / channels) * channels + i % channels;
            let sum = u32::from(top[j])
                + u32::from(top[j + channels])
                + u32::from(bottom[j])
                + u32::from(bottom[j + channels]);
            // two-channel buffers take the generic area path, which rounds half to even
            *out = if channels == 2 {
                (sum as f32 * 0.25).round_ties_even() as u8
            } else {
                ((sum + 2) >> 2) as u8
            };
        }
    }
}

/// Resize to `width x height` with OpenCV-compatible bilinear interpolation.
///
/// A same-size request returns a copy. Empty source or destination sizes
/// give an empty (black) buffer of the requested size.
pub fn resize_linear<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (src_width, src_height) = image.dimensions();
    if (width, height) == (src_width, src_height) {
        return image.clone();
    }

    let mut resized = ImageBuffer::new(width, height);
    if width == 0 || height == 0 || src_width == 0 || src_height == 0 {
        return resized;
    }

    let channels = usize::from(P::CHANNEL_COUNT);
    let halving = u64::from(src_width) == 2 * u64::from(width)
        && u64::from(src_height) == 2 * u64::from(height);
    if halving {
        halve(image.as_raw(), src_width, &mut resized, width, channels);
    } else {
        resize_bilinear(
            image.as_raw(),
            src_width,
            src_height,
            &mut resized,
            width,
            height,
            channels,
        );
    }
    resized
}
