//! 8-bit colour space conversions with OpenCV semantics.
//!
//! The tabular models were trained on features computed from OpenCV's 8-bit
//! `cvtColor` output, so every conversion here follows its integer path:
//! L\*a\*b\* as `(L*255/100, a+128, b+128)` through the sRGB gamma and cube
//! root lookup tables, HSV with hue halved into `0..180`, and BT.601 luma.

use std::sync::OnceLock;

use image::{GrayImage, Luma, Rgb, RgbImage};

const LAB_SHIFT: u32 = 12;
const GAMMA_SHIFT: u32 = 3;
const LAB_SHIFT2: u32 = LAB_SHIFT + GAMMA_SHIFT;
const CBRT_TABLE_SIZE: usize = 256 * 3 / 2 * (1 << GAMMA_SHIFT);
const HSV_SHIFT: u32 = 12;

/// Linear sRGB to XYZ, rows X, Y, Z.
const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
];
const D65_WHITE: [f64; 3] = [0.950456, 1.0, 1.088754];

struct LabTables {
    /// sRGB gamma expansion scaled to `0..=255 << GAMMA_SHIFT`.
    gamma: [u16; 256],
    /// Lab `f(t)` in `LAB_SHIFT2` fixed point, indexed by `t << GAMMA_SHIFT`.
    cbrt: Vec<u16>,
    /// XYZ rows divided by the white point, in `LAB_SHIFT` fixed point.
    coeffs: [[i32; 3]; 3],
}

impl LabTables {
    // Built in single precision like OpenCV's softfloat tables; the cube root
    // table differs in a few entries when built in double precision.
    fn new() -> Self {
        let gamma = std::array::from_fn(|i| {
            let x = i as f32 / 255.0;
            let x = f64::from(x);
            let linear = if x <= 0.04045 {
                x / 12.92
            } else {
                ((x + 0.055) / 1.055).powf(2.4)
            };
            (2040.0f32 * linear as f32).round_ties_even() as u16
        });

        let step = 1.0f32 / 2040.0;
        let threshold = 216.0f32 / 24389.0;
        let (slope, bias) = (841.0f32 / 108.0, 16.0f32 / 116.0);
        let cbrt = (0..CBRT_TABLE_SIZE)
            .map(|i| {
                let x = step * i as f32;
                let f = if x < threshold {
                    x.mul_add(slope, bias)
                } else {
                    f64::from(x).cbrt() as f32
                };
                ((1 << LAB_SHIFT2) as f32 * f).round_ties_even() as u16
            })
            .collect();

        let coeffs = std::array::from_fn(|row| {
            std::array::from_fn(|col| {
                (f64::from(1u32 << LAB_SHIFT) * RGB_TO_XYZ[row][col] / D65_WHITE[row]).round_ties_even()
                    as i32
            })
        });

        Self {
            gamma,
            cbrt,
            coeffs,
        }
    }
}

fn lab_tables() -> &'static LabTables {
    static TABLES: OnceLock<LabTables> = OnceLock::new();
    TABLES.get_or_init(LabTables::new)
}

struct HsvTables {
    saturation: [i32; 256],
    hue: [i32; 256],
}

fn hsv_tables() -> &'static HsvTables {
    static TABLES: OnceLock<HsvTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let reciprocal = |numerator: i32, i: usize| match i {
            0 => 0,
            i => (f64::from(numerator) / i as f64).round_ties_even() as i32,
        };
        HsvTables {
            saturation: std::array::from_fn(|i| reciprocal(255 << HSV_SHIFT, i)),
            hue: std::array::from_fn(|i| reciprocal(30 << HSV_SHIFT, i)),
        }
    })
}

const fn descale(value: i32, shift: u32) -> i32 {
    (value + (1 << (shift - 1))) >> shift
}

fn saturate(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

pub fn rgb_to_lab(Rgb([r, g, b]): Rgb<u8>) -> Rgb<u8> {
    const L_SCALE: i32 = (116 * 255 + 50) / 100;
    const L_SHIFT: i32 = -((16 * 255 * (1 << LAB_SHIFT2) + 50) / 100);
    const AB_OFFSET: i32 = 128 * (1 << LAB_SHIFT2);

    let tables = lab_tables();
    let [r, g, b] = [r, g, b].map(|c| i32::from(tables.gamma[usize::from(c)]));
    let [fx, fy, fz] = tables.coeffs.map(|[cr, cg, cb]| {
        let t = descale(r * cr + g * cg + b * cb, LAB_SHIFT);
        i32::from(tables.cbrt[t as usize])
    });

    let l = descale(L_SCALE * fy + L_SHIFT, LAB_SHIFT2);
    let a = descale(500 * (fx - fy) + AB_OFFSET, LAB_SHIFT2);
    let b = descale(200 * (fy - fz) + AB_OFFSET, LAB_SHIFT2);

    Rgb([saturate(l), saturate(a), saturate(b)])
}

pub fn rgb_to_hsv(Rgb([r, g, b]): Rgb<u8>) -> Rgb<u8> {
    let tables = hsv_tables();
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    let value = r.max(g).max(b);
    let diff = value - r.min(g).min(b);
    let half = 1 << (HSV_SHIFT - 1);

    let saturation = (diff * tables.saturation[value as usize] + half) >> HSV_SHIFT;

    let sector = if value == r {
        g - b
    } else if value == g {
        b - r + 2 * diff
    } else {
        r - g + 4 * diff
    };
    let mut hue = (sector * tables.hue[diff as usize] + half) >> HSV_SHIFT;
    if hue < 0 {
        hue += 180;
    }

    Rgb([saturate(hue), saturate(saturation), value as u8])
}

/// BT.601 luma in OpenCV's 14-bit fixed point, bit-exact with `COLOR_RGB2GRAY`.
pub fn rgb_to_gray(Rgb([r, g, b]): Rgb<u8>) -> Luma<u8> {
    const SHIFT: u32 = 14;
    let luma = u32::from(r) * 4899 + u32::from(g) * 9617 + u32::from(b) * 1868;
    Luma([((luma + (1 << (SHIFT - 1))) >> SHIFT) as u8])
}

pub trait ConvertColor {
    fn to_lab(&self) -> RgbImage;
    fn to_hsv(&self) -> RgbImage;
    fn to_gray(&self) -> GrayImage;
}

impl ConvertColor for RgbImage {
    fn to_lab(&self) -> RgbImage {
        map_pixels(self, rgb_to_lab)
    }

    fn to_hsv(&self) -> RgbImage {
        map_pixels(self, rgb_to_hsv)
    }

    fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            rgb_to_gray(*self.get_pixel(x, y))
        })
    }
}

fn map_pixels(image: &RgbImage, f: fn(Rgb<u8>) -> Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        f(*image.get_pixel(x, y))
    })
}
