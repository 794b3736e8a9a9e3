//! Tone mapping and display encoding.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Mat3, Vec3, Vec4};

/// HDR to display mapping applied after shading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMapping {
    /// Exposure only, then clamp.
    None,
    /// ACES filmic fit (RRT + ODT).
    #[default]
    AcesFilmic,
}

impl FromStr for ToneMapping {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "linear" => Ok(Self::None),
            "aces" | "aces_filmic" | "acesfilmic" => Ok(Self::AcesFilmic),
            other => Err(Error::InvalidConfig(format!("unknown tone mapping `{other}`"))),
        }
    }
}

// sRGB => XYZ => D65_2_D60 => AP1 => RRT_SAT
const ACES_INPUT: Mat3 = Mat3::from_cols_array(&[
    0.59719, 0.07600, 0.02840, //
    0.35458, 0.90834, 0.13383, //
    0.04823, 0.01566, 0.83777,
]);

// ODT_SAT => XYZ => D60_2_D65 => sRGB
const ACES_OUTPUT: Mat3 = Mat3::from_cols_array(&[
    1.60475, -0.10208, -0.00327, //
    -0.53108, 1.10813, -0.07276, //
    -0.07367, -0.00605, 1.07602,
]);

#[inline]
fn rrt_and_odt_fit(v: Vec3) -> Vec3 {
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (0.983729 * v + 0.4329510) + 0.238081;
    a / b
}

impl ToneMapping {
    /// Map linear radiance to display-referred linear `[0, 1]`.
    pub fn apply(self, color: Vec3, exposure: f32) -> Vec3 {
        let mapped = match self {
            Self::None => color * exposure,
            Self::AcesFilmic => {
                let c = ACES_INPUT * (color * (exposure / 0.6));
                ACES_OUTPUT * rrt_and_odt_fit(c)
            }
        };
        if mapped.is_finite() {
            mapped.clamp(Vec3::ZERO, Vec3::ONE)
        } else {
            Vec3::ZERO
        }
    }
}

/// Linear to sRGB transfer function.
#[inline]
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Tone map, encode to sRGB and quantize; alpha is forced to 1.
pub fn encode_rgba8(color: Vec4, mapping: ToneMapping, exposure: f32) -> [u8; 4] {
    let mapped = mapping.apply(color.truncate(), exposure);
    let q = |c: f32| (linear_to_srgb(c).clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
    [q(mapped.x), q(mapped.y), q(mapped.z), 255]
}
