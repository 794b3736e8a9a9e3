//! Gem material parameters.
//!
//! [`GemMaterialDesc`] is the serialized form (accepts the camelCase names
//! used by web front ends); [`GemMaterial`] is the validated value the
//! tracer reads.

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result, Vec3};

/// Largest accepted bounce budget. Each bounce is one BVH query per traced
/// channel, and a ray trapped by total internal reflection spends all of them.
pub const MAX_BOUNCES: u32 = 64;

/// Validated per-material shading parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GemMaterial {
    /// Linear RGB tint applied after the environment lookup.
    pub color: Vec3,
    /// Maximum internal bounces per traced ray.
    pub bounces: u32,
    /// Index of refraction. Values <= 1 behave as 1.
    pub ior: f32,
    /// Dispersion magnitude; 0 disables per-channel tracing.
    pub aberration_strength: f32,
    /// Approximate red/blue by offsetting the green exit direction
    /// instead of tracing them.
    pub fast_chroma: bool,
}

impl Default for GemMaterial {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            bounces: 3,
            ior: 2.4,
            aberration_strength: 0.01,
            fast_chroma: false,
        }
    }
}

impl GemMaterial {
    /// Check every field; used at configuration time.
    pub fn validate(&self) -> Result<()> {
        if self.bounces > MAX_BOUNCES {
            return Err(Error::material(
                "bounces",
                format!("must be between 0 and {MAX_BOUNCES}, got {}", self.bounces),
            ));
        }
        if !self.color.is_finite() || self.color.min_element() < 0.0 {
            return Err(Error::material(
                "color",
                format!("components must be finite and >= 0, got {:?}", self.color),
            ));
        }
        if !self.ior.is_finite() {
            return Err(Error::material("ior", format!("must be finite, got {}", self.ior)));
        }
        if !(self.aberration_strength >= 0.0) || !self.aberration_strength.is_finite() {
            return Err(Error::material(
                "aberrationStrength",
                format!("must be finite and >= 0, got {}", self.aberration_strength),
            ));
        }
        Ok(())
    }

    /// IOR used by the tracer: clamped to >= 1, NaN treated as 1.
    #[inline]
    pub fn effective_ior(&self) -> f32 {
        clamp_ior(self.ior)
    }

    /// Aberration used by the sampler: NaN and negatives treated as 0.
    #[inline]
    pub fn effective_aberration(&self) -> f32 {
        if self.aberration_strength.is_finite() {
            self.aberration_strength.max(0.0)
        } else {
            0.0
        }
    }
}

/// Clamp an index of refraction to >= 1 (NaN -> 1).
#[inline]
pub fn clamp_ior(ior: f32) -> f32 {
    if ior.is_nan() {
        1.0
    } else {
        ior.max(1.0)
    }
}

/// RGB colour as `[r, g, b]` floats or a `#rrggbb` hex string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorDesc {
    Rgb([f32; 3]),
    Hex(String),
}

impl ColorDesc {
    pub fn to_vec3(&self) -> Result<Vec3> {
        match self {
            Self::Rgb(rgb) => Ok(Vec3::from_array(*rgb)),
            Self::Hex(hex) => parse_hex_color(hex),
        }
    }
}

impl Default for ColorDesc {
    fn default() -> Self {
        Self::Rgb([1.0, 1.0, 1.0])
    }
}

/// Parse `#rrggbb` (or `rrggbb`) into linear RGB.
pub fn parse_hex_color(hex: &str) -> Result<Vec3> {
    let digits = hex.trim().trim_start_matches('#');
    let bad = || Error::material("color", format!("expected #rrggbb, got `{hex}`"));
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(bad());
    }
    let channel = |i: usize| -> Result<f32> {
        let byte = u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| bad())?;
        Ok(srgb_to_linear(byte as f32 / 255.0))
    };
    Ok(Vec3::new(channel(0)?, channel(2)?, channel(4)?))
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Serialized material description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GemMaterialDesc {
    pub color: ColorDesc,
    /// Signed so negative budgets can be rejected with a clear error.
    pub bounces: i64,
    pub ior: f32,
    #[serde(alias = "aberrationStrength")]
    pub aberration_strength: f32,
    #[serde(alias = "fastChroma")]
    pub fast_chroma: bool,
}

impl Default for GemMaterialDesc {
    fn default() -> Self {
        let m = GemMaterial::default();
        Self {
            color: ColorDesc::default(),
            bounces: m.bounces as i64,
            ior: m.ior,
            aberration_strength: m.aberration_strength,
            fast_chroma: m.fast_chroma,
        }
    }
}

impl TryFrom<&GemMaterialDesc> for GemMaterial {
    type Error = Error;

    fn try_from(desc: &GemMaterialDesc) -> Result<Self> {
        let bounces = u32::try_from(desc.bounces)
            .ok()
            .filter(|&b| b <= MAX_BOUNCES)
            .ok_or_else(|| {
                Error::material(
                    "bounces",
                    format!("must be between 0 and {MAX_BOUNCES}, got {}", desc.bounces),
                )
            })?;
        let material = GemMaterial {
            color: desc.color.to_vec3()?,
            bounces,
            ior: desc.ior,
            aberration_strength: desc.aberration_strength,
            fast_chroma: desc.fast_chroma,
        };
        material.validate()?;
        Ok(material)
    }
}
