//! Equirectangular environment map.
//!
//! Texels are linear RGB `f32`, row 0 at +Y. Lookups are bilinear with `u`
//! wrapping around the horizon and `v` clamped at the poles (a repeat/clamp
//! sampler). Loading goes through the `image` crate, so `.hdr` and `.exr`
//! both work.

use std::path::Path;

use crate::util::{dir_to_equirect_uv, sanitize_radiance, Error, Result, Vec3};

/// Environment lookup parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvParams {
    /// Radiance multiplier.
    pub intensity: f32,
    /// Rotation around +Y in radians.
    pub rotation: f32,
}

impl Default for EnvParams {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            rotation: 0.0,
        }
    }
}

/// Read-only radiance texture shared by every fragment of a frame.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    width: u32,
    height: u32,
    texels: Vec<Vec3>,
    pub params: EnvParams,
}

impl EnvironmentMap {
    /// Build from packed RGB floats (`width * height * 3` values, row-major).
    pub fn from_rgb32f(width: u32, height: u32, data: &[f32]) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 {
            return Err(Error::InvalidEnvironment(format!(
                "empty map ({width}x{height})"
            )));
        }
        if data.len() != expected {
            return Err(Error::InvalidEnvironment(format!(
                "{width}x{height} map needs {expected} floats, got {}",
                data.len()
            )));
        }
        let texels = data
            .chunks_exact(3)
            .map(|px| sanitize_radiance(Vec3::new(px[0], px[1], px[2])))
            .collect();
        Ok(Self {
            width,
            height,
            texels,
            params: EnvParams::default(),
        })
    }

    /// 1x1 map returning `color` in every direction.
    pub fn solid(color: Vec3) -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![sanitize_radiance(color)],
            params: EnvParams::default(),
        }
    }

    /// Load an HDR/EXR (or any format the `image` crate decodes).
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        use image::{GenericImageView, ImageReader};

        let img = ImageReader::open(path.as_ref())?
            .with_guessed_format()?
            .decode()?;
        let (width, height) = img.dimensions();
        let rgb = img.to_rgb32f();
        let map = Self::from_rgb32f(width, height, rgb.as_raw())?;
        tracing::info!(width, height, "Environment map loaded");
        Ok(map)
    }

    pub fn with_params(mut self, params: EnvParams) -> Self {
        self.params = params;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel at integer coordinates (x wraps, y clamps).
    #[inline]
    pub fn texel(&self, x: i64, y: i64) -> Vec3 {
        let w = self.width as i64;
        let h = self.height as i64;
        let x = x.rem_euclid(w);
        let y = y.clamp(0, h - 1);
        self.texels[(y * w + x) as usize]
    }

    /// Radiance arriving from `direction` (intensity applied).
    pub fn sample(&self, direction: Vec3) -> Vec3 {
        let uv = dir_to_equirect_uv(direction, self.params.rotation);
        if !uv.is_finite() {
            return Vec3::ZERO;
        }

        // Texel centres sit at half-integer coordinates
        let x = uv.x * self.width as f32 - 0.5;
        let y = uv.y * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), fx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), fx);
        sanitize_radiance(top.lerp(bottom, fy) * self.params.intensity)
    }
}
