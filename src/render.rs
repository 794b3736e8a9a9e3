//! CPU frame driver.
//!
//! Rows are shaded in parallel with rayon. The scene, its BVHs and the
//! environment map are shared by reference; each pixel writes only its own
//! slot in the output.

use std::path::Path;

use image::{ImageFormat, Rgba, Rgba32FImage, RgbaImage};
use rayon::prelude::*;

use crate::camera::CameraFrame;
use crate::environment::EnvironmentMap;
use crate::gem::shade_pixel;
use crate::scene::GemScene;
use crate::tonemap::{encode_rgba8, linear_to_srgb, ToneMapping};
use crate::util::{Error, Result, UVec2, Vec3, Vec4};

/// Output-stage settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    /// Display colour for pixels no gem covers (not tone mapped).
    pub background: Vec3,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMapping::AcesFilmic,
            exposure: 1.0,
            background: Vec3::splat(0.1),
        }
    }
}

/// One rendered frame.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub width: u32,
    pub height: u32,
    /// Linear gem radiance per pixel, row-major; `None` where no gem is visible.
    pub pixels: Vec<Option<Vec4>>,
    pub settings: RenderSettings,
}

/// Shade every pixel of `frame`.
#[tracing::instrument(skip_all, fields(width = frame.resolution.x, height = frame.resolution.y))]
pub fn render(
    frame: &CameraFrame,
    scene: &GemScene,
    env: &EnvironmentMap,
    settings: &RenderSettings,
) -> RenderOutput {
    let start = std::time::Instant::now();
    let (width, height) = (frame.resolution.x, frame.resolution.y);
    let mut pixels = vec![None; width as usize * height as usize];

    if width > 0 {
        pixels
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.iter_mut().enumerate() {
                    *px = shade_pixel(frame, scene, env, UVec2::new(x as u32, y as u32));
                }
            });
    }

    let output = RenderOutput {
        width,
        height,
        pixels,
        settings: *settings,
    };
    tracing::info!(
        covered = output.covered_pixels(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Frame rendered"
    );
    output
}

impl RenderOutput {
    pub fn covered_pixels(&self) -> usize {
        self.pixels.iter().filter(|p| p.is_some()).count()
    }

    /// Linear radiance at `(x, y)`; background pixels are `None`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels[(y * self.width + x) as usize]
    }

    /// Tone-mapped, sRGB-encoded 8-bit image.
    pub fn to_rgba8(&self) -> RgbaImage {
        let s = &self.settings;
        let bg = s.background.clamp(Vec3::ZERO, Vec3::ONE);
        let q = |c: f32| (linear_to_srgb(c) * 255.0 + 0.5) as u8;
        let background = [q(bg.x), q(bg.y), q(bg.z), 255];
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            Rgba(match self.pixel(x, y) {
                Some(c) => encode_rgba8(c, s.tone_mapping, s.exposure),
                None => background,
            })
        })
    }

    /// Linear radiance image; background pixels get the background colour.
    pub fn to_rgba32f(&self) -> Rgba32FImage {
        let bg = self.settings.background.extend(1.0);
        Rgba32FImage::from_fn(self.width, self.height, |x, y| {
            Rgba(self.pixel(x, y).unwrap_or(bg).to_array())
        })
    }

    /// Save by extension: `.exr` keeps linear radiance, anything else is
    /// tone mapped to 8-bit.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = ImageFormat::from_path(path)?;
        match format {
            ImageFormat::OpenExr => self.to_rgba32f().save_with_format(path, format)?,
            ImageFormat::Png => self.to_rgba8().save_with_format(path, format)?,
            other => {
                return Err(Error::other(format!(
                    "unsupported output format {other:?} (use .png or .exr)"
                )))
            }
        }
        tracing::info!("Image saved");
        Ok(())
    }
}
