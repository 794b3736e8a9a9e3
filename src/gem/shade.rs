//! Per-fragment shading entry point.
//!
//! One call per covered pixel, with no shared mutable state between calls,
//! so callers are free to run them in any order and on any thread.

use super::dispersion::sample_dispersion;
use super::material::GemMaterial;
use super::tracer::GemGeometry;
use crate::camera::CameraFrame;
use crate::environment::EnvironmentMap;
use crate::scene::GemScene;
use crate::util::{UVec2, Vec3, Vec4};

/// Visible gem surface under a pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    /// Index into the scene's instances.
    pub instance: usize,
    /// World-space surface position.
    pub position: Vec3,
    /// World-space shading normal, facing the camera.
    pub normal: Vec3,
    /// Distance from the camera.
    pub distance: f32,
}

/// Linear RGBA (alpha 1) for a visible fragment.
pub fn shade_fragment(
    frame: &CameraFrame,
    geometry: &GemGeometry<'_>,
    material: &GemMaterial,
    env: &EnvironmentMap,
    fragment: &Fragment,
) -> Vec4 {
    let incoming = (fragment.position - frame.camera_position()).normalize_or_zero();
    let rgb = sample_dispersion(
        geometry,
        fragment.position,
        incoming,
        fragment.normal,
        material,
        env,
    );
    rgb.extend(1.0)
}

/// Linear RGBA for pixel `(x, y)`, or `None` when no gem covers it.
pub fn shade_pixel(
    frame: &CameraFrame,
    scene: &GemScene,
    env: &EnvironmentMap,
    pixel: UVec2,
) -> Option<Vec4> {
    let ray = frame.pixel_ray(pixel.x, pixel.y);
    let fragment = scene.find_fragment(&ray)?;
    let instance = scene.instance(fragment.instance)?;
    Some(shade_fragment(
        frame,
        &instance.geometry(),
        &instance.material,
        env,
        &fragment,
    ))
}
