//! Math type re-exports and direction helpers shared by the tracer.

pub use glam::{Mat3, Mat4, UVec2, Vec2, Vec3, Vec4};

use std::f32::consts::PI;

/// Map a world direction to equirectangular UV.
///
/// `u` wraps around the horizon starting at -X, `v` runs from +Y (0) to -Y (1).
/// `rotation` (radians) spins the map around the Y axis.
#[inline]
pub fn dir_to_equirect_uv(dir: Vec3, rotation: f32) -> Vec2 {
    let d = dir.normalize_or_zero();
    let phi = d.z.atan2(d.x) + rotation;
    let theta = d.y.clamp(-1.0, 1.0).acos();
    Vec2::new((phi + PI) / (2.0 * PI), theta / PI)
}

/// Inverse of [`dir_to_equirect_uv`] with zero rotation.
#[inline]
pub fn equirect_uv_to_dir(uv: Vec2) -> Vec3 {
    let phi = uv.x * 2.0 * PI - PI;
    let theta = uv.y * PI;
    let (sin_t, cos_t) = theta.sin_cos();
    Vec3::new(sin_t * phi.cos(), cos_t, sin_t * phi.sin())
}

/// Flip `n` so it faces against `incident`.
#[inline]
pub fn face_forward(n: Vec3, incident: Vec3) -> Vec3 {
    if n.dot(incident) > 0.0 {
        -n
    } else {
        n
    }
}

/// Replace non-finite components with zero and negatives with zero.
#[inline]
pub fn sanitize_radiance(c: Vec3) -> Vec3 {
    Vec3::new(clean(c.x), clean(c.y), clean(c.z))
}

#[inline]
fn clean(v: f32) -> f32 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equirect_poles() {
        let up = dir_to_equirect_uv(Vec3::Y, 0.0);
        assert!(up.y.abs() < 1e-6);
        let down = dir_to_equirect_uv(Vec3::NEG_Y, 0.0);
        assert!((down.y - 1.0).abs() < 1e-6);
        let horizon = dir_to_equirect_uv(Vec3::X, 0.0);
        assert!((horizon.x - 0.5).abs() < 1e-6);
        assert!((horizon.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_equirect_inverse() {
        for dir in [
            Vec3::new(0.3, 0.4, -0.5),
            Vec3::new(-0.8, -0.1, 0.2),
            Vec3::new(0.0, 0.2, 1.0),
        ] {
            let d = dir.normalize();
            let back = equirect_uv_to_dir(dir_to_equirect_uv(d, 0.0));
            assert!((back - d).length() < 1e-5, "{d:?} -> {back:?}");
        }
    }

    #[test]
    fn test_face_forward() {
        let n = Vec3::Y;
        assert_eq!(face_forward(n, Vec3::NEG_Y), Vec3::Y);
        assert_eq!(face_forward(n, Vec3::Y), Vec3::NEG_Y);
    }

    #[test]
    fn test_sanitize() {
        let c = sanitize_radiance(Vec3::new(f32::NAN, -2.0, f32::INFINITY));
        assert_eq!(c, Vec3::ZERO);
        assert_eq!(sanitize_radiance(Vec3::ONE), Vec3::ONE);
    }
}
