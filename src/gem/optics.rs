//! Snell refraction and mirror reflection.
//!
//! Both follow the shading-language conventions: `incident` points toward
//! the surface, `normal` is unit length and faces against `incident`.

use crate::util::Vec3;

/// Refract `incident` through a surface with relative index `eta`
/// (n_from / n_to). Returns `None` on total internal reflection.
#[inline]
pub fn refract(incident: Vec3, normal: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = normal.dot(incident);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 || !k.is_finite() {
        return None;
    }
    Some(eta * incident - (eta * cos_i + k.sqrt()) * normal)
}

/// Mirror `incident` about `normal`.
#[inline]
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

/// Sine of the critical angle leaving a medium of index `ior` into air.
#[inline]
pub fn critical_sine(ior: f32) -> f32 {
    1.0 / ior.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir_at(angle_deg: f32) -> Vec3 {
        let a = angle_deg.to_radians();
        Vec3::new(a.sin(), -a.cos(), 0.0)
    }

    #[test]
    fn test_snell() {
        let i = dir_at(45.0);
        let t = refract(i, Vec3::Y, 1.0 / 1.5).unwrap();
        assert!((t.length() - 1.0).abs() < 1e-6);
        let sin_t = t.x;
        assert!((sin_t - 45.0f32.to_radians().sin() / 1.5).abs() < 1e-6);
        assert!(t.y < 0.0);
    }

    #[test]
    fn test_unit_ratio_passes_through() {
        let i = dir_at(30.0);
        let t = refract(i, Vec3::Y, 1.0).unwrap();
        assert!((t - i).length() < 1e-6);
    }

    #[test]
    fn test_total_internal_reflection() {
        // Leaving glass past the critical angle.
        let i = dir_at(60.0);
        assert!(refract(i, Vec3::Y, 1.5).is_none());
        // Just under the critical angle still refracts.
        let crit = critical_sine(1.5).asin().to_degrees();
        assert!(refract(dir_at(crit - 0.5), Vec3::Y, 1.5).is_some());
    }

    #[test]
    fn test_reflect() {
        let i = dir_at(30.0);
        let r = reflect(i, Vec3::Y);
        assert!((r - Vec3::new(i.x, -i.y, 0.0)).length() < 1e-6);
    }
}
