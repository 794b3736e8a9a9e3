//! Per-channel dispersion and environment lookup.
//!
//! Green always uses the nominal IOR. Red and blue either get their own full
//! trace with a perturbed IOR (accurate) or reuse the green direction nudged
//! along a fixed diagonal (fast, no extra BVH work).

use super::material::{clamp_ior, GemMaterial};
use super::tracer::{trace_exit_direction, GemGeometry};
use crate::environment::EnvironmentMap;
use crate::util::{sanitize_radiance, Vec3};

/// Exit direction per colour channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelDirections {
    pub red: Vec3,
    pub green: Vec3,
    pub blue: Vec3,
}

impl ChannelDirections {
    fn uniform(direction: Vec3) -> Self {
        Self {
            red: direction,
            green: direction,
            blue: direction,
        }
    }
}

/// Red/blue IORs for accurate mode: `ior * (1 -/+ strength)`, each >= 1.
#[inline]
pub fn channel_iors(ior: f32, aberration: f32) -> (f32, f32) {
    (
        clamp_ior(ior * (1.0 - aberration)),
        clamp_ior(ior * (1.0 + aberration)),
    )
}

/// Trace the exit directions for one surface point.
pub fn exit_directions(
    geometry: &GemGeometry<'_>,
    surface_point: Vec3,
    incoming: Vec3,
    normal: Vec3,
    material: &GemMaterial,
) -> ChannelDirections {
    let bounces = material.bounces;
    let aberration = material.effective_aberration();
    let green = trace_exit_direction(
        geometry,
        surface_point,
        incoming,
        normal,
        material.effective_ior(),
        bounces,
    );
    if aberration == 0.0 {
        return ChannelDirections::uniform(green);
    }

    if material.fast_chroma {
        let offset = Vec3::splat(aberration / 2.0);
        return ChannelDirections {
            red: (green + offset).normalize_or(green),
            green,
            blue: (green - offset).normalize_or(green),
        };
    }

    let (ior_r, ior_b) = channel_iors(material.ior, aberration);
    ChannelDirections {
        red: trace_exit_direction(geometry, surface_point, incoming, normal, ior_r, bounces),
        green,
        blue: trace_exit_direction(geometry, surface_point, incoming, normal, ior_b, bounces),
    }
}

/// Linear radiance leaving the gem toward the camera, tinted by the material
/// colour.
pub fn sample_dispersion(
    geometry: &GemGeometry<'_>,
    surface_point: Vec3,
    incoming: Vec3,
    normal: Vec3,
    material: &GemMaterial,
    env: &EnvironmentMap,
) -> Vec3 {
    let dirs = exit_directions(geometry, surface_point, incoming, normal, material);
    let rgb = if dirs.red == dirs.green && dirs.blue == dirs.green {
        env.sample(dirs.green)
    } else {
        Vec3::new(
            env.sample(dirs.red).x,
            env.sample(dirs.green).y,
            env.sample(dirs.blue).z,
        )
    };
    sanitize_radiance(rgb * material.color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::Bvh;
    use crate::mesh::shapes;

    fn top_entry() -> (Vec3, Vec3, Vec3) {
        (
            Vec3::new(0.1, 0.5, -0.05),
            Vec3::new(0.35, -1.0, 0.2).normalize(),
            Vec3::Y,
        )
    }

    #[test]
    fn test_channel_iors() {
        let (r, b) = channel_iors(2.4, 0.1);
        assert!((r - 2.16).abs() < 1e-5);
        assert!((b - 2.64).abs() < 1e-5);
        // Never below 1
        let (r, _) = channel_iors(1.05, 0.5);
        assert_eq!(r, 1.0);
    }

    #[test]
    fn test_zero_aberration_is_uniform() {
        let bvh = Bvh::build(&shapes::unit_cube());
        let geometry = GemGeometry::identity(&bvh);
        let (p, d, n) = top_entry();
        for fast_chroma in [false, true] {
            let material = GemMaterial {
                aberration_strength: 0.0,
                fast_chroma,
                ..Default::default()
            };
            let dirs = exit_directions(&geometry, p, d, n, &material);
            assert_eq!(dirs.red, dirs.green);
            assert_eq!(dirs.blue, dirs.green);
        }
    }

    #[test]
    fn test_fast_mode_offsets_green() {
        let bvh = Bvh::build(&shapes::unit_cube());
        let geometry = GemGeometry::identity(&bvh);
        let (p, d, n) = top_entry();
        let material = GemMaterial {
            aberration_strength: 0.2,
            fast_chroma: true,
            ..Default::default()
        };
        let dirs = exit_directions(&geometry, p, d, n, &material);
        let expected_red = (dirs.green + Vec3::splat(0.1)).normalize();
        let expected_blue = (dirs.green - Vec3::splat(0.1)).normalize();
        assert!((dirs.red - expected_red).length() < 1e-6);
        assert!((dirs.blue - expected_blue).length() < 1e-6);
    }

    #[test]
    fn test_accurate_mode_spreads_channels() {
        let bvh = Bvh::build(&shapes::round_brilliant(16));
        let geometry = GemGeometry::identity(&bvh);
        let incoming = Vec3::new(0.4, -1.0, 0.1).normalize();
        let point = Vec3::new(0.1, 0.32, 0.05);
        let material = GemMaterial {
            aberration_strength: 0.05,
            ..Default::default()
        };
        let dirs = exit_directions(&geometry, point, incoming, Vec3::Y, &material);
        assert!(dirs.red != dirs.green || dirs.blue != dirs.green);
        for d in [dirs.red, dirs.green, dirs.blue] {
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_colour_tint_and_channel_pick() {
        let bvh = Bvh::build(&shapes::unit_cube());
        let geometry = GemGeometry::identity(&bvh);
        let env = EnvironmentMap::solid(Vec3::new(0.5, 1.0, 2.0));
        let (p, d, n) = top_entry();
        let material = GemMaterial {
            color: Vec3::new(1.0, 0.5, 0.25),
            ..Default::default()
        };
        let rgb = sample_dispersion(&geometry, p, d, n, &material, &env);
        assert!((rgb - Vec3::new(0.5, 0.5, 0.5)).length() < 1e-6);
    }
}
