//! Internal-reflection path tracer.
//!
//! A camera ray refracts into the gem, then bounces off the inside of the
//! facets until it finds one it can leave through (or the bounce budget runs
//! out). Only the final world-space direction is returned; the caller looks
//! it up in the environment map.
//!
//! Rays are traced in the mesh's local space so one BVH serves every
//! placement of the mesh.

use super::material::clamp_ior;
use super::optics::{reflect, refract};
use crate::bvh::{Bvh, Ray};
use crate::util::{face_forward, Mat4, Vec3};

/// Origin bias along the new direction after every surface interaction.
pub const RAY_OFFSET: f32 = 0.001;

/// A gem mesh placed in the world: its BVH plus the model transform.
#[derive(Debug, Clone, Copy)]
pub struct GemGeometry<'a> {
    pub bvh: &'a Bvh,
    /// Local to world.
    pub model: Mat4,
    /// World to local.
    pub model_inverse: Mat4,
}

impl<'a> GemGeometry<'a> {
    /// Mesh placed with `model`; the inverse is computed here.
    pub fn new(bvh: &'a Bvh, model: Mat4) -> Self {
        Self {
            bvh,
            model,
            model_inverse: model.inverse(),
        }
    }

    /// Mesh at the origin (identity transform).
    pub fn identity(bvh: &'a Bvh) -> Self {
        Self {
            bvh,
            model: Mat4::IDENTITY,
            model_inverse: Mat4::IDENTITY,
        }
    }
}

/// How a traced ray ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOutcome {
    /// Refracted out through a facet.
    Exited,
    /// Bounce budget spent while still reflecting; direction is the last
    /// reflection.
    Exhausted,
    /// No surface was hit inside the loop (open mesh or numerical leak).
    Escaped,
}

/// Result of one internal trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trace {
    /// World-space exit direction (unit length).
    pub direction: Vec3,
    /// BVH queries made.
    pub bounces: u32,
    pub outcome: TraceOutcome,
}

/// World-space exit direction for a camera ray hitting the gem at
/// `surface_point` with shading `normal`.
#[inline]
pub fn trace_exit_direction(
    geometry: &GemGeometry<'_>,
    surface_point: Vec3,
    incoming: Vec3,
    normal: Vec3,
    ior: f32,
    bounces: u32,
) -> Vec3 {
    trace_internal(geometry, surface_point, incoming, normal, ior, bounces).direction
}

/// Full trace with bookkeeping; see [`trace_exit_direction`].
pub fn trace_internal(
    geometry: &GemGeometry<'_>,
    surface_point: Vec3,
    incoming: Vec3,
    normal: Vec3,
    ior: f32,
    bounces: u32,
) -> Trace {
    let ior = clamp_ior(ior);
    let incoming = incoming.normalize_or_zero();
    let normal = match normal.try_normalize() {
        Some(n) => face_forward(n, incoming),
        None => -incoming,
    };

    // Into the gem; reflect off the outside if refraction is impossible
    let mut direction = refract(incoming, normal, 1.0 / ior)
        .unwrap_or_else(|| reflect(incoming, normal))
        .normalize_or_zero();
    let world_origin = surface_point + direction * RAY_OFFSET;

    let mut origin = geometry.model_inverse.transform_point3(world_origin);
    direction = geometry
        .model_inverse
        .transform_vector3(direction)
        .normalize_or_zero();

    let mut outcome = TraceOutcome::Exhausted;
    let mut queries = 0;
    for _ in 0..bounces {
        queries += 1;
        let Some(hit) = geometry.bvh.intersect_first(&Ray::new(origin, direction), None) else {
            outcome = TraceOutcome::Escaped;
            break;
        };

        if let Some(out) = refract(direction, hit.face_normal, ior) {
            direction = out;
            outcome = TraceOutcome::Exited;
            break;
        }

        direction = reflect(direction, hit.face_normal);
        origin = hit.point + direction * RAY_OFFSET;
    }
    // bounces == 0 keeps the entry refraction
    if bounces == 0 {
        outcome = TraceOutcome::Exited;
    }

    let world = geometry.model.transform_vector3(direction).normalize_or_zero();
    let direction = if world.is_finite() && world != Vec3::ZERO {
        world
    } else {
        incoming
    };

    Trace {
        direction,
        bounces: queries,
        outcome,
    }
}
