//! Gem light transport.
//!
//! ## Architecture
//! ```text
//! shade_pixel -> Fragment -> shade_fragment
//!                               `-> sample_dispersion (R, G, B exit directions)
//!                                      `-> trace_internal (refract in, bounce, refract out)
//!                                             `-> Bvh::intersect_first (local space)
//! ```
//!
//! Everything here is a pure function of the camera ray, the gem's BVH, its
//! material and the environment map.

pub mod dispersion;
pub mod material;
pub mod optics;
pub mod shade;
pub mod tracer;

pub use dispersion::{channel_iors, exit_directions, sample_dispersion, ChannelDirections};
pub use material::{clamp_ior, ColorDesc, GemMaterial, GemMaterialDesc, MAX_BOUNCES};
pub use optics::{reflect, refract};
pub use shade::{shade_fragment, shade_pixel, Fragment};
pub use tracer::{trace_exit_direction, trace_internal, GemGeometry, Trace, TraceOutcome, RAY_OFFSET};
