//! # gemtrace
//!
//! Faceted gem rendering with BVH-accelerated internal reflection.
//!
//! A camera ray refracts into the gem, bounces off the inside of its facets
//! (total internal reflection) until it can leave, and the exit direction is
//! looked up in an equirectangular environment map, once per colour channel
//! when dispersion is on.
//!
//! ## Modules
//!
//! - [`util`] - Errors and math helpers
//! - [`mesh`] - Triangle meshes, normal generation, procedural gem shapes
//! - [`bvh`] - SAH BVH builder, nearest-hit queries, GPU buffer layout
//! - [`gem`] - Path tracer, dispersion sampler and per-fragment shading
//! - [`environment`] - Equirectangular radiance map
//! - [`camera`] - Per-frame camera matrices and primary rays
//! - [`tonemap`] - ACES filmic tone mapping and sRGB encoding
//! - [`scene`] - Placed gem instances
//! - [`render`] - Parallel CPU frame driver
//! - [`config`] - JSON scene description
//!
//! ## Example
//!
//! ```no_run
//! use gemtrace::prelude::*;
//!
//! let config = SceneConfig::default();
//! let scene = config.build_scene()?;
//! let env = EnvironmentMap::load("studio.hdr")?;
//! let frame = render(&config.camera_frame(), &scene, &env, &config.render_settings());
//! frame.save("diamond.png")?;
//! # Ok::<(), gemtrace::Error>(())
//! ```

pub mod util;
pub mod mesh;
pub mod bvh;
pub mod gem;
pub mod environment;
pub mod camera;
pub mod tonemap;
pub mod scene;
pub mod render;
pub mod config;

// Re-export commonly used types
pub use util::{Error, Result};
pub use bvh::{Bvh, BvhOptions, Hit, Ray};
pub use gem::{GemMaterial, shade_fragment, shade_pixel};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result, Mat4, UVec2, Vec3, Vec4};
    pub use crate::mesh::{shapes, TriangleMesh};
    pub use crate::bvh::{Bvh, BvhOptions, BvhStats, Hit, Ray, SplitStrategy};
    pub use crate::gem::{
        exit_directions, sample_dispersion, shade_fragment, shade_pixel, trace_exit_direction,
        trace_internal, Fragment, GemGeometry, GemMaterial, GemMaterialDesc, TraceOutcome,
    };
    pub use crate::environment::{EnvParams, EnvironmentMap};
    pub use crate::camera::{CameraFrame, PerspectiveCamera};
    pub use crate::tonemap::ToneMapping;
    pub use crate::scene::{GemInstance, GemScene};
    pub use crate::render::{render, RenderOutput, RenderSettings};
    pub use crate::config::SceneConfig;
}
