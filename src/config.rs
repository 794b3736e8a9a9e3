//! JSON scene description.
//!
//! Every field is optional; missing fields take the defaults of the classic
//! diamond demo (camera at (0, 2, 5) looking at (0, 1, 0), 75 degree FOV,
//! ACES filmic at exposure 1, dark grey background).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bvh::{Bvh, BvhOptions};
use crate::camera::{CameraFrame, PerspectiveCamera};
use crate::environment::{EnvParams, EnvironmentMap};
use crate::gem::{GemMaterial, GemMaterialDesc};
use crate::mesh::shapes;
use crate::render::RenderSettings;
use crate::scene::{GemInstance, GemScene};
use crate::tonemap::ToneMapping;
use crate::util::{Error, Mat4, Result, UVec2, Vec3};

/// Complete render description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    // Output
    pub width: u32,
    pub height: u32,

    pub camera: CameraConfig,
    pub environment: EnvironmentConfig,

    // Display
    #[serde(alias = "toneMapping")]
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    pub background: [f32; 3],

    pub bvh: BvhOptions,
    pub gems: Vec<GemConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            camera: CameraConfig::default(),
            environment: EnvironmentConfig::default(),
            tone_mapping: ToneMapping::AcesFilmic,
            exposure: 1.0,
            background: [0.1, 0.1, 0.1],
            bvh: BvhOptions::default(),
            gems: vec![GemConfig::default()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    /// Vertical FOV in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let cam = PerspectiveCamera::default();
        Self {
            position: cam.position.to_array(),
            target: cam.target.to_array(),
            up: cam.up.to_array(),
            fov: cam.fov,
            near: cam.near,
            far: cam.far,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// HDR/EXR file; relative paths resolve against the config file.
    pub path: Option<PathBuf>,
    /// Uniform radiance used when no file is given.
    pub color: [f32; 3],
    pub intensity: f32,
    /// Rotation around +Y in degrees.
    pub rotation: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            path: None,
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            rotation: 0.0,
        }
    }
}

/// One gem placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GemConfig {
    pub name: String,
    /// Procedural shape: brilliant, cube or icosahedron.
    pub shape: String,
    /// Girdle corners for the brilliant cut.
    pub segments: Option<u32>,
    /// Smooth normals below this crease angle (degrees); facets otherwise.
    #[serde(alias = "smoothAngle")]
    pub smooth_angle: Option<f32>,
    pub translation: [f32; 3],
    /// XYZ Euler angles in degrees.
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub material: GemMaterialDesc,
}

impl Default for GemConfig {
    fn default() -> Self {
        Self {
            name: "Diamond".into(),
            shape: "brilliant".into(),
            segments: None,
            smooth_angle: None,
            translation: [0.0, 1.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
            material: GemMaterialDesc {
                bounces: 5,
                ..Default::default()
            },
        }
    }
}

impl GemConfig {
    pub fn model_matrix(&self) -> Mat4 {
        let [rx, ry, rz] = self.rotation.map(f32::to_radians);
        Mat4::from_scale_rotation_translation(
            Vec3::from_array(self.scale),
            glam::Quat::from_euler(glam::EulerRot::XYZ, rx, ry, rz),
            Vec3::from_array(self.translation),
        )
    }

    /// Reject placements whose transform cannot be inverted.
    pub fn validate(&self) -> Result<()> {
        let range = shapes::MIN_BRILLIANT_SEGMENTS..=shapes::MAX_BRILLIANT_SEGMENTS;
        if let Some(segments) = self.segments {
            if !range.contains(&segments) {
                return Err(Error::InvalidConfig(format!(
                    "gem `{}`: segments must be in {}..={}, got {segments}",
                    self.name,
                    range.start(),
                    range.end()
                )));
            }
        }
        let finite = |v: &[f32; 3]| v.iter().all(|c| c.is_finite());
        if !finite(&self.translation) || !finite(&self.rotation) {
            return Err(Error::InvalidConfig(format!(
                "gem `{}`: translation and rotation must be finite",
                self.name
            )));
        }
        if !finite(&self.scale) || self.scale.iter().any(|c| c.abs() < 1e-6) {
            return Err(Error::InvalidConfig(format!(
                "gem `{}`: scale components must be finite and non-zero, got {:?}",
                self.name, self.scale
            )));
        }
        Ok(())
    }

    fn mesh_key(&self) -> (String, Option<u32>, Option<u32>) {
        (
            self.shape.to_ascii_lowercase(),
            self.segments,
            self.smooth_angle.map(f32::to_bits),
        )
    }
}

impl SceneConfig {
    /// Load from a JSON file. Relative environment paths are resolved
    /// against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&text)?;
        if let (Some(env), Some(dir)) = (&config.environment.path, path.parent()) {
            if env.is_relative() {
                config.environment.path = Some(dir.join(env));
            }
        }
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would make the frame meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        self.camera().validate()?;
        if !self.exposure.is_finite() || self.exposure < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "exposure must be finite and >= 0, got {}",
                self.exposure
            )));
        }
        for gem in &self.gems {
            GemMaterial::try_from(&gem.material)?;
            if !shapes::is_known(&gem.shape.to_ascii_lowercase()) {
                return Err(Error::UnknownShape(gem.shape.clone()));
            }
            gem.validate()?;
        }
        Ok(())
    }

    pub fn resolution(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    pub fn camera(&self) -> PerspectiveCamera {
        PerspectiveCamera {
            position: Vec3::from_array(self.camera.position),
            target: Vec3::from_array(self.camera.target),
            up: Vec3::from_array(self.camera.up),
            fov: self.camera.fov,
            near: self.camera.near,
            far: self.camera.far,
        }
    }

    pub fn camera_frame(&self) -> CameraFrame {
        self.camera().frame(self.resolution())
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            tone_mapping: self.tone_mapping,
            exposure: self.exposure,
            background: Vec3::from_array(self.background),
        }
    }

    /// Load the environment file, or build the uniform fallback.
    pub fn environment_map(&self) -> Result<EnvironmentMap> {
        let env = &self.environment;
        let map = match &env.path {
            Some(path) => EnvironmentMap::load(path)?,
            None => EnvironmentMap::solid(Vec3::from_array(env.color)),
        };
        Ok(map.with_params(EnvParams {
            intensity: env.intensity,
            rotation: env.rotation.to_radians(),
        }))
    }

    /// Build every gem. Placements of the same mesh share one BVH.
    #[tracing::instrument(skip_all, fields(gems = self.gems.len()))]
    pub fn build_scene(&self) -> Result<GemScene> {
        let mut cache: HashMap<_, Arc<Bvh>> = HashMap::new();
        let mut scene = GemScene::new();

        for gem in &self.gems {
            let material = GemMaterial::try_from(&gem.material)?;
            let bvh = match cache.get(&gem.mesh_key()) {
                Some(bvh) => Arc::clone(bvh),
                None => {
                    let mut mesh = match (gem.shape.to_ascii_lowercase().as_str(), gem.segments) {
                        ("brilliant" | "diamond", Some(segments)) => shapes::round_brilliant(segments),
                        (name, _) => shapes::by_name(name)?,
                    };
                    if let Some(angle) = gem.smooth_angle {
                        mesh = mesh.smoothed(angle);
                    }
                    let bvh = Arc::new(Bvh::build_with(&mesh, &self.bvh));
                    cache.insert(gem.mesh_key(), Arc::clone(&bvh));
                    bvh
                }
            };
            tracing::debug!(name = %gem.name, stats = %bvh.stats(), "Gem placed");
            scene.add(GemInstance::new(&gem.name, bvh, gem.model_matrix(), material));
        }

        tracing::info!(
            instances = scene.instances().len(),
            meshes = cache.len(),
            triangles = scene.triangle_count(),
            "Scene built"
        );
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = SceneConfig::from_json("{}").unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.camera.position, [0.0, 2.0, 5.0]);
        assert_eq!(config.camera.target, [0.0, 1.0, 0.0]);
        assert_eq!(config.camera.fov, 75.0);
        assert_eq!(config.background, [0.1, 0.1, 0.1]);
        assert_eq!(config.tone_mapping, ToneMapping::AcesFilmic);
        assert_eq!(config.gems.len(), 1);
        let m = GemMaterial::try_from(&config.gems[0].material).unwrap();
        assert_eq!(m.bounces, 5);
        assert_eq!(m.ior, 2.4);
    }

    #[test]
    fn test_negative_bounces_rejected() {
        let json = r#"{ "gems": [ { "material": { "bounces": -2 } } ] }"#;
        let err = SceneConfig::from_json(json).unwrap_err();
        assert!(matches!(err, Error::InvalidMaterial { param: "bounces", .. }), "{err}");
    }

    #[test]
    fn test_unknown_shape_rejected() {
        let json = r#"{ "gems": [ { "shape": "pear" } ] }"#;
        assert!(matches!(SceneConfig::from_json(json), Err(Error::UnknownShape(_))));
    }

    #[test]
    fn test_bad_resolution_rejected() {
        assert!(SceneConfig::from_json(r#"{ "width": 0 }"#).is_err());
        assert!(SceneConfig::from_json(r#"{ "camera": { "fov": 180 } }"#).is_err());
    }

    #[test]
    fn test_segment_count_bounded() {
        let json = r#"{ "gems": [ { "shape": "brilliant", "segments": 4294967295 } ] }"#;
        assert!(matches!(SceneConfig::from_json(json), Err(Error::InvalidConfig(_))));
        let json = r#"{ "gems": [ { "shape": "brilliant", "segments": 2 } ] }"#;
        assert!(SceneConfig::from_json(json).is_err());
        let json = r#"{ "gems": [ { "shape": "brilliant", "segments": 4096 } ] }"#;
        assert!(SceneConfig::from_json(json).is_ok());
    }

    #[test]
    fn test_zero_scale_rejected() {
        let json = r#"{ "gems": [ { "scale": [1, 0, 1] } ] }"#;
        assert!(matches!(SceneConfig::from_json(json), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_degenerate_camera_rejected() {
        let json = r#"{ "camera": { "position": [1, 1, 1], "target": [1, 1, 1] } }"#;
        assert!(matches!(SceneConfig::from_json(json), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_camera_straight_above_gem_renders() {
        let json = r#"{
            "width": 16,
            "height": 16,
            "camera": { "position": [0, 5, 0], "target": [0, 0, 0], "fov": 30 },
            "gems": [ { "shape": "cube", "translation": [0, 0, 0] } ]
        }"#;
        let config = SceneConfig::from_json(json).unwrap();
        let frame = config.camera_frame();
        assert!(frame.view_inverse.is_finite());
        let scene = config.build_scene().unwrap();
        let env = config.environment_map().unwrap();
        let out = crate::render::render(&frame, &scene, &env, &config.render_settings());
        assert!(out.pixel(8, 8).is_some());
        assert!(out.covered_pixels() > 0);
    }

    #[test]
    fn test_shared_meshes_share_bvh() {
        let json = r#"{
            "gems": [
                { "name": "Diamond", "material": { "bounces": 5 } },
                { "name": "Side", "translation": [2, 0, 0], "material": { "bounces": 2 } },
                { "name": "Cube", "shape": "cube" }
            ]
        }"#;
        let scene = SceneConfig::from_json(json).unwrap().build_scene().unwrap();
        let inst = scene.instances();
        assert_eq!(inst.len(), 3);
        assert!(Arc::ptr_eq(&inst[0].bvh, &inst[1].bvh));
        assert!(!Arc::ptr_eq(&inst[0].bvh, &inst[2].bvh));
        assert_eq!(inst[1].material.bounces, 2);
    }

    #[test]
    fn test_model_matrix() {
        let gem = GemConfig {
            translation: [1.0, 2.0, 3.0],
            rotation: [0.0, 90.0, 0.0],
            scale: [2.0, 2.0, 2.0],
            ..Default::default()
        };
        let p = gem.model_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-5, "{p:?}");
    }

    #[test]
    fn test_load_resolves_relative_env_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        std::fs::write(&path, r#"{ "environment": { "path": "studio.hdr" } }"#).unwrap();
        let config = SceneConfig::load(&path).unwrap();
        assert_eq!(config.environment.path, Some(dir.path().join("studio.hdr")));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SceneConfig::default();
        let text = config.to_json().unwrap();
        let back = SceneConfig::from_json(&text).unwrap();
        assert_eq!(back.gems[0].name, "Diamond");
        assert_eq!(back.bvh, config.bvh);
    }
}
