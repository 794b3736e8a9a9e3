//! Gem instances placed in the world.
//!
//! Every sub-mesh gets its own BVH. Instances share a BVH through `Arc` when
//! the same mesh is placed more than once; the tree itself is never touched
//! after construction.

use std::sync::Arc;

use crate::bvh::{Bvh, BvhOptions, Ray};
use crate::gem::{Fragment, GemGeometry, GemMaterial};
use crate::mesh::TriangleMesh;
use crate::util::{face_forward, Error, Mat4, Result, Vec3};

/// One placed gem mesh.
#[derive(Debug, Clone)]
pub struct GemInstance {
    pub name: String,
    pub bvh: Arc<Bvh>,
    model: Mat4,
    model_inverse: Mat4,
    normal_matrix: Mat4,
    pub material: GemMaterial,
}

impl GemInstance {
    pub fn new(name: impl Into<String>, bvh: Arc<Bvh>, model: Mat4, material: GemMaterial) -> Self {
        let model_inverse = model.inverse();
        Self {
            name: name.into(),
            bvh,
            model,
            model_inverse,
            normal_matrix: model_inverse.transpose(),
            material,
        }
    }

    /// Build the BVH for `mesh` and place it.
    #[tracing::instrument(skip_all, fields(name = %name.as_ref(), triangles = mesh.triangle_count()))]
    pub fn from_mesh(
        name: impl AsRef<str>,
        mesh: &TriangleMesh,
        options: &BvhOptions,
        model: Mat4,
        material: GemMaterial,
    ) -> Result<Self> {
        material.validate()?;
        if !model.is_finite() || model.determinant().abs() < 1e-12 {
            return Err(Error::InvalidConfig(format!(
                "model matrix of `{}` is not invertible",
                name.as_ref()
            )));
        }
        let bvh = Bvh::build_with(mesh, options);
        tracing::debug!(stats = %bvh.stats(), "Instance BVH ready");
        Ok(Self::new(name.as_ref(), Arc::new(bvh), model, material))
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    /// Borrowed view for the tracer.
    pub fn geometry(&self) -> GemGeometry<'_> {
        GemGeometry {
            bvh: &self.bvh,
            model: self.model,
            model_inverse: self.model_inverse,
        }
    }

    /// Nearest world-space surface point along `ray`.
    pub fn intersect(&self, ray: &Ray) -> Option<Fragment> {
        let local = Ray::new(
            self.model_inverse.transform_point3(ray.origin),
            self.model_inverse.transform_vector3(ray.direction),
        );
        let hit = self.bvh.intersect_first(&local, None)?;

        let position = self.model.transform_point3(hit.point);
        let normal = self
            .normal_matrix
            .transform_vector3(hit.normal)
            .normalize_or_zero();
        Some(Fragment {
            instance: 0,
            position,
            normal: face_forward(normal, ray.direction),
            distance: (position - ray.origin).length(),
        })
    }
}

/// All gems in a frame.
#[derive(Debug, Clone, Default)]
pub struct GemScene {
    instances: Vec<GemInstance>,
}

impl GemScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, instance: GemInstance) -> usize {
        self.instances.push(instance);
        self.instances.len() - 1
    }

    pub fn instances(&self) -> &[GemInstance] {
        &self.instances
    }

    pub fn instance(&self, index: usize) -> Option<&GemInstance> {
        self.instances.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.instances.iter().map(|i| i.bvh.triangles().len()).sum()
    }

    /// Closest gem surface along a camera ray, across all instances.
    pub fn find_fragment(&self, ray: &Ray) -> Option<Fragment> {
        self.instances
            .iter()
            .enumerate()
            .filter_map(|(index, inst)| {
                inst.intersect(ray).map(|f| Fragment { instance: index, ..f })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    fn cube_at(x: f32) -> GemInstance {
        GemInstance::from_mesh(
            "cube",
            &shapes::unit_cube(),
            &BvhOptions::default(),
            Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
            GemMaterial::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_nearest_instance_wins() {
        let mut scene = GemScene::new();
        scene.add(cube_at(0.0));
        scene.add(cube_at(0.0));
        let far = scene.add(cube_at(-3.0));
        let near = scene.add(cube_at(3.0));
        assert_eq!(scene.triangle_count(), 48);

        let ray = Ray::new(Vec3::new(10.0, 0.1, 0.1), Vec3::NEG_X);
        let frag = scene.find_fragment(&ray).expect("hit");
        assert_eq!(frag.instance, near);
        assert!((frag.position.x - 3.5).abs() < 1e-5);
        assert!((frag.normal - Vec3::X).length() < 1e-5);
        assert!((frag.distance - 6.5).abs() < 1e-4);

        let back = Ray::new(Vec3::new(-10.0, 0.1, 0.1), Vec3::X);
        assert_eq!(scene.find_fragment(&back).map(|f| f.instance), Some(far));
    }

    #[test]
    fn test_scaled_instance_normals() {
        let inst = GemInstance::new(
            "flat",
            Arc::new(Bvh::build(&shapes::unit_cube())),
            Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0)),
            GemMaterial::default(),
        );
        let ray = Ray::new(Vec3::new(0.5, 5.0, 0.0), Vec3::NEG_Y);
        let frag = inst.intersect(&ray).expect("hit");
        assert!((frag.position - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-5);
        assert!((frag.normal - Vec3::Y).length() < 1e-5);
        assert!((frag.distance - 4.5).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_material_rejected() {
        let bad = GemMaterial {
            ior: f32::NAN,
            ..Default::default()
        };
        let result = GemInstance::from_mesh(
            "bad",
            &shapes::unit_cube(),
            &BvhOptions::default(),
            Mat4::IDENTITY,
            bad,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_singular_model_rejected() {
        let flat = GemInstance::from_mesh(
            "flat",
            &shapes::unit_cube(),
            &BvhOptions::default(),
            Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0)),
            GemMaterial::default(),
        );
        assert!(matches!(flat, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_scene_misses() {
        let scene = GemScene::new();
        assert!(scene.is_empty());
        assert!(scene.find_fragment(&Ray::new(Vec3::ZERO, Vec3::X)).is_none());
    }
}
