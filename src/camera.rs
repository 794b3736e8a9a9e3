//! Per-frame camera inputs.
//!
//! The shading entry point only needs the inverse projection, the
//! camera-to-world matrix and the viewport size ([`CameraFrame`]).
//! [`PerspectiveCamera`] is a convenience for building them.

use crate::bvh::Ray;
use crate::util::{Error, Mat4, Result, UVec2, Vec2, Vec3, Vec4};

/// Look-at perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical FOV in degrees
    pub fov: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::new(0.0, 1.0, 0.0),
            up: Vec3::Y,
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl PerspectiveCamera {
    /// Reject cameras that cannot produce a view matrix.
    pub fn validate(&self) -> Result<()> {
        if !self.position.is_finite() || !self.target.is_finite() || !self.up.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "camera vectors must be finite (position {:?}, target {:?}, up {:?})",
                self.position, self.target, self.up
            )));
        }
        if (self.target - self.position).try_normalize().is_none() {
            return Err(Error::InvalidConfig(format!(
                "camera target coincides with its position {:?}",
                self.position
            )));
        }
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(Error::InvalidConfig(format!(
                "camera fov must be in (0, 180), got {}",
                self.fov
            )));
        }
        Ok(())
    }

    /// Up vector actually used: `up`, or the closest world axis that is not
    /// parallel to the view direction.
    pub fn effective_up(&self) -> Vec3 {
        let forward = (self.target - self.position).normalize_or_zero();
        let up = self.up.normalize_or_zero();
        if forward.cross(up).length_squared() > 1e-8 {
            return up;
        }
        if forward.y.abs() < 0.9 {
            Vec3::Y
        } else {
            Vec3::NEG_Z
        }
    }

    /// World to camera.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.effective_up())
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        // 0..1 depth, as wgpu and Vulkan expect
        Mat4::perspective_rh(self.fov.to_radians(), aspect, self.near, self.far)
    }

    /// Matrices for a `width x height` viewport.
    pub fn frame(&self, resolution: UVec2) -> CameraFrame {
        let aspect = resolution.x.max(1) as f32 / resolution.y.max(1) as f32;
        CameraFrame {
            projection_inverse: self.projection_matrix(aspect).inverse(),
            view_inverse: self.view_matrix().inverse(),
            resolution,
        }
    }
}

/// Camera state for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    /// Clip space to view space.
    pub projection_inverse: Mat4,
    /// Camera to world.
    pub view_inverse: Mat4,
    /// Viewport size in pixels.
    pub resolution: UVec2,
}

impl CameraFrame {
    pub fn camera_position(&self) -> Vec3 {
        self.view_inverse.w_axis.truncate()
    }

    /// World-space ray through `pixel` (pixel coordinates, row 0 at the top;
    /// pass `x + 0.5` for a pixel centre).
    pub fn primary_ray(&self, pixel: Vec2) -> Ray {
        let size = self.resolution.max(UVec2::ONE).as_vec2();
        let ndc = Vec2::new(
            2.0 * pixel.x / size.x - 1.0,
            1.0 - 2.0 * pixel.y / size.y,
        );
        // Any depth on the ray works; mid-range keeps w well away from 0
        let clip = Vec4::new(ndc.x, ndc.y, 0.5, 1.0);
        let view = self.projection_inverse * clip;
        let view_dir = (view.truncate() / view.w).normalize_or_zero();
        let world_dir = self.view_inverse.transform_vector3(view_dir);
        Ray::new(self.camera_position(), world_dir)
    }

    /// Ray through the centre of pixel `(x, y)`.
    #[inline]
    pub fn pixel_ray(&self, x: u32, y: u32) -> Ray {
        self.primary_ray(Vec2::new(x as f32 + 0.5, y as f32 + 0.5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centre_ray_hits_target() {
        let camera = PerspectiveCamera::default();
        let frame = camera.frame(UVec2::new(64, 48));
        assert!((frame.camera_position() - camera.position).length() < 1e-5);

        let ray = frame.primary_ray(Vec2::new(32.0, 24.0));
        let expected = (camera.target - camera.position).normalize();
        assert!((ray.direction - expected).length() < 1e-4, "{:?}", ray.direction);
    }

    #[test]
    fn test_corner_orientation() {
        let camera = PerspectiveCamera {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            ..Default::default()
        };
        let frame = camera.frame(UVec2::new(100, 100));
        let top_left = frame.pixel_ray(0, 0);
        assert!(top_left.direction.x < 0.0);
        assert!(top_left.direction.y > 0.0);
        let bottom_right = frame.pixel_ray(99, 99);
        assert!(bottom_right.direction.x > 0.0);
        assert!(bottom_right.direction.y < 0.0);
    }

    #[test]
    fn test_straight_down_view_stays_finite() {
        // Default up is parallel to the view direction here
        let camera = PerspectiveCamera {
            position: Vec3::new(0.0, 5.0, 0.0),
            target: Vec3::ZERO,
            ..Default::default()
        };
        assert!(camera.validate().is_ok());
        let frame = camera.frame(UVec2::new(8, 8));
        assert!(frame.view_inverse.is_finite());
        let ray = frame.primary_ray(Vec2::new(4.0, 4.0));
        assert!((ray.direction - Vec3::NEG_Y).length() < 1e-4, "{:?}", ray.direction);

        // Straight up and a zero up vector get a fallback as well
        for camera in [
            PerspectiveCamera {
                position: Vec3::ZERO,
                target: Vec3::new(0.0, 3.0, 0.0),
                ..Default::default()
            },
            PerspectiveCamera {
                up: Vec3::ZERO,
                ..Default::default()
            },
        ] {
            assert!(camera.view_matrix().is_finite());
        }
    }

    #[test]
    fn test_degenerate_camera_rejected() {
        let same = PerspectiveCamera {
            position: Vec3::ONE,
            target: Vec3::ONE,
            ..Default::default()
        };
        assert!(same.validate().is_err());
        let nan = PerspectiveCamera {
            position: Vec3::splat(f32::NAN),
            ..Default::default()
        };
        assert!(nan.validate().is_err());
        let wide = PerspectiveCamera {
            fov: 180.0,
            ..Default::default()
        };
        assert!(wide.validate().is_err());
    }

    #[test]
    fn test_vertical_fov() {
        let camera = PerspectiveCamera {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            fov: 90.0,
            ..Default::default()
        };
        let frame = camera.frame(UVec2::new(10, 10));
        let top = frame.primary_ray(Vec2::new(5.0, 0.0));
        // Half of a 90 degree FOV
        let angle = top.direction.angle_between(Vec3::NEG_Z).to_degrees();
        assert!((angle - 45.0).abs() < 1e-2, "{angle}");
    }
}
