use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::layers::LayerMask;
use crate::pose::Pose;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perspective {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Perspective {
    fn default() -> Self {
        Self {
            fov_y: 70.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Perspective {
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y,
            self.aspect.max(0.0001),
            self.near.max(0.0001),
            self.far.max(self.near + 0.0001),
        )
    }
}

pub fn world_to_camera(pose: &Pose) -> Mat4 {
    pose.world_to_rigid_local()
}

/// The user's viewpoint. Its culling mask is rewritten on portal transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerCamera {
    pub pose: Pose,
    pub perspective: Perspective,
    pub culling_mask: LayerMask,
}

impl Default for ViewerCamera {
    fn default() -> Self {
        Self {
            pose: Pose::IDENTITY,
            perspective: Perspective::default(),
            culling_mask: LayerMask::DEFAULT,
        }
    }
}

impl ViewerCamera {
    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn look_direction(&self) -> Vec3 {
        (self.pose.rotation * Vec3::NEG_Z).normalize_or_zero()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.perspective.projection_matrix()
    }

    pub fn view_matrix(&self) -> Mat4 {
        world_to_camera(&self.pose)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderCamera {
    pub pose: Pose,
    /// Projection copied from the viewer before any clip adjustment.
    pub base_projection: Mat4,
    pub projection: Mat4,
    pub oblique: bool,
    pub culling_mask: LayerMask,
}

impl RenderCamera {
    pub fn view_matrix(&self) -> Mat4 {
        world_to_camera(&self.pose)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3, Vec4};

    use super::{Perspective, ViewerCamera};
    use crate::pose::Pose;

    #[test]
    fn view_matrix_moves_camera_to_origin_looking_down_negative_z() {
        let camera = ViewerCamera {
            pose: Pose::new(Vec3::new(0.0, 1.5, 4.0), Quat::IDENTITY),
            ..ViewerCamera::default()
        };
        let ahead = camera.position() + camera.look_direction() * 3.0;
        let in_camera = camera.view_matrix().transform_point3(ahead);

        assert!(in_camera.abs_diff_eq(Vec3::new(0.0, 0.0, -3.0), 1.0e-5));
    }

    #[test]
    fn projection_maps_near_and_far_to_unit_depth_range() {
        let perspective = Perspective::default();
        let proj = perspective.projection_matrix();

        let near = proj * Vec4::new(0.0, 0.0, -perspective.near, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -perspective.far, 1.0);
        assert!((near.z / near.w).abs() < 1.0e-4);
        assert!((far.z / far.w - 1.0).abs() < 1.0e-4);
    }
}
