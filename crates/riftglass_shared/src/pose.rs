use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World transform of a portal surface or a camera.
///
/// Portal surfaces face along local `+Z`. Cameras follow the glam
/// right-handed convention and look along local `-Z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builds a pose from yaw (around `Y`), pitch (around `X`) and roll
    /// (around `Z`), given in degrees and applied in that order.
    pub fn from_euler_degrees(position: Vec3, euler_degrees: Vec3) -> Self {
        let rotation = Quat::from_euler(
            EulerRot::YXZ,
            euler_degrees.y.to_radians(),
            euler_degrees.x.to_radians(),
            euler_degrees.z.to_radians(),
        );
        Self::new(position, rotation)
    }

    /// Keeps only the rigid part of `matrix`. Cameras placed from a composed
    /// portal transform never inherit the portal's scale.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (_, rotation, position) = matrix.to_scale_rotation_translation();
        Self::new(position, rotation.normalize())
    }

    pub fn local_to_world(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    pub fn world_to_local(&self) -> Mat4 {
        self.local_to_world().inverse()
    }

    pub fn world_to_rigid_local(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn forward(&self) -> Vec3 {
        (self.rotation * Vec3::Z).normalize_or_zero()
    }

    pub fn up(&self) -> Vec3 {
        (self.rotation * Vec3::Y).normalize_or_zero()
    }

    pub fn right(&self) -> Vec3 {
        (self.rotation * Vec3::X).normalize_or_zero()
    }

    /// Expresses `child` (given in this pose's local frame) in world space.
    pub fn compose(&self, child: &Pose) -> Pose {
        let matrix = self.local_to_world() * child.local_to_world();
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Pose {
            position,
            rotation: rotation.normalize(),
            scale,
        }
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }
}
