use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::pose::Pose;
use crate::settings::PortalSettings;

/// Pushes the clip plane slightly towards the camera so the portal surface
/// itself does not z-fight with the clipped geometry.
pub const NEAR_CLIP_OFFSET: f32 = 0.05;
/// Below this camera-space plane distance the oblique projection is unstable.
pub const NEAR_CLIP_LIMIT: f32 = 0.2;

const MIN_OBLIQUE_DENOM: f32 = 1.0e-5;

/// Clip-space depth range of the projection being modified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipDepth {
    /// `glam::Mat4::perspective_rh`, wgpu and D3D.
    #[default]
    ZeroToOne,
    /// `glam::Mat4::perspective_rh_gl`, OpenGL.
    NegativeOneToOne,
}

/// Portal plane in render-camera space. Points with
/// `normal.dot(p) + distance > 0` survive the clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSpacePlane {
    pub normal: Vec3,
    pub distance: f32,
}

impl CameraSpacePlane {
    pub fn as_vec4(&self) -> Vec4 {
        self.normal.extend(self.distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippedProjection {
    pub matrix: Mat4,
    pub oblique: bool,
}

/// Replaces a render camera's near plane with the portal plane so nothing
/// between the camera and the destination portal is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObliqueClipPlaneCalculator {
    offset: f32,
    limit: f32,
    depth: ClipDepth,
}

impl Default for ObliqueClipPlaneCalculator {
    fn default() -> Self {
        Self::new(NEAR_CLIP_OFFSET, NEAR_CLIP_LIMIT, ClipDepth::default())
    }
}

impl ObliqueClipPlaneCalculator {
    pub fn new(offset: f32, limit: f32, depth: ClipDepth) -> Self {
        Self {
            offset,
            limit,
            depth,
        }
    }

    pub fn from_settings(settings: &PortalSettings) -> Self {
        Self::new(
            settings.near_clip_offset,
            settings.near_clip_limit,
            settings.clip_depth,
        )
    }

    /// Expresses the portal plane in camera space, oriented so the camera
    /// lies on its negative side.
    pub fn camera_space_plane(
        &self,
        portal: &Pose,
        camera_position: Vec3,
        world_to_camera: Mat4,
    ) -> CameraSpacePlane {
        let forward = portal.forward();
        let facing = sign(forward.dot(portal.position - camera_position));

        let position = world_to_camera.transform_point3(portal.position);
        let normal = world_to_camera.transform_vector3(forward) * facing;
        let distance = -position.dot(normal) + self.offset;

        CameraSpacePlane { normal, distance }
    }

    pub fn apply(&self, plane: &CameraSpacePlane, base_projection: Mat4) -> ClippedProjection {
        if plane.distance.abs() > self.limit {
            ClippedProjection {
                matrix: oblique_projection(base_projection, plane.as_vec4(), self.depth),
                oblique: true,
            }
        } else {
            ClippedProjection {
                matrix: base_projection,
                oblique: false,
            }
        }
    }

    pub fn clip(
        &self,
        portal: &Pose,
        camera_position: Vec3,
        world_to_camera: Mat4,
        base_projection: Mat4,
    ) -> ClippedProjection {
        let plane = self.camera_space_plane(portal, camera_position, world_to_camera);
        self.apply(&plane, base_projection)
    }
}

/// Oblique near-plane projection (Lengyel). `clip_plane` is in camera space
/// with the camera on its negative side.
pub fn oblique_projection(projection: Mat4, clip_plane: Vec4, depth: ClipDepth) -> Mat4 {
    let far_corner = projection.inverse()
        * Vec4::new(clip_plane.x.signum(), clip_plane.y.signum(), 1.0, 1.0);
    let denom = clip_plane.dot(far_corner);
    if denom.abs() < MIN_OBLIQUE_DENOM {
        return projection;
    }

    let mut m = projection.to_cols_array_2d();
    match depth {
        ClipDepth::ZeroToOne => {
            let c = clip_plane / denom;
            m[0][2] = c.x;
            m[1][2] = c.y;
            m[2][2] = c.z;
            m[3][2] = c.w;
        }
        ClipDepth::NegativeOneToOne => {
            let c = clip_plane * (2.0 / denom);
            m[0][2] = c.x - m[0][3];
            m[1][2] = c.y - m[1][3];
            m[2][2] = c.z - m[2][3];
            m[3][2] = c.w - m[3][3];
        }
    }
    Mat4::from_cols_array_2d(&m)
}

fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
