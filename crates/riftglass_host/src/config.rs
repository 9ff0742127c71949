use std::fs;
use std::io;
use std::path::Path;

use glam::{Quat, Vec3};
use riftglass_shared::camera::{Perspective, ViewerCamera};
use riftglass_shared::layers::LayerMask;
use riftglass_shared::pose::Pose;
use riftglass_shared::settings::{finite_or, PortalSettings};
use serde::{Deserialize, Serialize};

const MIN_FOV: f32 = 10.0;
const MAX_FOV: f32 = 150.0;
const MIN_WAYPOINT_FRAMES: u32 = 1;
const MAX_WAYPOINT_FRAMES: u32 = 100_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub settings: PortalSettings,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub portals: Vec<PortalConfig>,
    #[serde(default)]
    pub path: Vec<Waypoint>,
    #[serde(default)]
    pub placement: PlacementConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_viewer_position")]
    pub position: Vec3,
    #[serde(default)]
    pub yaw_degrees: f32,
    #[serde(default)]
    pub pitch_degrees: f32,
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_aspect")]
    pub aspect: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    #[serde(default = "default_mask")]
    pub culling_mask: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            position: default_viewer_position(),
            yaw_degrees: 0.0,
            pitch_degrees: 0.0,
            fov_degrees: default_fov(),
            aspect: default_aspect(),
            near: default_near(),
            far: default_far(),
            culling_mask: default_mask(),
        }
    }
}

impl ViewerConfig {
    pub fn camera(&self) -> ViewerCamera {
        ViewerCamera {
            pose: Pose::new(self.position, look_rotation(self.yaw_degrees, self.pitch_degrees)),
            perspective: Perspective {
                fov_y: self.fov_degrees.to_radians(),
                aspect: self.aspect,
                near: self.near,
                far: self.far,
            },
            culling_mask: LayerMask::from_bits_retain(self.culling_mask),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    /// Pitch, yaw, roll in degrees.
    #[serde(default)]
    pub rotation_degrees: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    /// Destination portal by name. Unset links the portal to itself.
    #[serde(default)]
    pub linked_to: Option<String>,
    pub contents_mask: u32,
    #[serde(default = "default_mask")]
    pub default_mask: u32,
    /// Half size of the trigger box in portal space.
    #[serde(default = "default_trigger_half_extents")]
    pub trigger_half_extents: Vec3,
}

impl PortalConfig {
    pub fn pose(&self) -> Pose {
        Pose::from_euler_degrees(self.position, self.rotation_degrees).with_scale(self.scale)
    }
}

/// Viewer walks in a straight line from the previous waypoint over `frames`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Vec3,
    #[serde(default)]
    pub yaw_degrees: f32,
    #[serde(default)]
    pub pitch_degrees: f32,
    #[serde(default = "default_waypoint_frames")]
    pub frames: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub ground_height: f32,
    #[serde(default = "default_screen_width")]
    pub screen_width: f32,
    #[serde(default = "default_screen_height")]
    pub screen_height: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ground_height: 0.0,
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
        }
    }
}

impl SceneConfig {
    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> io::Result<Self> {
        let parsed = toml::from_str::<Self>(contents).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to deserialize scene: {e}"),
            )
        })?;
        Ok(parsed.sanitize())
    }

    pub fn to_toml_string(&self) -> io::Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to serialize scene: {e}"),
            )
        })
    }

    pub fn total_frames(&self) -> u64 {
        self.path.iter().map(|waypoint| u64::from(waypoint.frames)).sum()
    }

    fn sanitize(mut self) -> Self {
        self.settings = self.settings.sanitize();
        let viewer = &mut self.viewer;
        viewer.position = finite_vec_or(viewer.position, default_viewer_position());
        viewer.yaw_degrees = finite_or(viewer.yaw_degrees, 0.0);
        viewer.pitch_degrees = finite_or(viewer.pitch_degrees, 0.0);
        viewer.fov_degrees = finite_or(viewer.fov_degrees, default_fov()).clamp(MIN_FOV, MAX_FOV);
        viewer.aspect = finite_or(viewer.aspect, default_aspect()).max(0.0001);
        viewer.near = finite_or(viewer.near, default_near()).max(0.0001);
        viewer.far = finite_or(viewer.far, default_far()).max(viewer.near + 0.0001);
        for waypoint in &mut self.path {
            waypoint.position = finite_vec_or(waypoint.position, Vec3::ZERO);
            waypoint.yaw_degrees = finite_or(waypoint.yaw_degrees, 0.0);
            waypoint.pitch_degrees = finite_or(waypoint.pitch_degrees, 0.0);
            waypoint.frames = waypoint
                .frames
                .clamp(MIN_WAYPOINT_FRAMES, MAX_WAYPOINT_FRAMES);
        }
        for portal in &mut self.portals {
            portal.position = finite_vec_or(portal.position, Vec3::ZERO);
            portal.rotation_degrees = finite_vec_or(portal.rotation_degrees, Vec3::ZERO);
            portal.scale = finite_vec_or(portal.scale, default_scale());
            portal.trigger_half_extents =
                finite_vec_or(portal.trigger_half_extents, default_trigger_half_extents()).abs();
        }
        self.placement.ground_height = finite_or(self.placement.ground_height, 0.0);
        self.placement.screen_width =
            finite_or(self.placement.screen_width, default_screen_width()).max(1.0);
        self.placement.screen_height =
            finite_or(self.placement.screen_height, default_screen_height()).max(1.0);
        self
    }
}

fn finite_vec_or(value: Vec3, fallback: Vec3) -> Vec3 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

pub fn look_rotation(yaw_degrees: f32, pitch_degrees: f32) -> Quat {
    Quat::from_rotation_y(yaw_degrees.to_radians()) * Quat::from_rotation_x(pitch_degrees.to_radians())
}

fn default_viewer_position() -> Vec3 {
    Vec3::new(0.0, 1.6, 5.0)
}

fn default_fov() -> f32 {
    70.0
}

fn default_aspect() -> f32 {
    16.0 / 9.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

fn default_mask() -> u32 {
    LayerMask::DEFAULT.bits()
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_trigger_half_extents() -> Vec3 {
    Vec3::new(0.5, 1.0, 0.25)
}

fn default_waypoint_frames() -> u32 {
    60
}

fn default_screen_width() -> f32 {
    1920.0
}

fn default_screen_height() -> f32 {
    1080.0
}
