use glam::{Quat, Vec2, Vec3, Vec4};
use riftglass_core::placement::SurfaceProbe;
use riftglass_shared::camera::ViewerCamera;
use riftglass_shared::pose::Pose;

const PARALLEL_EPSILON: f32 = 1.0e-6;

/// Casts a ray from the viewer through a screen point onto a horizontal
/// ground plane. The resolved pose faces back towards the viewer.
pub struct GroundProbe<'a> {
    camera: &'a ViewerCamera,
    screen_size: Vec2,
    ground_height: f32,
}

impl<'a> GroundProbe<'a> {
    pub fn new(camera: &'a ViewerCamera, screen_size: Vec2, ground_height: f32) -> Self {
        Self {
            camera,
            screen_size,
            ground_height,
        }
    }

    fn screen_ray(&self, screen_point: Vec2) -> (Vec3, Vec3) {
        let size = self.screen_size.max(Vec2::ONE);
        let ndc = Vec2::new(
            screen_point.x / size.x * 2.0 - 1.0,
            1.0 - screen_point.y / size.y * 2.0,
        );
        let inv_view_proj = self.camera.view_projection_matrix().inverse();
        let near = inv_view_proj * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far = inv_view_proj * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;
        (near, (far - near).normalize_or_zero())
    }
}

impl SurfaceProbe for GroundProbe<'_> {
    fn probe(&mut self, screen_point: Vec2) -> Option<Pose> {
        let (origin, direction) = self.screen_ray(screen_point);
        if direction.y.abs() < PARALLEL_EPSILON {
            return None;
        }

        let t = (self.ground_height - origin.y) / direction.y;
        if t <= 0.0 {
            return None;
        }

        let hit = origin + direction * t;
        let to_viewer = self.camera.position() - hit;
        let yaw = to_viewer.x.atan2(to_viewer.z);
        Some(Pose::new(hit, Quat::from_rotation_y(yaw)))
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec2, Vec3};
    use riftglass_core::placement::SurfaceProbe;
    use riftglass_shared::camera::ViewerCamera;
    use riftglass_shared::pose::Pose;

    use super::GroundProbe;

    #[test]
    fn downward_view_hits_ground_in_front_of_viewer() {
        let camera = ViewerCamera {
            pose: Pose::new(Vec3::new(0.0, 2.0, 0.0), Quat::from_rotation_x(-0.5)),
            ..ViewerCamera::default()
        };
        let screen = Vec2::new(1920.0, 1080.0);
        let mut probe = GroundProbe::new(&camera, screen, 0.0);

        let pose = probe.probe(screen * 0.5).expect("ground should be hit");
        assert!(pose.position.y.abs() < 1.0e-3);
        assert!(pose.position.z < 0.0);
        assert!(pose.position.x.abs() < 1.0e-3);
        assert!(pose.forward().z > 0.99, "forward was {:?}", pose.forward());
    }

    #[test]
    fn upward_view_misses_ground() {
        let camera = ViewerCamera {
            pose: Pose::new(Vec3::new(0.0, 2.0, 0.0), Quat::from_rotation_x(0.5)),
            ..ViewerCamera::default()
        };
        let screen = Vec2::new(1920.0, 1080.0);
        let mut probe = GroundProbe::new(&camera, screen, 0.0);

        assert_eq!(probe.probe(screen * 0.5), None);
    }
}
