use crate::camera::{world_to_camera, RenderCamera, ViewerCamera};
use crate::clip::ObliqueClipPlaneCalculator;
use crate::layers::LayerMask;
use crate::pose::Pose;
use crate::settings::PortalSettings;

/// `destination ∘ inverse(source) ∘ viewer`. Composition order matters.
pub fn render_pose(viewer: &Pose, source: &Pose, destination: &Pose) -> Pose {
    let matrix = destination.local_to_world() * source.world_to_local() * viewer.local_to_world();
    Pose::from_matrix(matrix)
}

/// Places a portal's render camera from the viewer each frame. Holds no
/// per-frame state: the result depends only on the current transforms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewCameraSynchronizer {
    clip: ObliqueClipPlaneCalculator,
}

impl ViewCameraSynchronizer {
    pub fn new(clip: ObliqueClipPlaneCalculator) -> Self {
        Self { clip }
    }

    pub fn from_settings(settings: &PortalSettings) -> Self {
        Self::new(ObliqueClipPlaneCalculator::from_settings(settings))
    }

    pub fn clip_calculator(&self) -> &ObliqueClipPlaneCalculator {
        &self.clip
    }

    /// The clip plane is the destination portal, since that is the frame the
    /// render camera is re-expressed in.
    pub fn synchronize(
        &self,
        viewer: &ViewerCamera,
        source: &Pose,
        destination: &Pose,
        culling_mask: LayerMask,
    ) -> RenderCamera {
        let pose = render_pose(&viewer.pose, source, destination);
        let base_projection = viewer.projection_matrix();
        let clipped = self.clip.clip(
            destination,
            pose.position,
            world_to_camera(&pose),
            base_projection,
        );

        RenderCamera {
            pose,
            base_projection,
            projection: clipped.matrix,
            oblique: clipped.oblique,
            culling_mask,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use glam::{Quat, Vec3};

    use super::{render_pose, ViewCameraSynchronizer};
    use crate::camera::ViewerCamera;
    use crate::layers::LayerMask;
    use crate::pose::Pose;

    fn assert_pose_near(actual: &Pose, expected: &Pose) {
        assert!(
            actual.position.abs_diff_eq(expected.position, 1.0e-4),
            "position {:?} != {:?}",
            actual.position,
            expected.position
        );
        let same = actual.rotation.abs_diff_eq(expected.rotation, 1.0e-4)
            || actual.rotation.abs_diff_eq(-expected.rotation, 1.0e-4);
        assert!(same, "rotation {:?} != {:?}", actual.rotation, expected.rotation);
    }

    #[test]
    fn render_pose_is_destination_times_inverse_source_times_viewer() {
        let source = Pose::new(Vec3::new(2.0, 0.0, -3.0), Quat::from_rotation_y(0.4));
        let destination = Pose::new(Vec3::new(-10.0, 1.0, 6.0), Quat::from_rotation_y(-1.3));
        let viewer = Pose::new(Vec3::new(1.0, 1.7, 2.0), Quat::from_rotation_x(-0.2));

        let expected = Pose::from_matrix(
            destination.local_to_world() * source.world_to_local() * viewer.local_to_world(),
        );
        assert_pose_near(&render_pose(&viewer, &source, &destination), &expected);

        let reversed = Pose::from_matrix(
            viewer.local_to_world() * source.world_to_local() * destination.local_to_world(),
        );
        assert!(!render_pose(&viewer, &source, &destination)
            .position
            .abs_diff_eq(reversed.position, 1.0e-3));
    }

    #[test]
    fn viewer_offset_is_carried_into_destination_frame() {
        let source = Pose::IDENTITY;
        let destination = Pose::new(Vec3::new(20.0, 0.0, 0.0), Quat::from_rotation_y(FRAC_PI_2));
        let viewer = Pose::new(Vec3::new(0.0, 1.0, 3.0), Quat::IDENTITY);

        let pose = render_pose(&viewer, &source, &destination);
        assert_pose_near(
            &pose,
            &Pose::new(Vec3::new(23.0, 1.0, 0.0), Quat::from_rotation_y(FRAC_PI_2)),
        );
    }

    #[test]
    fn self_linked_portal_reproduces_viewer_pose() {
        let portal = Pose::new(Vec3::new(3.0, 0.0, 1.0), Quat::from_rotation_y(PI));
        let viewer = Pose::new(Vec3::new(0.0, 1.6, 5.0), Quat::from_rotation_y(0.7));

        assert_pose_near(&render_pose(&viewer, &portal, &portal), &viewer);
    }

    #[test]
    fn synchronize_has_no_memory_of_previous_frames() {
        let sync = ViewCameraSynchronizer::default();
        let source = Pose::IDENTITY;
        let destination = Pose::new(Vec3::new(0.0, 0.0, -30.0), Quat::from_rotation_y(PI));
        let mut viewer = ViewerCamera {
            pose: Pose::new(Vec3::new(0.0, 1.5, 4.0), Quat::IDENTITY),
            ..ViewerCamera::default()
        };

        let first = sync.synchronize(&viewer, &source, &destination, LayerMask::layer(8));

        viewer.pose.position = Vec3::new(-6.0, 2.0, 9.0);
        let _ = sync.synchronize(&viewer, &source, &destination, LayerMask::layer(8));

        viewer.pose.position = Vec3::new(0.0, 1.5, 4.0);
        let again = sync.synchronize(&viewer, &source, &destination, LayerMask::layer(8));
        assert_eq!(first, again);
    }

    #[test]
    fn linked_destination_clips_geometry_in_front_of_its_portal() {
        let sync = ViewCameraSynchronizer::default();
        let source = Pose::IDENTITY;
        let destination = Pose::new(Vec3::new(20.0, 0.0, -10.0), Quat::from_rotation_y(FRAC_PI_2));
        let viewer = ViewerCamera {
            pose: Pose::new(Vec3::new(0.0, 1.0, 4.0), Quat::IDENTITY),
            ..ViewerCamera::default()
        };

        let camera = sync.synchronize(&viewer, &source, &destination, LayerMask::layer(8));
        assert_pose_near(
            &camera.pose,
            &Pose::new(Vec3::new(24.0, 1.0, -10.0), Quat::from_rotation_y(FRAC_PI_2)),
        );
        assert!(camera.oblique);
        assert_eq!(camera.culling_mask, LayerMask::layer(8));

        let depth = |world: Vec3| {
            let clip = camera.view_projection_matrix() * world.extend(1.0);
            clip.z / clip.w
        };
        let on_plane = depth(Vec3::new(20.05, 1.2, -9.7));
        assert!(on_plane.abs() < 1.0e-3, "plane depth was {on_plane}");
        let between = depth(Vec3::new(22.0, 1.0, -10.0));
        assert!(between < 0.0, "occluder depth was {between}");
        let beyond = depth(Vec3::new(15.0, 1.0, -10.0));
        assert!(beyond > 0.0 && beyond <= 1.0, "beyond depth was {beyond}");
    }

    #[test]
    fn synchronize_copies_viewer_projection_before_clipping() {
        let sync = ViewCameraSynchronizer::default();
        let viewer = ViewerCamera {
            pose: Pose::new(Vec3::new(0.0, 0.0, 0.1), Quat::IDENTITY),
            ..ViewerCamera::default()
        };

        let camera = sync.synchronize(&viewer, &Pose::IDENTITY, &Pose::IDENTITY, LayerMask::DEFAULT);
        assert_eq!(camera.base_projection, viewer.projection_matrix());
        assert!(!camera.oblique);
        assert_eq!(camera.projection, viewer.projection_matrix());

        let far_viewer = ViewerCamera {
            pose: Pose::new(Vec3::new(0.0, 0.0, 4.0), Quat::IDENTITY),
            ..ViewerCamera::default()
        };
        let camera =
            sync.synchronize(&far_viewer, &Pose::IDENTITY, &Pose::IDENTITY, LayerMask::DEFAULT);
        assert!(camera.oblique);
        assert_eq!(camera.culling_mask, LayerMask::DEFAULT);
    }
}
