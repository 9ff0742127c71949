use riftglass_core::host::{IndicatorHost, RenderTargetBinding, RenderTargetDesc, TargetHandle};
use riftglass_core::portal::PortalId;
use riftglass_core::transition::Indicator;
use riftglass_shared::camera::RenderCamera;
use rustc_hash::FxHashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedTarget {
    pub portal: PortalId,
    pub desc: RenderTargetDesc,
    pub frames_rendered: u64,
    pub oblique_frames: u64,
    pub last_camera: Option<RenderCamera>,
    pub surface_slot: Option<usize>,
}

/// Render backend without a GPU. Keeps the bookkeeping a real renderer
/// would do so runs can be inspected and summarised.
#[derive(Debug, Default)]
pub struct RecordingTargets {
    next_handle: u32,
    targets: FxHashMap<TargetHandle, RecordedTarget>,
    content_shaders: FxHashMap<PortalId, String>,
    released: u64,
    frames_rendered: u64,
    oblique_frames: u64,
}

impl RecordingTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self, handle: TargetHandle) -> Option<&RecordedTarget> {
        self.targets.get(&handle)
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn released_targets(&self) -> u64 {
        self.released
    }

    pub fn content_shader(&self, portal: PortalId) -> Option<&str> {
        self.content_shaders.get(&portal).map(String::as_str)
    }

    /// Frames rendered into any target, including released ones.
    pub fn total_frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn total_oblique_frames(&self) -> u64 {
        self.oblique_frames
    }
}

impl RenderTargetBinding for RecordingTargets {
    fn allocate_target(&mut self, portal: PortalId, desc: &RenderTargetDesc) -> TargetHandle {
        self.next_handle += 1;
        let handle = TargetHandle(self.next_handle);
        self.targets.insert(
            handle,
            RecordedTarget {
                portal,
                desc: *desc,
                frames_rendered: 0,
                oblique_frames: 0,
                last_camera: None,
                surface_slot: None,
            },
        );
        debug!("Allocated target {handle:?} for portal {portal}");
        handle
    }

    fn assign_content_shader(&mut self, portal: PortalId, shader: &str) {
        self.content_shaders.insert(portal, shader.to_string());
    }

    fn render(&mut self, _portal: PortalId, target: TargetHandle, camera: &RenderCamera) {
        if let Some(recorded) = self.targets.get_mut(&target) {
            recorded.frames_rendered += 1;
            self.frames_rendered += 1;
            if camera.oblique {
                recorded.oblique_frames += 1;
                self.oblique_frames += 1;
            }
            recorded.last_camera = Some(*camera);
        }
    }

    fn bind_surface_texture(&mut self, _portal: PortalId, target: TargetHandle, material_slot: usize) {
        if let Some(recorded) = self.targets.get_mut(&target) {
            recorded.surface_slot = Some(material_slot);
        }
    }

    fn release_target(&mut self, portal: PortalId, target: TargetHandle) {
        if let Some(recorded) = self.targets.remove(&target) {
            self.released += 1;
            debug!(
                "Released {}x{} target {target:?} of portal {portal} after {} frames",
                recorded.desc.width, recorded.desc.height, recorded.frames_rendered
            );
        }
    }
}

#[derive(Debug, Default)]
pub struct IndicatorBoard {
    visible: FxHashMap<(PortalId, Indicator), bool>,
}

impl IndicatorBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self, portal: PortalId, indicator: Indicator) -> bool {
        self.visible
            .get(&(portal, indicator))
            .copied()
            .unwrap_or(false)
    }
}

impl IndicatorHost for IndicatorBoard {
    fn set_indicator_visible(&mut self, portal: PortalId, indicator: Indicator, visible: bool) {
        let previous = self.visible.insert((portal, indicator), visible);
        if previous != Some(visible) {
            debug!("Portal {portal} {indicator:?} indicator visible={visible}");
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;
    use riftglass_core::host::{IndicatorHost, RenderTargetBinding, RenderTargetDesc};
    use riftglass_core::portal::PortalId;
    use riftglass_core::transition::Indicator;
    use riftglass_shared::camera::RenderCamera;
    use riftglass_shared::layers::LayerMask;
    use riftglass_shared::pose::Pose;

    use super::{IndicatorBoard, RecordingTargets};

    fn camera(oblique: bool) -> RenderCamera {
        RenderCamera {
            pose: Pose::IDENTITY,
            base_projection: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            oblique,
            culling_mask: LayerMask::DEFAULT,
        }
    }

    #[test]
    fn frame_totals_survive_target_release() {
        let mut targets = RecordingTargets::new();
        let portal = PortalId::new(3);
        let desc = RenderTargetDesc {
            width: 640,
            height: 360,
            depth_bits: 16,
        };
        let handle = targets.allocate_target(portal, &desc);
        targets.assign_content_shader(portal, "Custom/PortalObjectShader");
        targets.render(portal, handle, &camera(true));
        targets.render(portal, handle, &camera(false));
        targets.bind_surface_texture(portal, handle, 1);

        let recorded = targets.target(handle).expect("target is live");
        assert_eq!(recorded.desc, desc);
        assert_eq!(recorded.surface_slot, Some(1));
        assert_eq!(recorded.last_camera, Some(camera(false)));
        assert_eq!(targets.content_shader(portal), Some("Custom/PortalObjectShader"));

        targets.release_target(portal, handle);
        targets.release_target(portal, handle);
        assert!(targets.target(handle).is_none());
        assert_eq!(targets.released_targets(), 1);
        assert_eq!(targets.total_frames_rendered(), 2);
        assert_eq!(targets.total_oblique_frames(), 1);
    }

    #[test]
    fn indicators_default_to_hidden() {
        let mut board = IndicatorBoard::new();
        let portal = PortalId::new(0);
        assert!(!board.is_visible(portal, Indicator::Enter));

        board.set_indicator_visible(portal, Indicator::Enter, true);
        board.set_indicator_visible(portal, Indicator::Exit, false);
        assert!(board.is_visible(portal, Indicator::Enter));
        assert!(!board.is_visible(portal, Indicator::Exit));
    }
}
