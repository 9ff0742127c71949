use std::fmt;

use glam::Vec3;
use riftglass_shared::camera::{RenderCamera, ViewerCamera};
use riftglass_shared::layers::LayerMask;
use riftglass_shared::pose::Pose;
use riftglass_shared::settings::PortalSettings;
use tracing::{debug, info};

use crate::host::{IndicatorHost, RenderTargetBinding, RenderTargetDesc, TargetHandle};
use crate::transition::{Indicator, TransitionStateMachine, TraversalState, TriggerOutcome};
use crate::traversal::TraversalLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortalId(u32);

impl PortalId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PortalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortalDesc {
    pub name: String,
    pub pose: Pose,
    /// Viewer layers while inside the portal.
    pub contents_mask: LayerMask,
    /// Viewer layers after leaving the portal.
    pub default_mask: LayerMask,
}

impl PortalDesc {
    pub fn new(name: impl Into<String>, pose: Pose) -> Self {
        Self {
            name: name.into(),
            pose,
            contents_mask: LayerMask::DEFAULT,
            default_mask: LayerMask::DEFAULT,
        }
    }

    pub fn with_masks(mut self, contents_mask: LayerMask, default_mask: LayerMask) -> Self {
        self.contents_mask = contents_mask;
        self.default_mask = default_mask;
        self
    }
}

#[derive(Debug)]
pub struct Portal {
    id: PortalId,
    name: String,
    pose: Pose,
    linked_to: PortalId,
    contents_mask: LayerMask,
    default_mask: LayerMask,
    render_camera: Option<RenderCamera>,
    target: Option<TargetHandle>,
    transitions: TransitionStateMachine,
}

impl Portal {
    pub(crate) fn new(id: PortalId, desc: PortalDesc) -> Self {
        Self {
            id,
            name: desc.name,
            pose: desc.pose,
            linked_to: id,
            contents_mask: desc.contents_mask,
            default_mask: desc.default_mask,
            render_camera: None,
            target: None,
            transitions: TransitionStateMachine::new(),
        }
    }

    pub fn id(&self) -> PortalId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn linked_to(&self) -> PortalId {
        self.linked_to
    }

    pub fn contents_mask(&self) -> LayerMask {
        self.contents_mask
    }

    pub fn default_mask(&self) -> LayerMask {
        self.default_mask
    }

    pub fn render_camera(&self) -> Option<&RenderCamera> {
        self.render_camera.as_ref()
    }

    pub fn target(&self) -> Option<TargetHandle> {
        self.target
    }

    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    pub fn traversal(&self) -> TraversalState {
        self.transitions.state()
    }

    pub(crate) fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub(crate) fn set_link(&mut self, destination: PortalId) {
        self.linked_to = destination;
    }

    pub(crate) fn set_render_camera(&mut self, camera: RenderCamera) {
        self.render_camera = Some(camera);
    }

    pub(crate) fn activate<B, H>(&mut self, settings: &PortalSettings, binding: &mut B, indicators: &mut H)
    where
        B: RenderTargetBinding,
        H: IndicatorHost,
    {
        let desc = RenderTargetDesc::from_settings(settings);
        let target = binding.allocate_target(self.id, &desc);
        binding.assign_content_shader(self.id, &settings.content_shader);
        self.target = Some(target);

        let state = self.transitions.state();
        if state.has_reappeared {
            let visible = if state.in_portal {
                Indicator::Exit
            } else {
                Indicator::Enter
            };
            indicators.set_indicator_visible(self.id, visible, true);
        }

        info!(
            "Portal {} '{}' activated with {}x{} target ({}-bit depth)",
            self.id, self.name, desc.width, desc.height, desc.depth_bits
        );
    }

    pub(crate) fn deactivate<B: RenderTargetBinding>(&mut self, binding: &mut B) {
        if let Some(target) = self.target.take() {
            binding.release_target(self.id, target);
            self.render_camera = None;
            info!("Portal {} '{}' deactivated", self.id, self.name);
        }
    }

    pub(crate) fn handle_trigger<H: IndicatorHost>(
        &mut self,
        lock: &TraversalLock,
        viewer: &mut ViewerCamera,
        indicators: &mut H,
    ) -> TriggerOutcome {
        if !self.is_active() {
            debug!("Ignoring trigger on inactive portal {}", self.id);
            return TriggerOutcome::Inactive;
        }

        let outcome = self.transitions.on_trigger_enter(self.id, lock);
        match outcome {
            TriggerOutcome::Entered => {
                viewer.culling_mask = self.contents_mask;
                indicators.set_indicator_visible(self.id, Indicator::Enter, false);
                info!("Viewer entered portal {} '{}'", self.id, self.name);
            }
            TriggerOutcome::Exited => {
                viewer.culling_mask = self.default_mask;
                indicators.set_indicator_visible(self.id, Indicator::Exit, false);
                info!("Viewer exited portal {} '{}'", self.id, self.name);
            }
            TriggerOutcome::Debounced => {
                debug!("Trigger on portal {} ignored until it reappears", self.id);
            }
            TriggerOutcome::Blocked { holder } => {
                debug!(
                    "Trigger on portal {} ignored, viewer is inside {:?}",
                    self.id, holder
                );
            }
            TriggerOutcome::Inactive => {}
        }
        outcome
    }

    pub(crate) fn check_reappearance<H: IndicatorHost>(
        &mut self,
        viewer_position: Vec3,
        reappear_distance: f32,
        indicators: &mut H,
    ) -> Option<Indicator> {
        let distance = self.pose.distance_to(viewer_position);
        let indicator = self
            .transitions
            .on_viewer_distance(distance, reappear_distance)?;
        indicators.set_indicator_visible(self.id, indicator, true);
        debug!(
            "Portal {} reappeared at distance {distance:.2}, showing {indicator:?} indicator",
            self.id
        );
        Some(indicator)
    }
}
