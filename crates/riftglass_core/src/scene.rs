use std::fmt;
use std::sync::Arc;

use riftglass_shared::camera::ViewerCamera;
use riftglass_shared::pose::Pose;
use riftglass_shared::settings::PortalSettings;
use riftglass_shared::sync::ViewCameraSynchronizer;
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::events::{trigger_channel, TriggerReceiver, TriggerSender};
use crate::host::{IndicatorHost, RenderTargetBinding};
use crate::portal::{Portal, PortalDesc, PortalId};
use crate::transition::{Indicator, TriggerOutcome};
use crate::traversal::TraversalLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    DuplicatePortal(String),
    UnknownPortal(PortalId),
    UnknownLink(String),
    AlreadyActive(PortalId),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatePortal(name) => write!(f, "portal '{name}' is already registered"),
            Self::UnknownPortal(id) => write!(f, "portal {id} does not exist"),
            Self::UnknownLink(name) => write!(f, "linked portal '{name}' does not exist"),
            Self::AlreadyActive(id) => write!(f, "portal {id} is already active"),
        }
    }
}

impl std::error::Error for SceneError {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub frame: u64,
    pub rendered: Vec<PortalId>,
    pub rearmed: Vec<(PortalId, Indicator)>,
    pub triggers: Vec<(PortalId, TriggerOutcome)>,
    pub unknown_triggers: Vec<PortalId>,
}

impl TickReport {
    pub fn transitions(&self) -> impl Iterator<Item = &(PortalId, TriggerOutcome)> + '_ {
        self.triggers
            .iter()
            .filter(|(_, outcome)| outcome.is_transition())
    }
}

pub struct PortalScene {
    settings: PortalSettings,
    synchronizer: ViewCameraSynchronizer,
    portals: FxHashMap<PortalId, Portal>,
    order: Vec<PortalId>,
    names: FxHashMap<String, PortalId>,
    lock: Arc<TraversalLock>,
    trigger_tx: TriggerSender,
    trigger_rx: TriggerReceiver,
    frame: u64,
}

impl PortalScene {
    pub fn new(settings: PortalSettings) -> Self {
        Self::with_lock(settings, Arc::new(TraversalLock::new()))
    }

    /// Scenes sharing `lock` also share the one-portal-at-a-time rule and
    /// its portal id space.
    pub fn with_lock(settings: PortalSettings, lock: Arc<TraversalLock>) -> Self {
        let settings = settings.sanitize();
        let (trigger_tx, trigger_rx) = trigger_channel();
        Self {
            synchronizer: ViewCameraSynchronizer::from_settings(&settings),
            settings,
            portals: FxHashMap::default(),
            order: Vec::new(),
            names: FxHashMap::default(),
            lock,
            trigger_tx,
            trigger_rx,
            frame: 0,
        }
    }

    pub fn settings(&self) -> &PortalSettings {
        &self.settings
    }

    pub fn traversal_lock(&self) -> &Arc<TraversalLock> {
        &self.lock
    }

    /// The portal of this scene the viewer is inside, if any.
    pub fn occupied_portal(&self) -> Option<PortalId> {
        self.lock
            .holder()
            .filter(|holder| self.portals.contains_key(holder))
    }

    pub fn trigger_sender(&self) -> TriggerSender {
        self.trigger_tx.clone()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Registers a portal linked to itself.
    pub fn add_portal(&mut self, desc: PortalDesc) -> Result<PortalId, SceneError> {
        if self.names.contains_key(&desc.name) {
            return Err(SceneError::DuplicatePortal(desc.name));
        }

        let id = self.lock.allocate_id();
        self.names.insert(desc.name.clone(), id);
        self.portals.insert(id, Portal::new(id, desc));
        self.order.push(id);
        Ok(id)
    }

    pub fn portal(&self, id: PortalId) -> Option<&Portal> {
        self.portals.get(&id)
    }

    pub fn portal_id(&self, name: &str) -> Option<PortalId> {
        self.names.get(name).copied()
    }

    pub fn portal_by_name(&self, name: &str) -> Option<&Portal> {
        self.portal_id(name).and_then(|id| self.portal(id))
    }

    pub fn portals(&self) -> impl Iterator<Item = &Portal> + '_ {
        self.order.iter().filter_map(|id| self.portals.get(id))
    }

    pub fn link(&mut self, source: PortalId, destination: PortalId) -> Result<(), SceneError> {
        if !self.portals.contains_key(&destination) {
            return Err(SceneError::UnknownPortal(destination));
        }
        let portal = self
            .portals
            .get_mut(&source)
            .ok_or(SceneError::UnknownPortal(source))?;
        portal.set_link(destination);
        Ok(())
    }

    pub fn link_pair(&mut self, a: PortalId, b: PortalId) -> Result<(), SceneError> {
        self.link(a, b)?;
        self.link(b, a)
    }

    pub fn link_by_name(&mut self, source: &str, destination: &str) -> Result<(), SceneError> {
        let source_id = self
            .portal_id(source)
            .ok_or_else(|| SceneError::UnknownLink(source.to_string()))?;
        let destination_id = self
            .portal_id(destination)
            .ok_or_else(|| SceneError::UnknownLink(destination.to_string()))?;
        self.link(source_id, destination_id)
    }

    pub fn set_portal_pose(&mut self, id: PortalId, pose: Pose) -> Result<(), SceneError> {
        let portal = self
            .portals
            .get_mut(&id)
            .ok_or(SceneError::UnknownPortal(id))?;
        portal.set_pose(pose);
        Ok(())
    }

    pub fn activate<B, H>(
        &mut self,
        id: PortalId,
        binding: &mut B,
        indicators: &mut H,
    ) -> Result<(), SceneError>
    where
        B: RenderTargetBinding,
        H: IndicatorHost,
    {
        let portal = self
            .portals
            .get_mut(&id)
            .ok_or(SceneError::UnknownPortal(id))?;
        if portal.is_active() {
            return Err(SceneError::AlreadyActive(id));
        }
        portal.activate(&self.settings, binding, indicators);
        Ok(())
    }

    pub fn activate_all<B, H>(&mut self, binding: &mut B, indicators: &mut H) -> Result<(), SceneError>
    where
        B: RenderTargetBinding,
        H: IndicatorHost,
    {
        let inactive: Vec<PortalId> = self
            .portals()
            .filter(|portal| !portal.is_active())
            .map(Portal::id)
            .collect();
        for id in inactive {
            self.activate(id, binding, indicators)?;
        }
        Ok(())
    }

    /// Releases the portal's render target. Traversal state is kept.
    pub fn deactivate<B: RenderTargetBinding>(
        &mut self,
        id: PortalId,
        binding: &mut B,
    ) -> Result<(), SceneError> {
        let portal = self
            .portals
            .get_mut(&id)
            .ok_or(SceneError::UnknownPortal(id))?;
        portal.deactivate(binding);
        Ok(())
    }

    /// One frame: place and render every active portal's camera, run the
    /// distance check, then process the trigger events delivered this frame.
    pub fn tick<B, H>(&mut self, viewer: &mut ViewerCamera, binding: &mut B, indicators: &mut H) -> TickReport
    where
        B: RenderTargetBinding,
        H: IndicatorHost,
    {
        self.frame += 1;
        let mut report = TickReport {
            frame: self.frame,
            ..TickReport::default()
        };

        for &id in &self.order {
            let Some((source_pose, linked_to, contents_mask, target)) =
                self.portals.get(&id).and_then(|portal| {
                    portal.target().map(|target| {
                        (*portal.pose(), portal.linked_to(), portal.contents_mask(), target)
                    })
                })
            else {
                continue;
            };
            let Some(destination_pose) = self.portals.get(&linked_to).map(|dest| *dest.pose()) else {
                warn!("Portal {id} is linked to missing portal {linked_to}");
                continue;
            };

            let camera =
                self.synchronizer
                    .synchronize(viewer, &source_pose, &destination_pose, contents_mask);
            binding.render(id, target, &camera);
            binding.bind_surface_texture(id, target, self.settings.surface_material_slot);
            if let Some(portal) = self.portals.get_mut(&id) {
                portal.set_render_camera(camera);
            }
            report.rendered.push(id);
        }

        let viewer_position = viewer.position();
        for &id in &self.order {
            let Some(portal) = self.portals.get_mut(&id) else {
                continue;
            };
            if !portal.is_active() {
                continue;
            }
            if let Some(indicator) =
                portal.check_reappearance(viewer_position, self.settings.reappear_distance, indicators)
            {
                report.rearmed.push((id, indicator));
            }
        }

        for event in self.trigger_rx.drain_ordered(self.lock.holder()) {
            let Some(portal) = self.portals.get_mut(&event.portal) else {
                warn!("Trigger for unknown portal {}", event.portal);
                report.unknown_triggers.push(event.portal);
                continue;
            };
            let outcome = portal.handle_trigger(&self.lock, viewer, indicators);
            report.triggers.push((event.portal, outcome));
        }

        if report.transitions().next().is_some() {
            info!(
                "Frame {}: viewer now inside {:?}",
                self.frame,
                self.lock.holder()
            );
        }

        report
    }
}
