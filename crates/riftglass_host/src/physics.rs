use glam::Vec3;
use riftglass_core::events::TriggerSender;
use riftglass_core::portal::PortalId;
use riftglass_shared::pose::Pose;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerVolume {
    pub portal: PortalId,
    pub pose: Pose,
    pub half_extents: Vec3,
}

impl TriggerVolume {
    pub fn contains(&self, point: Vec3) -> bool {
        let local = self.pose.world_to_rigid_local().transform_point3(point);
        let extents = self.half_extents * self.pose.scale.abs();
        local.x.abs() <= extents.x && local.y.abs() <= extents.y && local.z.abs() <= extents.z
    }
}

/// Stand-in physics step: raises trigger-enter events when the viewer moves
/// from outside to inside a portal's volume.
pub struct TriggerWorld {
    volumes: Vec<TriggerVolume>,
    inside: Vec<bool>,
    sender: TriggerSender,
}

impl TriggerWorld {
    pub fn new(sender: TriggerSender) -> Self {
        Self {
            volumes: Vec::new(),
            inside: Vec::new(),
            sender,
        }
    }

    pub fn add_volume(&mut self, volume: TriggerVolume) {
        self.volumes.push(volume);
        self.inside.push(false);
    }

    pub fn step(&mut self, viewer_position: Vec3) -> Vec<PortalId> {
        let mut entered = Vec::new();
        for (volume, was_inside) in self.volumes.iter().zip(self.inside.iter_mut()) {
            let now_inside = volume.contains(viewer_position);
            if now_inside && !*was_inside {
                debug!("Viewer entered trigger volume of portal {}", volume.portal);
                if let Err(err) = self.sender.send(volume.portal) {
                    warn!("Dropping trigger for portal {}: {err}", volume.portal);
                }
                entered.push(volume.portal);
            }
            *was_inside = now_inside;
        }
        entered
    }
}
