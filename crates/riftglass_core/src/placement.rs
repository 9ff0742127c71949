use glam::Vec2;
use riftglass_shared::pose::Pose;
use tracing::{debug, info};

/// Resolves a world pose from a screen-space probe, e.g. an AR plane raycast.
pub trait SurfaceProbe {
    fn probe(&mut self, screen_point: Vec2) -> Option<Pose>;
}

#[derive(Debug, Clone, Default)]
pub struct PlacementController {
    indicator: Option<Pose>,
    placed: Option<Pose>,
}

impl PlacementController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-probes the screen centre. Does nothing once content is placed.
    pub fn update<P: SurfaceProbe>(&mut self, probe: &mut P, screen_size: Vec2) -> Option<Pose> {
        if self.placed.is_some() {
            return None;
        }

        let hit = probe.probe(screen_size * 0.5);
        if hit.is_some() != self.indicator.is_some() {
            debug!(
                "Placement indicator {}",
                if hit.is_some() { "shown" } else { "hidden" }
            );
        }
        self.indicator = hit;
        hit
    }

    pub fn indicator(&self) -> Option<&Pose> {
        self.indicator.as_ref()
    }

    pub fn placed(&self) -> Option<&Pose> {
        self.placed.as_ref()
    }

    /// Places content at the indicator and hides it. Returns `None` while no
    /// surface is found or after content was already placed.
    pub fn confirm(&mut self) -> Option<Pose> {
        if self.placed.is_some() {
            return None;
        }
        let pose = self.indicator.take()?;
        self.placed = Some(pose);
        info!("Content placed at {:?}", pose.position);
        Some(pose)
    }
}
