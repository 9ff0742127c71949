use tracing::warn;

use crate::portal::PortalId;
use crate::traversal::TraversalLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalState {
    pub in_portal: bool,
    pub has_reappeared: bool,
}

impl Default for TraversalState {
    fn default() -> Self {
        Self {
            in_portal: false,
            has_reappeared: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    Enter,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Entered,
    Exited,
    /// The gate has not re-armed since the last transition.
    Debounced,
    Blocked { holder: Option<PortalId> },
    Inactive,
}

impl TriggerOutcome {
    pub fn is_transition(self) -> bool {
        matches!(self, Self::Entered | Self::Exited)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransitionStateMachine {
    state: TraversalState,
}

impl TransitionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TraversalState {
        self.state
    }

    pub fn in_portal(&self) -> bool {
        self.state.in_portal
    }

    pub fn has_reappeared(&self) -> bool {
        self.state.has_reappeared
    }

    pub fn on_trigger_enter(&mut self, portal: PortalId, lock: &TraversalLock) -> TriggerOutcome {
        if !self.state.has_reappeared {
            return TriggerOutcome::Debounced;
        }

        if self.state.in_portal {
            if !lock.release(portal) {
                warn!(
                    "Portal {portal} exited while traversal lock was held by {:?}",
                    lock.holder()
                );
            }
            self.state.in_portal = false;
            self.state.has_reappeared = false;
            TriggerOutcome::Exited
        } else if lock.try_acquire(portal) {
            self.state.in_portal = true;
            self.state.has_reappeared = false;
            TriggerOutcome::Entered
        } else {
            TriggerOutcome::Blocked {
                holder: lock.holder(),
            }
        }
    }

    /// Re-arms the trigger gate once the viewer is farther than
    /// `reappear_distance`. Returns the indicator to reveal.
    pub fn on_viewer_distance(&mut self, distance: f32, reappear_distance: f32) -> Option<Indicator> {
        if distance <= reappear_distance || self.state.has_reappeared {
            return None;
        }

        self.state.has_reappeared = true;
        Some(if self.state.in_portal {
            Indicator::Exit
        } else {
            Indicator::Enter
        })
    }
}
