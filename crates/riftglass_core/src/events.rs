use std::sync::mpsc;

use crate::portal::PortalId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEnter {
    pub portal: PortalId,
}

pub struct TriggerSender {
    tx: mpsc::Sender<TriggerEnter>,
}

pub struct TriggerReceiver {
    rx: mpsc::Receiver<TriggerEnter>,
}

pub fn trigger_channel() -> (TriggerSender, TriggerReceiver) {
    let (tx, rx) = mpsc::channel();
    (TriggerSender { tx }, TriggerReceiver { rx })
}

impl Clone for TriggerSender {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl TriggerSender {
    pub fn send(&self, portal: PortalId) -> Result<(), mpsc::SendError<TriggerEnter>> {
        self.tx.send(TriggerEnter { portal })
    }
}

impl TriggerReceiver {
    pub fn drain(&self) -> Vec<TriggerEnter> {
        self.rx.try_iter().collect()
    }

    /// Events of the occupied portal first, then ascending portal id.
    /// Events for the same portal keep their arrival order.
    pub fn drain_ordered(&self, holder: Option<PortalId>) -> Vec<TriggerEnter> {
        let mut events = self.drain();
        events.sort_by_key(|event| (Some(event.portal) != holder, event.portal));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::trigger_channel;
    use crate::portal::PortalId;

    #[test]
    fn drain_ordered_puts_holder_first_then_ascending_ids() {
        let (tx, rx) = trigger_channel();
        let other = tx.clone();
        for raw in [4, 1, 7, 1, 2] {
            other.send(PortalId::new(raw)).expect("receiver alive");
        }

        let order: Vec<u32> = rx
            .drain_ordered(Some(PortalId::new(7)))
            .into_iter()
            .map(|event| event.portal.raw())
            .collect();
        assert_eq!(order, vec![7, 1, 1, 2, 4]);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn drain_without_holder_is_sorted_by_id() {
        let (tx, rx) = trigger_channel();
        tx.send(PortalId::new(2)).expect("receiver alive");
        tx.send(PortalId::new(0)).expect("receiver alive");

        let order: Vec<u32> = rx
            .drain_ordered(None)
            .into_iter()
            .map(|event| event.portal.raw())
            .collect();
        assert_eq!(order, vec![0, 2]);
    }
}
