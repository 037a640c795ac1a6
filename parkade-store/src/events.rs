use parkade_shared::models::events::ParkingEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Fan-out of slot and layout changes to live subscribers (SSE streams).
#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<ParkingEvent>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Never fails: with no subscribers the event is simply dropped.
    pub fn publish(&self, event: ParkingEvent) {
        let location_id = event.location_id().to_string();
        match self.tx.send(event) {
            Ok(receivers) => debug!("Published {} event to {} subscribers", location_id, receivers),
            Err(_) => debug!("No subscribers for {} event", location_id),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ParkingEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(100)
    }
}
