use tokio::sync::broadcast;

use crate::event::CoreEvent;

/// Broadcast channel for lifecycle and dispatch events. Subscribers are
/// optional; publishing into an empty bus is not an error.
#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<CoreEvent>,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn publish(
        &self,
        event: CoreEvent,
    ) -> Result<usize, broadcast::error::SendError<CoreEvent>> {
        self.sender.send(event)
    }
}
