//! Host interface backed by a broadcast channel

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::interface::{HostEvent, HostInterface};

/// In-process host: whoever owns it publishes events, sessions subscribe
///
/// Used by the replay command and by tests. Publishing with no subscribers is a no-op.
#[derive(Clone)]
pub struct ChannelHost {
    sender: broadcast::Sender<HostEvent>,
}

impl ChannelHost {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event, returns the number of subscribers that will see it
    pub fn publish(&self, event: HostEvent) -> usize {
        let kind = event.kind_name();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(event = kind, "No subscribers, host event discarded");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl HostInterface for ChannelHost {
    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.sender.subscribe()
    }
}

impl std::fmt::Debug for ChannelHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHost")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
