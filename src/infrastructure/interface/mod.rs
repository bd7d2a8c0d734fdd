//! Host-interface plumbing: element registry, trigger dispatcher and a channel-backed host

mod channel;
mod dispatcher;
mod registry;

pub use channel::ChannelHost;
pub use dispatcher::{DispatcherHandle, DispatcherStats, DispatcherStatus, TriggerDispatcher};
pub use registry::ElementRegistry;
