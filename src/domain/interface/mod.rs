//! Host-interface collaborator: element tree notifications and user events

mod element;
mod event;

pub use element::{ElementId, ElementNode, ElementPayload};
pub use event::{HostEvent, HostInterface};
