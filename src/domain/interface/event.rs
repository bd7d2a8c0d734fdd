use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::element::{ElementId, ElementNode};

/// Events published by the host interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// Subtrees inserted into the rendered tree
    Mounted { nodes: Vec<ElementNode> },
    /// Subtrees removed from the rendered tree
    Unmounted { nodes: Vec<ElementNode> },
    Click { target: ElementId },
    HoverEnter { target: ElementId },
    /// The interface finished loading
    Ready,
    /// A backgrounded view became visible again
    Revisited,
}

impl HostEvent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Mounted { .. } => "mounted",
            Self::Unmounted { .. } => "unmounted",
            Self::Click { .. } => "click",
            Self::HoverEnter { .. } => "hover_enter",
            Self::Ready => "ready",
            Self::Revisited => "revisited",
        }
    }
}

/// Any UI runtime that can publish subtree insertion/removal and user events
///
/// Dropping the returned receiver unsubscribes.
pub trait HostInterface: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<HostEvent>;
}
