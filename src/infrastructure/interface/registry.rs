//! Live map from rendered elements to the step metadata they carry

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::interface::{ElementId, ElementNode, ElementPayload};

/// Element registry kept current from structural change notifications
///
/// Only mount/unmount mutate it; click and hover lookups are a single map access.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    entries: HashMap<ElementId, ElementPayload>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every tagged element in the inserted subtree, returns how many were added
    pub fn mount(&mut self, node: &ElementNode) -> usize {
        let mut added = 0;

        node.walk(&mut |element| {
            let Some(metadata) = element.metadata.as_deref() else {
                return;
            };

            match ElementPayload::parse(metadata) {
                Ok(payload) => {
                    debug!(element_id = %element.id, step_id = %payload.step_id, "Element registered");
                    self.entries.insert(element.id.clone(), payload);
                    added += 1;
                }
                Err(e) => {
                    warn!(element_id = %element.id, error = %e, "Skipping element with malformed metadata");
                }
            }
        });

        added
    }

    /// Forgets every element in the removed subtree, returns how many were removed
    pub fn unmount(&mut self, node: &ElementNode) -> usize {
        let mut removed = 0;
        node.walk(&mut |element| {
            if self.entries.remove(&element.id).is_some() {
                removed += 1;
            }
        });
        removed
    }

    pub fn get(&self, id: &ElementId) -> Option<&ElementPayload> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::{Condition, StepId, UiEvent};

    fn tree() -> ElementNode {
        ElementNode::new("root")
            .with_child(
                ElementNode::new("panel")
                    .with_child(ElementNode::new("button").tagged("s1", &[Condition::ui_event(UiEvent::OnClicked)])),
            )
            .with_child(ElementNode::new("broken").with_metadata("{not json"))
            .with_child(ElementNode::new("help").tagged("s2", &[]))
    }

    #[test]
    fn test_mount_registers_tagged_descendants() {
        let mut registry = ElementRegistry::new();

        assert_eq!(registry.mount(&tree()), 2);
        assert_eq!(registry.len(), 2);

        let payload = registry.get(&ElementId::from("button")).unwrap();
        assert_eq!(payload.step_id, StepId::from("s1"));
        assert!(registry.get(&ElementId::from("broken")).is_none());
        assert!(registry.get(&ElementId::from("panel")).is_none());
    }

    #[test]
    fn test_unmount_removes_subtree() {
        let mut registry = ElementRegistry::new();
        registry.mount(&tree());

        let removed = registry.unmount(&ElementNode::new("panel").with_child(ElementNode::new("button")));

        assert_eq!(removed, 1);
        assert!(registry.get(&ElementId::from("button")).is_none());
        assert!(registry.get(&ElementId::from("help")).is_some());
    }

    #[test]
    fn test_remount_replaces_payload() {
        let mut registry = ElementRegistry::new();
        registry.mount(&ElementNode::new("e").tagged("s1", &[]));
        registry.mount(&ElementNode::new("e").tagged("s9", &[]));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&ElementId::from("e")).unwrap().step_id, StepId::from("s9"));
    }
}
