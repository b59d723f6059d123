//! Per-call merge memo
//!
//! Every referenced component gets one arena slot. The slot is reserved
//! (`Pending`) before the component's children are merged, so a reference
//! reached again while the slot is pending is a cycle and is left as a
//! `$ref` instead of being expanded.

use apicompat_core::Schema;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Index of a slot in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

#[derive(Debug)]
enum Slot {
    Pending,
    Merged(Schema),
}

#[derive(Debug)]
struct Entry {
    name: String,
    slot: Slot,
    circular: bool,
}

/// Arena of merged components, scoped to one merge call
#[derive(Debug, Default)]
pub struct MergeState {
    entries: Vec<Entry>,
    handles: HashMap<String, Handle>,
}

impl MergeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of an already reserved component
    pub fn lookup(&self, name: &str) -> Option<Handle> {
        self.handles.get(name).copied()
    }

    /// Insert a placeholder for `name` before merging it
    pub fn reserve(&mut self, name: &str) -> Handle {
        let handle = Handle(self.entries.len());
        self.entries.push(Entry {
            name: name.to_string(),
            slot: Slot::Pending,
            circular: false,
        });
        self.handles.insert(name.to_string(), handle);
        handle
    }

    /// Replace the placeholder with the merged schema
    pub fn complete(&mut self, handle: Handle, schema: Schema) {
        self.entries[handle.0].slot = Slot::Merged(schema);
    }

    pub fn is_pending(&self, handle: Handle) -> bool {
        matches!(self.entries[handle.0].slot, Slot::Pending)
    }

    pub fn mark_circular(&mut self, handle: Handle) {
        self.entries[handle.0].circular = true;
    }

    /// Pending or known to be part of a cycle
    pub fn is_circular(&self, handle: Handle) -> bool {
        let entry = &self.entries[handle.0];
        entry.circular || matches!(entry.slot, Slot::Pending)
    }

    /// Merged content, `None` while pending
    pub fn merged(&self, handle: Handle) -> Option<&Schema> {
        match &self.entries[handle.0].slot {
            Slot::Merged(schema) => Some(schema),
            Slot::Pending => None,
        }
    }

    /// Consume the arena: merged components by name and the circular ones
    pub fn into_components(self) -> (BTreeMap<String, Schema>, BTreeSet<String>) {
        let mut components = BTreeMap::new();
        let mut circular = BTreeSet::new();

        for entry in self.entries {
            if entry.circular {
                circular.insert(entry.name.clone());
            }
            if let Slot::Merged(schema) = entry.slot {
                components.insert(entry.name, schema);
            }
        }

        (components, circular)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_lifecycle() {
        let mut state = MergeState::new();
        let handle = state.reserve("Node");

        assert_eq!(state.lookup("Node"), Some(handle));
        assert!(state.is_pending(handle));
        assert!(state.is_circular(handle));
        assert!(state.merged(handle).is_none());

        state.complete(handle, Schema::typed("object"));
        assert!(!state.is_pending(handle));
        assert!(!state.is_circular(handle));

        state.mark_circular(handle);
        let (components, circular) = state.into_components();
        assert!(components.contains_key("Node"));
        assert!(circular.contains("Node"));
    }
}
