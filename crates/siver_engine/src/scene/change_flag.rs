//! Change flags observing transform updates
//!
//! A change flag is a boolean owned by the scene and referenced by a
//! generation-checked key. Transforms hold the keys of the flags observing
//! them and set every flag whenever their world matrix is invalidated;
//! observers read and clear the flag with [`ChangeFlagRegistry::take`].
//! Releasing a flag invalidates its key, so stale keys are ignored rather
//! than aliasing a newer flag.

use std::cell::Cell;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a change flag
    pub struct ChangeFlagKey;
}

/// Storage for every live change flag of a scene
#[derive(Debug, Default)]
pub struct ChangeFlagRegistry {
    flags: SlotMap<ChangeFlagKey, Cell<bool>>,
}

impl ChangeFlagRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new flag; it starts set so the first read observes a change
    pub fn register(&mut self) -> ChangeFlagKey {
        self.flags.insert(Cell::new(true))
    }

    /// Set a flag, returning `false` if the key was released
    pub fn set(&self, key: ChangeFlagKey) -> bool {
        self.flags.get(key).map(|flag| flag.set(true)).is_some()
    }

    /// Read and clear a flag
    pub fn take(&self, key: ChangeFlagKey) -> Option<bool> {
        self.flags.get(key).map(|flag| flag.replace(false))
    }

    /// Read a flag without clearing it
    pub fn is_set(&self, key: ChangeFlagKey) -> Option<bool> {
        self.flags.get(key).map(Cell::get)
    }

    /// Release a flag; returns `false` for already-released keys
    pub fn release(&mut self, key: ChangeFlagKey) -> bool {
        self.flags.remove(key).is_some()
    }

    /// Whether the key still refers to a live flag
    pub fn contains(&self, key: ChangeFlagKey) -> bool {
        self.flags.contains_key(key)
    }

    /// Number of live flags
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether no flags are live
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
