#![forbid(unsafe_code)]

//! Per-instance attribute storage backing every lazy slot.
//!
//! A [`SlotStorage`] is the explicit stand-in for an object's attribute
//! dictionary: a map from slot name to the materialized value. Instances opt
//! in by embedding one and implementing [`SlotHost`].
//!
//! # Invariants
//!
//! 1. Absence of a name means "not yet computed".
//! 2. Values are stored type-erased behind `Rc<dyn Any>`; the slot that owns
//!    the name is responsible for the downcast.
//! 3. No `RefCell` borrow escapes a method, so slot factories may freely read
//!    other slots of the same instance while computing.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

/// Type-erased per-instance slot values keyed by slot name.
#[derive(Default)]
pub struct SlotStorage {
    entries: RefCell<AHashMap<Rc<str>, Rc<dyn Any>>>,
}

impl SlotStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a value is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    /// The stored value under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<dyn Any>> {
        self.entries.borrow().get(name).cloned()
    }

    /// Store `value` unless `name` is already present, returning whichever
    /// value ends up stored.
    pub fn get_or_insert(&self, name: Rc<str>, value: Rc<dyn Any>) -> Rc<dyn Any> {
        Rc::clone(self.entries.borrow_mut().entry(name).or_insert(value))
    }

    /// Store `value` under `name`, replacing any previous value.
    pub fn replace(&self, name: Rc<str>, value: Rc<dyn Any>) -> Option<Rc<dyn Any>> {
        self.entries.borrow_mut().insert(name, value)
    }

    /// Remove the value under `name`. Returns whether anything was removed.
    pub fn remove(&self, name: &str) -> bool {
        self.entries.borrow_mut().remove(name).is_some()
    }

    /// Number of materialized slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether no slot has been materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drop every materialized value.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Names of the materialized slots, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .borrow()
            .keys()
            .map(|name| name.to_string())
            .collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for SlotStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotStorage")
            .field("slots", &self.names())
            .finish()
    }
}

/// Types whose instances carry per-instance slot storage.
///
/// Returning `None` means the type has no storage; slot access on such an
/// instance fails with [`ClassError::StorageUnavailable`](crate::ClassError::StorageUnavailable).
pub trait SlotHost {
    /// The instance's slot storage.
    fn slot_storage(&self) -> Option<&SlotStorage>;
}

impl SlotHost for SlotStorage {
    fn slot_storage(&self) -> Option<&SlotStorage> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_insert_keeps_first_value() {
        let storage = SlotStorage::new();
        let first: Rc<dyn Any> = Rc::new(1_u32);
        let second: Rc<dyn Any> = Rc::new(2_u32);

        let stored = storage.get_or_insert("count".into(), Rc::clone(&first));
        assert!(Rc::ptr_eq(&stored, &first));

        let stored = storage.get_or_insert("count".into(), second);
        assert!(Rc::ptr_eq(&stored, &first));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn remove_reports_presence() {
        let storage = SlotStorage::new();
        assert!(!storage.remove("missing"));
        storage.replace("name".into(), Rc::new("x"));
        assert!(storage.contains("name"));
        assert!(storage.remove("name"));
        assert!(storage.is_empty());
    }

    #[test]
    fn debug_lists_sorted_names() {
        let storage = SlotStorage::new();
        storage.replace("zeta".into(), Rc::new(()));
        storage.replace("alpha".into(), Rc::new(()));
        let debug = format!("{storage:?}");
        assert!(debug.contains(r#"["alpha", "zeta"]"#));
    }
}
