#![forbid(unsafe_code)]

//! Ready-made instance types for tests.
//!
//! Enabled by the `test-helpers` feature so downstream crates can exercise
//! slots, variants, signals and declarations without writing a host type.

use crate::class::{Class, ClassInstance};
use crate::storage::{SlotHost, SlotStorage};

/// An instance with its own slot storage and a class.
#[derive(Debug)]
pub struct Probe {
    class: Class,
    slots: SlotStorage,
    /// Free-form payload tests can read from factories and methods.
    pub value: i64,
}

impl Probe {
    /// A probe of `class` carrying `value`.
    #[must_use]
    pub fn new(class: &Class, value: i64) -> Self {
        Self {
            class: class.clone(),
            slots: SlotStorage::new(),
            value,
        }
    }

    /// The probe's slot storage.
    #[must_use]
    pub fn slots(&self) -> &SlotStorage {
        &self.slots
    }
}

impl SlotHost for Probe {
    fn slot_storage(&self) -> Option<&SlotStorage> {
        Some(&self.slots)
    }
}

impl ClassInstance for Probe {
    fn class(&self) -> &Class {
        &self.class
    }
}

/// An instance that has a class but no slot storage.
#[derive(Debug)]
pub struct Sealed {
    class: Class,
}

impl Sealed {
    /// A storage-less instance of `class`.
    #[must_use]
    pub fn new(class: &Class) -> Self {
        Self {
            class: class.clone(),
        }
    }
}

impl SlotHost for Sealed {
    fn slot_storage(&self) -> Option<&SlotStorage> {
        None
    }
}

impl ClassInstance for Sealed {
    fn class(&self) -> &Class {
        &self.class
    }
}
