#![forbid(unsafe_code)]

//! Core building blocks for classkit.
//!
//! This crate provides:
//! - [`LazySlot`] for per-instance values computed on first access
//! - [`SlotStorage`] and [`SlotHost`] for the per-instance attribute map
//! - [`Class`] for runtime class objects with single inheritance
//! - [`Implementation`] and [`BoundMethod`] for receiver-aware callables
//! - [`ClassError`], the error type shared by every classkit crate
//!
//! Variant methods and declarations live in `classkit-dispatch`; signals live
//! in `classkit-signal`. All of them specialize the slot or the class
//! namespace defined here.

pub mod class;
pub mod error;
pub mod method;
pub mod slot;
pub mod storage;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use class::{Ancestors, Class, ClassInstance, Member};
pub use error::{ClassError, Result};
pub use method::{BoundMethod, Implementation};
pub use slot::{LazySlot, SlotMode, descriptor, lazy};
pub use storage::{SlotHost, SlotStorage};
