#![forbid(unsafe_code)]

//! Lazily materialized per-instance slots.
//!
//! A [`LazySlot`] is declared once per class and materializes a value per
//! instance on first access by running its default factory against that
//! instance. The value is cached in the instance's [`SlotStorage`] under the
//! slot's name and handed out as a shared `Rc`, so later reads return the
//! same allocation.
//!
//! # Invariants
//!
//! 1. The factory runs at most once per instance between deletions.
//! 2. An immutable slot never replaces a materialized value; the value itself
//!    may still use interior mutability.
//! 3. `delete` reverts to "not yet computed"; the next `get` reruns the factory.
//! 4. The name is fixed at the first bind. A later, different name is only
//!    tolerated when it is private (leading `_`), so a public slot can also be
//!    reached through an internal alias.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | No name | Slot used before binding | `UnboundMember` |
//! | No storage | [`SlotHost::slot_storage`] returns `None` | `StorageUnavailable` |
//! | Type clash | Another slot stored a different type under the name | `NameConflict` |
//! | Assignment | `set` on an immutable slot | `AssignmentRejected` |
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use classkit_core::{LazySlot, SlotStorage};
//!
//! let slot = LazySlot::new(|_: &SlotStorage| vec![1, 2, 3]).named("items").unwrap();
//! let storage = SlotStorage::new();
//!
//! let first = slot.get(&storage).unwrap();
//! let second = slot.get(&storage).unwrap();
//! assert!(Rc::ptr_eq(&first, &second));
//! ```

use std::any::{Any, type_name};
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use crate::class::{Class, Member};
use crate::error::{ClassError, Result};
use crate::storage::{SlotHost, SlotStorage};

/// Whether a slot accepts direct assignment after materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotMode {
    /// Assignment is rejected with the given member description.
    ReadOnly(&'static str),
    /// Assignment replaces the cached value.
    Writable,
}

/// A named, per-instance, lazily materialized cache cell.
pub struct LazySlot<T: ?Sized, V> {
    inner: Rc<SlotInner<T, V>>,
}

struct SlotInner<T: ?Sized, V> {
    name: OnceCell<Rc<str>>,
    factory: Box<dyn Fn(&T) -> V>,
    mode: SlotMode,
}

impl<T: ?Sized, V> Clone for LazySlot<T, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, V> LazySlot<T, V>
where
    T: SlotHost + ?Sized,
    V: 'static,
{
    /// An immutable slot computed by `factory` on first access.
    pub fn new(factory: impl Fn(&T) -> V + 'static) -> Self {
        Self::with_mode(SlotMode::ReadOnly("an immutable property"), factory)
    }

    /// A slot that also accepts [`set`](Self::set).
    pub fn writable(factory: impl Fn(&T) -> V + 'static) -> Self {
        Self::with_mode(SlotMode::Writable, factory)
    }

    /// A read-only slot whose rejected assignments name `member`.
    pub fn read_only(member: &'static str, factory: impl Fn(&T) -> V + 'static) -> Self {
        Self::with_mode(SlotMode::ReadOnly(member), factory)
    }

    fn with_mode(mode: SlotMode, factory: impl Fn(&T) -> V + 'static) -> Self {
        Self {
            inner: Rc::new(SlotInner {
                name: OnceCell::new(),
                factory: Box::new(factory),
                mode,
            }),
        }
    }

    /// Bind the name and return the slot, for slots used outside a [`Class`].
    pub fn named(self, name: &str) -> Result<Self> {
        self.bind_name(name)?;
        Ok(self)
    }

    /// Bind this slot to `name`.
    ///
    /// The first name wins. Binding again under the same name, or under a
    /// private alias, is accepted; any other name is a conflict.
    pub fn bind_name(&self, name: &str) -> Result<()> {
        let bound = self.inner.name.get_or_init(|| Rc::from(name));
        if &**bound == name || name.starts_with('_') {
            return Ok(());
        }
        Err(ClassError::NameConflict {
            existing: bound.to_string(),
            requested: name.to_string(),
        })
    }

    /// The bound name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.get().map(|name| &**name)
    }

    /// The bound name as a shared string, for handles that outlive a borrow
    /// of the slot.
    #[must_use]
    pub fn shared_name(&self) -> Option<Rc<str>> {
        self.inner.name.get().cloned()
    }

    /// The assignment policy.
    #[must_use]
    pub fn mode(&self) -> SlotMode {
        self.inner.mode
    }

    /// The value for `obj`, materializing it on first access.
    pub fn get(&self, obj: &T) -> Result<Rc<V>> {
        let name = self.bound_name()?;
        let storage = self.storage(obj, name)?;

        if let Some(stored) = storage.get(name) {
            return downcast::<V>(name, stored);
        }

        // Factory runs with no storage borrow held so it may touch other slots.
        let value: Rc<dyn Any> = Rc::new((self.inner.factory)(obj));
        tracing::trace!(slot = %name, value_type = type_name::<V>(), "materialized lazy slot");
        let stored = storage.get_or_insert(Rc::clone(name), value);
        downcast::<V>(name, stored)
    }

    /// Replace the value for `obj`. Only writable slots accept this.
    pub fn set(&self, obj: &T, value: V) -> Result<()> {
        if let SlotMode::ReadOnly(member) = self.inner.mode {
            tracing::debug!(slot = ?self.name(), member, "rejected slot assignment");
            return Err(ClassError::AssignmentRejected { member });
        }
        let name = self.bound_name()?;
        let storage = self.storage(obj, name)?;
        storage.replace(Rc::clone(name), Rc::new(value));
        Ok(())
    }

    /// Clear the cached value for `obj`. Returns whether one was present.
    pub fn delete(&self, obj: &T) -> Result<bool> {
        let name = self.bound_name()?;
        let removed = self.storage(obj, name)?.remove(name);
        if removed {
            tracing::trace!(slot = %name, "cleared lazy slot");
        }
        Ok(removed)
    }

    /// Whether `obj` has materialized this slot.
    pub fn is_materialized(&self, obj: &T) -> Result<bool> {
        let name = self.bound_name()?;
        Ok(self.storage(obj, name)?.contains(name))
    }

    fn bound_name(&self) -> Result<&Rc<str>> {
        self.inner
            .name
            .get()
            .ok_or(ClassError::UnboundMember { what: "lazy slot" })
    }

    fn storage<'o>(&self, obj: &'o T, name: &str) -> Result<&'o SlotStorage> {
        obj.slot_storage()
            .ok_or_else(|| ClassError::StorageUnavailable {
                type_name: type_name::<T>(),
                slot: name.to_string(),
            })
    }
}

impl<T, V> Member for LazySlot<T, V>
where
    T: SlotHost + ?Sized,
    V: 'static,
{
    fn set_name(&self, _owner: &Class, name: &str) -> Result<()> {
        self.bind_name(name)
    }
}

impl<T: ?Sized, V> fmt::Debug for LazySlot<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySlot")
            .field("name", &self.inner.name.get())
            .field("mode", &self.inner.mode)
            .finish()
    }
}

fn downcast<V: 'static>(name: &str, stored: Rc<dyn Any>) -> Result<Rc<V>> {
    stored.downcast::<V>().map_err(|_| ClassError::NameConflict {
        existing: name.to_string(),
        requested: format!("{name}: {}", type_name::<V>()),
    })
}

/// An immutable slot computed by `factory`.
pub fn lazy<T, V>(factory: impl Fn(&T) -> V + 'static) -> LazySlot<T, V>
where
    T: SlotHost + ?Sized,
    V: 'static,
{
    LazySlot::new(factory)
}

/// An immutable slot whose factory does not look at the instance.
///
/// Each instance still gets its own value: `descriptor(Vec::new)` hands every
/// instance a fresh, independently mutable vector.
pub fn descriptor<T, V>(factory: impl Fn() -> V + 'static) -> LazySlot<T, V>
where
    T: SlotHost + ?Sized,
    V: 'static,
{
    LazySlot::new(move |_: &T| factory())
}
