#![forbid(unsafe_code)]

//! Keyed variant methods: a virtual table per class, a selection per instance.
//!
//! A [`VariantMethod`] owns a table from key to implementation that is shared
//! by reference across every instance. Each instance lazily materializes its
//! own [`Dispatcher`] state holding the currently selected key, so switching
//! one instance's variant never affects its siblings.
//!
//! # Usage
//!
//! ```
//! use classkit_core::{SlotHost, SlotStorage};
//! use classkit_dispatch::VariantMethod;
//!
//! struct Calc {
//!     slots: SlotStorage,
//! }
//!
//! impl SlotHost for Calc {
//!     fn slot_storage(&self) -> Option<&SlotStorage> {
//!         Some(&self.slots)
//!     }
//! }
//!
//! let calculate = VariantMethod::new("add", |_: &Calc, (x, y): (i32, i32)| x + y)
//!     .named("calculate")
//!     .unwrap();
//! calculate.register("sub", |_: &Calc, (x, y): (i32, i32)| x - y);
//!
//! let calc = Calc { slots: SlotStorage::new() };
//! let dispatcher = calculate.get(&calc).unwrap();
//! assert_eq!(dispatcher.call((2, 3)).unwrap(), 5);
//! dispatcher.set("sub");
//! assert_eq!(dispatcher.call((2, 3)).unwrap(), -1);
//! assert_eq!(dispatcher.item(&"add").unwrap().call((2, 3)), 5);
//! ```
//!
//! # Invariants
//!
//! 1. The table only grows; re-registering a key replaces its implementation.
//! 2. Registrations made after an instance materialized its dispatcher are
//!    visible to that instance (the table is shared, never copied).
//! 3. `set` never validates; a missing key fails when dispatched.
//! 4. `item` dispatches one key without touching the current selection.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing key | `call`/`item` with an unregistered key | `UnregisteredKey`, key rendered with `Display` |
//! | Assignment | `VariantMethod::set` | `AssignmentRejected` |
//! | Slot errors | Unbound name, no storage | Propagated from [`LazySlot`] |

use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use ahash::AHashMap;
use classkit_core::{
    BoundMethod, Class, ClassError, Implementation, LazySlot, Member, Result, SlotHost,
};

type Table<K, T, A, R> = Rc<RefCell<AHashMap<K, Implementation<T, A, R>>>>;

/// Class-level variant method: a shared virtual table plus a lazy
/// per-instance selection.
pub struct VariantMethod<K, T: ?Sized, A, R> {
    slot: LazySlot<T, VariantState<K, T, A, R>>,
    table: Table<K, T, A, R>,
    default_key: K,
}

/// Per-instance dispatcher state stored in the instance's slot storage.
struct VariantState<K, T: ?Sized, A, R> {
    current: RefCell<K>,
    table: Table<K, T, A, R>,
}

impl<K: Clone, T: ?Sized, A, R> Clone for VariantMethod<K, T, A, R> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            table: Rc::clone(&self.table),
            default_key: self.default_key.clone(),
        }
    }
}

impl<K, T, A, R> VariantMethod<K, T, A, R>
where
    K: Eq + Hash + Clone + fmt::Display + 'static,
    T: SlotHost + ?Sized + 'static,
    A: 'static,
    R: 'static,
{
    /// Create the table with `{key: method}` and make `key` the default
    /// selection of every instance.
    pub fn new(key: K, method: impl Fn(&T, A) -> R + 'static) -> Self {
        Self::with_implementation(key, Implementation::method(method))
    }

    /// Like [`new`](Self::new), with an explicit implementation.
    pub fn with_implementation(key: K, implementation: Implementation<T, A, R>) -> Self {
        let mut entries = AHashMap::new();
        entries.insert(key.clone(), implementation);
        let table: Table<K, T, A, R> = Rc::new(RefCell::new(entries));

        let seed_key = key.clone();
        let seed_table = Rc::clone(&table);
        let slot = LazySlot::read_only("variant methods", move |_: &T| VariantState {
            current: RefCell::new(seed_key.clone()),
            table: Rc::clone(&seed_table),
        });

        Self {
            slot,
            table,
            default_key: key,
        }
    }

    /// Bind the name and return the variant method, for use outside a [`Class`].
    pub fn named(self, name: &str) -> Result<Self> {
        self.slot.bind_name(name)?;
        Ok(self)
    }

    /// Add `{key: method}` to the shared table.
    pub fn register(&self, key: K, method: impl Fn(&T, A) -> R + 'static) -> &Self {
        self.register_implementation(key, Implementation::method(method))
    }

    /// Add a receiver-less function under `key`.
    pub fn register_function(&self, key: K, function: impl Fn(A) -> R + 'static) -> &Self {
        self.register_implementation(key, Implementation::function(function))
    }

    /// Add an explicit implementation under `key`.
    pub fn register_implementation(&self, key: K, implementation: Implementation<T, A, R>) -> &Self {
        tracing::debug!(variant = ?self.slot.name(), key = %key, "registered variant");
        self.table.borrow_mut().insert(key, implementation);
        self
    }

    /// The dispatcher for `obj`, materializing its state on first access.
    pub fn get<'a>(&self, obj: &'a T) -> Result<Dispatcher<'a, K, T, A, R>> {
        Ok(Dispatcher {
            instance: obj,
            state: self.slot.get(obj)?,
        })
    }

    /// Variant methods cannot be assigned through an instance.
    pub fn set<V>(&self, _obj: &T, _value: V) -> Result<()> {
        tracing::debug!(variant = ?self.slot.name(), "rejected variant assignment");
        Err(ClassError::AssignmentRejected {
            member: "variant methods",
        })
    }

    /// Drop `obj`'s dispatcher state; its next access starts from the default key.
    pub fn delete(&self, obj: &T) -> Result<bool> {
        self.slot.delete(obj)
    }

    /// The bound name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.slot.name()
    }

    /// The key every instance starts with.
    #[must_use]
    pub fn default_key(&self) -> &K {
        &self.default_key
    }

    /// Whether `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.table.borrow().contains_key(key)
    }

    /// Number of registered variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    /// Whether no variant is registered. Never true for a constructed table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }
}

impl<K, T, A, R> Member for VariantMethod<K, T, A, R>
where
    K: Eq + Hash + Clone + fmt::Display + 'static,
    T: SlotHost + ?Sized + 'static,
    A: 'static,
    R: 'static,
{
    fn set_name(&self, _owner: &Class, name: &str) -> Result<()> {
        self.slot.bind_name(name)
    }
}

impl<K: fmt::Debug, T: ?Sized, A, R> fmt::Debug for VariantMethod<K, T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantMethod")
            .field("slot", &self.slot)
            .field("default_key", &self.default_key)
            .field("variants", &self.table.borrow().len())
            .finish()
    }
}

/// An instance's handle into a variant method: its current key plus the
/// shared table, bound to the instance.
pub struct Dispatcher<'a, K, T: ?Sized, A, R> {
    instance: &'a T,
    state: Rc<VariantState<K, T, A, R>>,
}

impl<'a, K, T, A, R> Dispatcher<'a, K, T, A, R>
where
    K: Eq + Hash + Clone + fmt::Display,
    T: ?Sized,
{
    /// Dispatch to the implementation registered under the current key.
    pub fn call(&self, args: A) -> Result<R> {
        let key = self.current_key();
        Ok(self.bound(&key)?.call(args))
    }

    /// Select `key` for subsequent calls on this instance. Not validated.
    pub fn set(&self, key: K) {
        tracing::trace!(key = %key, "switched variant");
        *self.state.current.borrow_mut() = key;
    }

    /// The currently selected key.
    #[must_use]
    pub fn current_key(&self) -> K {
        self.state.current.borrow().clone()
    }

    /// The implementation for `key` bound to this instance, leaving the
    /// current selection untouched.
    pub fn item(&self, key: &K) -> Result<BoundMethod<'a, T, A, R>> {
        self.bound(key)
    }

    /// Whether `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.state.table.borrow().contains_key(key)
    }

    /// Number of registered variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.table.borrow().len()
    }

    /// Whether no variant is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.table.borrow().is_empty()
    }

    /// A read-only view of the shared table. Later registrations show
    /// through it.
    #[must_use]
    pub fn snapshot(&self) -> VariantView<K, T, A, R> {
        VariantView {
            table: Rc::clone(&self.state.table),
        }
    }

    /// The instance this dispatcher is bound to.
    #[must_use]
    pub fn instance(&self) -> &'a T {
        self.instance
    }

    /// Whether two dispatchers share per-instance state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    fn bound(&self, key: &K) -> Result<BoundMethod<'a, T, A, R>> {
        // Clone out of the table so the body may register or switch variants.
        let implementation = self.state.table.borrow().get(key).cloned();
        match implementation {
            Some(implementation) => Ok(implementation.bind(self.instance)),
            None => Err(ClassError::UnregisteredKey {
                key: key.to_string(),
            }),
        }
    }
}

impl<K: fmt::Debug, T: ?Sized, A, R> fmt::Debug for Dispatcher<'_, K, T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("current_key", &*self.state.current.borrow())
            .field("variants", &self.state.table.borrow().len())
            .finish()
    }
}

/// Read-only view of a variant table.
pub struct VariantView<K, T: ?Sized, A, R> {
    table: Table<K, T, A, R>,
}

impl<K: Eq + Hash + Clone, T: ?Sized, A, R> VariantView<K, T, A, R> {
    /// The implementation under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<Implementation<T, A, R>> {
        self.table.borrow().get(key).cloned()
    }

    /// Whether `key` is registered.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.borrow().contains_key(key)
    }

    /// Registered keys, in no particular order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.table.borrow().keys().cloned().collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }
}

impl<K: fmt::Debug, T: ?Sized, A, R> fmt::Debug for VariantView<K, T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.table.borrow().keys()).finish()
    }
}
