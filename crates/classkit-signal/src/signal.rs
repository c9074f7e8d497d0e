#![forbid(unsafe_code)]

//! Class-level signals.
//!
//! A [`Signal`] keeps two ordered registries shared by every instance:
//! method callbacks, bound to each instance when its emitter materializes,
//! and free callbacks, used as-is. The first access through an instance
//! snapshots both registries into that instance's [`Emitter`].
//!
//! Registrations made after an instance materialized its emitter are not
//! seen by that instance; deleting its emitter picks them up on next access.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use classkit_core::{SlotHost, SlotStorage};
//! use classkit_signal::{Callback, Signal};
//!
//! struct Button {
//!     slots: SlotStorage,
//!     clicks: Cell<u32>,
//! }
//!
//! impl SlotHost for Button {
//!     fn slot_storage(&self) -> Option<&SlotStorage> {
//!         Some(&self.slots)
//!     }
//! }
//!
//! let clicked: Signal<Button, u32> = Signal::new().named("clicked").unwrap();
//! clicked
//!     .bind_method(Callback::method(|b: &Button, n: &u32| b.clicks.set(b.clicks.get() + n)))
//!     .unwrap();
//!
//! let button = Button { slots: SlotStorage::new(), clicks: Cell::new(0) };
//! clicked.get(&button).unwrap().emit_with(&2).unwrap();
//! assert_eq!(button.clicks.get(), 2);
//! ```

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use classkit_core::{Class, ClassError, LazySlot, Member, Result, SlotHost};

use crate::callback::Callback;
use crate::emitter::{Emitter, EmitterState};

type Registry<T, V> = Rc<RefCell<Vec<Callback<T, V>>>>;

/// A class-level signal with a lazily materialized per-instance emitter.
pub struct Signal<T: ?Sized, V> {
    slot: LazySlot<T, EmitterState<T, V>>,
    methods: Registry<T, V>,
    free: Registry<T, V>,
    value_type: Option<&'static str>,
}

impl<T: ?Sized, V> Clone for Signal<T, V> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            methods: Rc::clone(&self.methods),
            free: Rc::clone(&self.free),
            value_type: self.value_type,
        }
    }
}

impl<T, V> Signal<T, V>
where
    T: SlotHost + ?Sized + 'static,
    V: 'static,
{
    /// A signal with empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_value_type(None)
    }

    /// A signal that records `V`'s type name for diagnostics.
    #[must_use]
    pub fn typed() -> Self {
        Self::with_value_type(Some(type_name::<V>()))
    }

    /// A signal pre-bound to one method callback receiving the value.
    pub fn from_method(method: impl Fn(&T, &V) + 'static) -> Self {
        let signal = Self::new();
        signal
            .methods
            .borrow_mut()
            .push(Callback::method(method));
        signal
    }

    fn with_value_type(value_type: Option<&'static str>) -> Self {
        let methods: Registry<T, V> = Rc::new(RefCell::new(Vec::new()));
        let free: Registry<T, V> = Rc::new(RefCell::new(Vec::new()));

        let seed_methods = Rc::clone(&methods);
        let seed_free = Rc::clone(&free);
        let slot = LazySlot::read_only("signals", move |_: &T| {
            let mut listeners = seed_methods.borrow().clone();
            listeners.extend(seed_free.borrow().iter().cloned());
            EmitterState::new(listeners)
        });

        Self {
            slot,
            methods,
            free,
            value_type,
        }
    }

    /// Bind the name and return the signal, for use outside a [`Class`].
    pub fn named(self, name: &str) -> Result<Self> {
        self.slot.bind_name(name)?;
        Ok(self)
    }

    /// Register a method callback, bound to each instance at emitter creation.
    ///
    /// Free callbacks are rejected: they have nothing to bind.
    pub fn bind_method(&self, target: Callback<T, V>) -> Result<Callback<T, V>> {
        if !target.is_method() {
            return Err(ClassError::InvalidCallbackTarget {
                reason: format!("{target:?} is not a descriptor"),
            });
        }
        tracing::debug!(signal = ?self.slot.name(), arity = ?target.arity(), "bound method callback");
        self.methods.borrow_mut().push(target.clone());
        Ok(target)
    }

    /// Remove a method callback. Returns whether it was registered.
    pub fn unbind_method(&self, target: &Callback<T, V>) -> bool {
        remove_first(&self.methods, target)
    }

    /// Register a free callback, invoked as-is.
    ///
    /// Method callbacks are rejected: without a receiver they cannot be called.
    pub fn bind_free(&self, target: Callback<T, V>) -> Result<Callback<T, V>> {
        if target.is_method() {
            return Err(ClassError::InvalidCallbackTarget {
                reason: format!("{target:?} is not callable without an instance"),
            });
        }
        tracing::debug!(signal = ?self.slot.name(), arity = ?target.arity(), "bound free callback");
        self.free.borrow_mut().push(target.clone());
        Ok(target)
    }

    /// Remove a free callback. Returns whether it was registered.
    pub fn unbind_free(&self, target: &Callback<T, V>) -> bool {
        remove_first(&self.free, target)
    }

    /// The emitter for `obj`, materializing it on first access.
    pub fn get<'a>(&self, obj: &'a T) -> Result<Emitter<'a, T, V>> {
        let state = self.slot.get(obj)?;
        Ok(Emitter::new(obj, state, self.slot.shared_name()))
    }

    /// Signals cannot be assigned through an instance.
    pub fn set<X>(&self, _obj: &T, _value: X) -> Result<()> {
        tracing::debug!(signal = ?self.slot.name(), "rejected signal assignment");
        Err(ClassError::AssignmentRejected { member: "signals" })
    }

    /// Drop `obj`'s emitter, discarding its per-instance connections.
    pub fn delete(&self, obj: &T) -> Result<bool> {
        self.slot.delete(obj)
    }

    /// The bound name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.slot.name()
    }

    /// The recorded value type name, if any.
    #[must_use]
    pub fn value_type(&self) -> Option<&'static str> {
        self.value_type
    }

    /// Number of class-level method callbacks.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.borrow().len()
    }

    /// Number of class-level free callbacks.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.borrow().len()
    }
}

impl<T, V> Default for Signal<T, V>
where
    T: SlotHost + ?Sized + 'static,
    V: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V> Member for Signal<T, V>
where
    T: SlotHost + ?Sized + 'static,
    V: 'static,
{
    fn set_name(&self, _owner: &Class, name: &str) -> Result<()> {
        self.slot.bind_name(name)
    }
}

impl<T: ?Sized, V> fmt::Debug for Signal<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slot", &self.slot)
            .field("value_type", &self.value_type)
            .field("methods", &self.methods.borrow().len())
            .field("free", &self.free.borrow().len())
            .finish()
    }
}

/// A signal whose only listener is `method`, called with the instance and
/// the emitted value.
pub fn signal_method<T, V>(method: impl Fn(&T, &V) + 'static) -> Signal<T, V>
where
    T: SlotHost + ?Sized + 'static,
    V: 'static,
{
    Signal::from_method(method)
}

fn remove_first<T: ?Sized, V>(registry: &Registry<T, V>, target: &Callback<T, V>) -> bool {
    let mut callbacks = registry.borrow_mut();
    match callbacks.iter().position(|callback| callback.ptr_eq(target)) {
        Some(index) => {
            callbacks.remove(index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classkit_core::testing::Probe;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    fn probe() -> Probe {
        Probe::new(&Class::new("Widget"), 1)
    }

    fn recording_signal(log: &Log) -> Signal<Probe, String> {
        let signal = Signal::typed().named("changed").unwrap();
        let l = Rc::clone(log);
        signal
            .bind_method(Callback::method(move |p: &Probe, v: &String| {
                l.borrow_mut().push(format!("method({}, {v})", p.value));
            }))
            .unwrap();
        let l = Rc::clone(log);
        signal
            .bind_free(Callback::nullary(move || l.borrow_mut().push("nullary".into())))
            .unwrap();
        let l = Rc::clone(log);
        signal
            .bind_free(Callback::unary(move |v: &String| {
                l.borrow_mut().push(format!("unary({v})"));
            }))
            .unwrap();
        signal
    }

    #[test]
    fn emit_adapts_arity_in_order() {
        let log = Log::default();
        let signal = recording_signal(&log);
        let p = probe();
        signal.get(&p).unwrap().emit_with(&"x".to_string()).unwrap();
        assert_eq!(*log.borrow(), ["method(1, x)", "nullary", "unary(x)"]);
    }

    #[test]
    fn methods_run_before_free_callbacks_regardless_of_bind_order() {
        let log = Log::default();
        let signal: Signal<Probe, u8> = Signal::new().named("tick").unwrap();
        let l = Rc::clone(&log);
        signal
            .bind_free(Callback::nullary(move || l.borrow_mut().push("free".into())))
            .unwrap();
        let l = Rc::clone(&log);
        signal
            .bind_method(Callback::method_nullary(move |_: &Probe| {
                l.borrow_mut().push("method".into());
            }))
            .unwrap();
        signal.get(&probe()).unwrap().emit_with(&0).unwrap();
        assert_eq!(*log.borrow(), ["method", "free"]);
    }

    #[test]
    fn too_many_arguments_runs_nothing() {
        let log = Log::default();
        let signal = recording_signal(&log);
        let p = probe();
        let err = signal
            .get(&p)
            .unwrap()
            .emit_args(&["a".to_string(), "b".to_string()])
            .unwrap_err();
        assert_eq!(err, ClassError::TooManyArguments { given: 2 });
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn missing_argument_runs_nothing() {
        let log = Log::default();
        let signal = recording_signal(&log);
        let p = probe();
        let err = signal.get(&p).unwrap().emit().unwrap_err();
        assert_eq!(
            err,
            ClassError::MissingArgument {
                signal: "changed".into()
            }
        );
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn bare_emit_with_only_nullary_listeners() {
        let hits = Rc::new(RefCell::new(0));
        let signal: Signal<Probe, ()> = Signal::new().named("ping").unwrap();
        let h = Rc::clone(&hits);
        signal
            .bind_free(Callback::nullary(move || *h.borrow_mut() += 1))
            .unwrap();
        let p = probe();
        let emitter = signal.get(&p).unwrap();
        emitter.emit().unwrap();
        emitter.emit_args(&[]).unwrap();
        emitter.emit_args(&[()]).unwrap();
        assert_eq!(*hits.borrow(), 3);
    }

    #[test]
    fn bind_rejects_wrong_shapes() {
        let signal: Signal<Probe, u8> = Signal::new();
        assert!(matches!(
            signal.bind_method(Callback::unary(|_| {})),
            Err(ClassError::InvalidCallbackTarget { .. })
        ));
        assert!(matches!(
            signal.bind_free(Callback::method(|_, _| {})),
            Err(ClassError::InvalidCallbackTarget { .. })
        ));
        assert_eq!(signal.method_count(), 0);
        assert_eq!(signal.free_count(), 0);
    }

    #[test]
    fn unbind_by_identity() {
        let signal: Signal<Probe, u8> = Signal::new();
        let target = signal.bind_free(Callback::nullary(|| {})).unwrap();
        let twin = Callback::nullary(|| {});
        assert!(!signal.unbind_free(&twin));
        assert!(!signal.unbind_method(&target));
        assert!(signal.unbind_free(&target));
        assert_eq!(signal.free_count(), 0);
    }

    #[test]
    fn connect_is_per_instance() {
        let log = Log::default();
        let signal: Signal<Probe, u8> = Signal::new().named("tick").unwrap();
        let a = probe();
        let b = probe();

        let l = Rc::clone(&log);
        let target = signal
            .get(&a)
            .unwrap()
            .connect(Callback::unary(move |v: &u8| l.borrow_mut().push(format!("a{v}"))));

        signal.get(&a).unwrap().emit_with(&1).unwrap();
        signal.get(&b).unwrap().emit_with(&2).unwrap();
        assert_eq!(*log.borrow(), ["a1"]);
        assert_eq!(signal.get(&b).unwrap().listener_count(), 0);

        assert!(signal.get(&a).unwrap().disconnect(&target));
        assert!(!signal.get(&a).unwrap().disconnect(&target));
        signal.get(&a).unwrap().emit_with(&3).unwrap();
        assert_eq!(*log.borrow(), ["a1"]);
    }

    #[test]
    fn late_binding_invisible_until_rematerialized() {
        let log = Log::default();
        let signal: Signal<Probe, u8> = Signal::new().named("tick").unwrap();
        let p = probe();
        assert_eq!(signal.get(&p).unwrap().listener_count(), 0);

        let l = Rc::clone(&log);
        signal
            .bind_free(Callback::nullary(move || l.borrow_mut().push("late".into())))
            .unwrap();
        signal.get(&p).unwrap().emit_with(&0).unwrap();
        assert!(log.borrow().is_empty());

        let fresh = probe();
        signal.get(&fresh).unwrap().emit_with(&0).unwrap();
        assert_eq!(*log.borrow(), ["late"]);

        assert!(signal.delete(&p).unwrap());
        signal.get(&p).unwrap().emit_with(&0).unwrap();
        assert_eq!(*log.borrow(), ["late", "late"]);
    }

    #[test]
    fn listener_may_connect_during_emit() {
        let log = Log::default();
        let signal: Signal<Probe, u8> = Signal::new().named("grow").unwrap();
        let handle = signal.clone();
        let l = Rc::clone(&log);
        signal
            .bind_method(Callback::method(move |p: &Probe, v: &u8| {
                l.borrow_mut().push(format!("seen {v}"));
                let inner = Rc::clone(&l);
                handle
                    .get(p)
                    .unwrap()
                    .connect(Callback::nullary(move || inner.borrow_mut().push("added".into())));
            }))
            .unwrap();

        let p = probe();
        signal.get(&p).unwrap().emit_with(&1).unwrap();
        assert_eq!(*log.borrow(), ["seen 1"]);
        signal.get(&p).unwrap().emit_with(&2).unwrap();
        assert_eq!(*log.borrow(), ["seen 1", "seen 2", "added"]);
    }

    #[test]
    fn signal_method_prebinds_one_method() {
        let signal = signal_method(|p: &Probe, v: &i64| assert_eq!(p.value, *v))
            .named("check")
            .unwrap();
        assert_eq!(signal.method_count(), 1);
        signal.get(&probe()).unwrap().emit_with(&1).unwrap();
    }

    #[test]
    fn assignment_rejected_and_debug() {
        let signal: Signal<Probe, u8> = Signal::typed().named("tick").unwrap();
        assert_eq!(
            signal.set(&probe(), 5_u8),
            Err(ClassError::AssignmentRejected { member: "signals" })
        );
        assert_eq!(signal.value_type(), Some("u8"));
        assert!(format!("{signal:?}").contains("value_type: Some(\"u8\")"));
    }
}
