#![forbid(unsafe_code)]

//! Per-instance emitters.
//!
//! An [`Emitter`] is the instance-side view of a [`Signal`](crate::Signal):
//! the resolved listener list captured when the instance first touched the
//! signal, plus whatever was connected on this instance since. Connecting or
//! disconnecting here never affects sibling instances or the class-level
//! registry.
//!
//! # Invariants
//!
//! 1. Listeners run in list order: class-level method callbacks, then
//!    class-level free callbacks, then per-instance connections.
//! 2. Argument checks happen before the first listener runs, so a rejected
//!    emit has no partial effects.
//! 3. The list is snapshotted per emit; listeners may connect or disconnect
//!    on the same emitter, effective from the next emit.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use classkit_core::{ClassError, Result};

use crate::callback::{Arity, Callback};

/// Per-instance listener list stored in the instance's slot storage.
pub(crate) struct EmitterState<T: ?Sized, V: ?Sized> {
    listeners: RefCell<Vec<Callback<T, V>>>,
}

impl<T: ?Sized, V: ?Sized> EmitterState<T, V> {
    pub(crate) fn new(listeners: Vec<Callback<T, V>>) -> Self {
        Self {
            listeners: RefCell::new(listeners),
        }
    }
}

/// An instance's resolved view of a signal.
pub struct Emitter<'a, T: ?Sized, V> {
    instance: &'a T,
    state: Rc<EmitterState<T, V>>,
    signal: Option<Rc<str>>,
}

impl<'a, T: ?Sized, V> Emitter<'a, T, V> {
    pub(crate) fn new(instance: &'a T, state: Rc<EmitterState<T, V>>, signal: Option<Rc<str>>) -> Self {
        Self {
            instance,
            state,
            signal,
        }
    }

    /// Notify every listener without a value.
    ///
    /// Fails with [`ClassError::MissingArgument`] if any listener expects one.
    pub fn emit(&self) -> Result<()> {
        self.dispatch(None)
    }

    /// Notify every listener, passing `value` to those that take one.
    pub fn emit_with(&self, value: &V) -> Result<()> {
        self.dispatch(Some(value))
    }

    /// Notify with zero or one value given as a slice.
    ///
    /// More than one value fails with [`ClassError::TooManyArguments`] before
    /// any listener runs.
    pub fn emit_args(&self, values: &[V]) -> Result<()> {
        if values.len() > 1 {
            return Err(ClassError::TooManyArguments {
                given: values.len(),
            });
        }
        self.dispatch(values.first())
    }

    /// Append `target` to this instance's listeners and return it.
    pub fn connect(&self, target: Callback<T, V>) -> Callback<T, V> {
        self.state.listeners.borrow_mut().push(target.clone());
        target
    }

    /// Remove the first occurrence of `target`. Returns whether it was
    /// connected; an unknown target is ignored.
    pub fn disconnect(&self, target: &Callback<T, V>) -> bool {
        let mut listeners = self.state.listeners.borrow_mut();
        match listeners.iter().position(|listener| listener.ptr_eq(target)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether `target` is connected on this instance.
    #[must_use]
    pub fn is_connected(&self, target: &Callback<T, V>) -> bool {
        self.state
            .listeners
            .borrow()
            .iter()
            .any(|listener| listener.ptr_eq(target))
    }

    /// Number of listeners on this instance.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.listeners.borrow().len()
    }

    /// The instance this emitter belongs to.
    #[must_use]
    pub fn instance(&self) -> &'a T {
        self.instance
    }

    fn dispatch(&self, value: Option<&V>) -> Result<()> {
        let listeners: Vec<Callback<T, V>> = self.state.listeners.borrow().clone();

        if value.is_none() && listeners.iter().any(|l| l.arity() == Arity::Unary) {
            return Err(ClassError::MissingArgument {
                signal: self.signal.as_deref().unwrap_or("<unnamed>").to_string(),
            });
        }

        tracing::trace!(
            signal = self.signal.as_deref().unwrap_or("<unnamed>"),
            listeners = listeners.len(),
            with_value = value.is_some(),
            "emitting signal"
        );
        for listener in &listeners {
            listener.invoke(self.instance, value);
        }
        Ok(())
    }
}

impl<T: ?Sized, V> fmt::Debug for Emitter<'_, T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("signal", &self.signal)
            .field("listeners", &self.listener_count())
            .finish()
    }
}
