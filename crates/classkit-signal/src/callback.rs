#![forbid(unsafe_code)]

//! Callback shapes accepted by signals.
//!
//! A callback declares up front whether it wants the emitted value and
//! whether it needs the emitting instance. The emitter adapts each call to
//! that shape, so senders and receivers never negotiate signatures.
//!
//! | Shape | Receiver | Value |
//! |-------|----------|-------|
//! | [`Callback::Nullary`] | no | no |
//! | [`Callback::Unary`] | no | yes |
//! | [`Callback::MethodNullary`] | yes | no |
//! | [`Callback::Method`] | yes | yes |
//!
//! Identity is by allocation: two callbacks are the same target only when
//! they share the same `Rc` (see [`Callback::ptr_eq`]).

use std::fmt;
use std::rc::Rc;

/// Number of values a callback expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Called with no value.
    Nullary,
    /// Called with the emitted value.
    Unary,
}

/// A signal listener of a declared shape.
pub enum Callback<T: ?Sized, V: ?Sized> {
    /// Free function taking nothing.
    Nullary(Rc<dyn Fn()>),
    /// Free function taking the value.
    Unary(Rc<dyn Fn(&V)>),
    /// Method taking only the receiver.
    MethodNullary(Rc<dyn Fn(&T)>),
    /// Method taking the receiver and the value.
    Method(Rc<dyn Fn(&T, &V)>),
}

impl<T: ?Sized, V: ?Sized> Callback<T, V> {
    /// A free callback that ignores the value.
    pub fn nullary(f: impl Fn() + 'static) -> Self {
        Self::Nullary(Rc::new(f))
    }

    /// A free callback that receives the value.
    pub fn unary(f: impl Fn(&V) + 'static) -> Self {
        Self::Unary(Rc::new(f))
    }

    /// A method callback that ignores the value.
    pub fn method_nullary(f: impl Fn(&T) + 'static) -> Self {
        Self::MethodNullary(Rc::new(f))
    }

    /// A method callback that receives the value.
    pub fn method(f: impl Fn(&T, &V) + 'static) -> Self {
        Self::Method(Rc::new(f))
    }

    /// Whether the callback must be bound to an instance before it can run.
    #[must_use]
    pub fn is_method(&self) -> bool {
        matches!(self, Self::MethodNullary(_) | Self::Method(_))
    }

    /// The declared arity.
    #[must_use]
    pub fn arity(&self) -> Arity {
        match self {
            Self::Nullary(_) | Self::MethodNullary(_) => Arity::Nullary,
            Self::Unary(_) | Self::Method(_) => Arity::Unary,
        }
    }

    /// Whether both callbacks are the same target.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nullary(a), Self::Nullary(b)) => Rc::ptr_eq(a, b),
            (Self::Unary(a), Self::Unary(b)) => Rc::ptr_eq(a, b),
            (Self::MethodNullary(a), Self::MethodNullary(b)) => Rc::ptr_eq(a, b),
            (Self::Method(a), Self::Method(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Run against `receiver`. Unary shapes are skipped when `value` is `None`;
    /// callers check arity beforehand.
    pub(crate) fn invoke(&self, receiver: &T, value: Option<&V>) {
        match (self, value) {
            (Self::Nullary(f), _) => f(),
            (Self::MethodNullary(f), _) => f(receiver),
            (Self::Unary(f), Some(value)) => f(value),
            (Self::Method(f), Some(value)) => f(receiver, value),
            (Self::Unary(_) | Self::Method(_), None) => {}
        }
    }
}

impl<T: ?Sized, V: ?Sized> Clone for Callback<T, V> {
    fn clone(&self) -> Self {
        match self {
            Self::Nullary(f) => Self::Nullary(Rc::clone(f)),
            Self::Unary(f) => Self::Unary(Rc::clone(f)),
            Self::MethodNullary(f) => Self::MethodNullary(Rc::clone(f)),
            Self::Method(f) => Self::Method(Rc::clone(f)),
        }
    }
}

impl<T: ?Sized, V: ?Sized> fmt::Debug for Callback<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            Self::Nullary(_) => "Nullary",
            Self::Unary(_) => "Unary",
            Self::MethodNullary(_) => "MethodNullary",
            Self::Method(_) => "Method",
        };
        write!(f, "Callback::{shape}(..)")
    }
}
