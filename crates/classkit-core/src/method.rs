#![forbid(unsafe_code)]

//! Implementations that may or may not take a receiver, and their bound form.
//!
//! An [`Implementation`] is either a method (`Fn(&T, A) -> R`) that needs an
//! instance to run, or a free function (`Fn(A) -> R`) that runs context-free.
//! Binding either kind against an instance yields a [`BoundMethod`]; a bound
//! free function simply ignores the receiver.

use std::fmt;
use std::rc::Rc;

/// A callable body with an optional receiver.
///
/// `A` is the argument pack, normally a tuple such as `(i32, i32)`.
pub enum Implementation<T: ?Sized, A, R> {
    /// Receives the instance as its first argument.
    Method(Rc<dyn Fn(&T, A) -> R>),
    /// Runs without an instance.
    Function(Rc<dyn Fn(A) -> R>),
}

impl<T: ?Sized, A, R> Implementation<T, A, R> {
    /// Wrap a method body.
    pub fn method(f: impl Fn(&T, A) -> R + 'static) -> Self {
        Self::Method(Rc::new(f))
    }

    /// Wrap a free function body.
    pub fn function(f: impl Fn(A) -> R + 'static) -> Self {
        Self::Function(Rc::new(f))
    }

    /// Whether the body expects a receiver.
    #[must_use]
    pub fn is_method(&self) -> bool {
        matches!(self, Self::Method(_))
    }

    /// Bind against `receiver`.
    pub fn bind<'a>(&self, receiver: &'a T) -> BoundMethod<'a, T, A, R> {
        BoundMethod {
            receiver,
            body: self.clone(),
        }
    }

    /// Identity comparison: both wrap the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Method(a), Self::Method(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T: ?Sized, A, R> Clone for Implementation<T, A, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Method(f) => Self::Method(Rc::clone(f)),
            Self::Function(f) => Self::Function(Rc::clone(f)),
        }
    }
}

impl<T: ?Sized, A, R> fmt::Debug for Implementation<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(_) => f.write_str("Implementation::Method(..)"),
            Self::Function(_) => f.write_str("Implementation::Function(..)"),
        }
    }
}

/// An implementation bound to a receiver, ready to call.
pub struct BoundMethod<'a, T: ?Sized, A, R> {
    receiver: &'a T,
    body: Implementation<T, A, R>,
}

impl<'a, T: ?Sized, A, R> BoundMethod<'a, T, A, R> {
    /// Invoke with `args`, returning the body's result unchanged.
    pub fn call(&self, args: A) -> R {
        match &self.body {
            Implementation::Method(f) => f(self.receiver, args),
            Implementation::Function(f) => f(args),
        }
    }

    /// The receiver this method is bound to.
    #[must_use]
    pub fn receiver(&self) -> &'a T {
        self.receiver
    }

    /// The underlying implementation.
    #[must_use]
    pub fn implementation(&self) -> &Implementation<T, A, R> {
        &self.body
    }
}

impl<T: ?Sized, A, R> fmt::Debug for BoundMethod<'_, T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}
