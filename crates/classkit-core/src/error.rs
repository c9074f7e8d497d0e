//! Error type shared by every classkit primitive.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Name conflict | Member bound under two names | `NameConflict` at bind time |
//! | Read-only member | Assignment through a slot/variant/signal/declaration | `AssignmentRejected` |
//! | No storage | Instance does not host slot storage | `StorageUnavailable` |
//! | Missing key | Dispatch with an unregistered key | `UnregisteredKey` at call time |
//! | Wrong shape | Callback or implementation of the wrong kind | `InvalidCallbackTarget` / `InvalidImplementationTarget` |
//! | Emit arity | More than one value, or no value for a unary callback | `TooManyArguments` / `MissingArgument` |
//! | Declarations | Used before implemented, or implemented twice | `NotImplemented` / `AlreadyImplemented` |
//!
//! None of these are retried internally; they are programmer errors surfaced to
//! the caller at the point of violation.

use std::fmt;

/// Errors raised by slots, variant methods, signals and declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassError {
    /// A member was bound under two different public names, or two slots of
    /// different value types share one storage name.
    NameConflict { existing: String, requested: String },
    /// Direct assignment to a read-only member.
    AssignmentRejected { member: &'static str },
    /// The instance does not provide per-instance slot storage.
    StorageUnavailable { type_name: &'static str, slot: String },
    /// The member was used before it was bound to a name.
    UnboundMember { what: &'static str },
    /// Dispatch attempted with a key absent from the table.
    UnregisteredKey { key: String },
    /// A callback of the wrong shape was bound to a signal.
    InvalidCallbackTarget { reason: String },
    /// `emit` received more than one value.
    TooManyArguments { given: usize },
    /// `emit` received no value but a connected callback expects one.
    MissingArgument { signal: String },
    /// A declared method was used before any implementation exists.
    NotImplemented { method: String, class: String },
    /// An implementation was supplied twice at the same inheritance level.
    AlreadyImplemented { name: String, class: Option<String> },
    /// An implementation target is neither a method nor a function of the
    /// declared shape.
    InvalidImplementationTarget { found: String },
}

impl fmt::Display for ClassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameConflict {
                existing,
                requested,
            } => write!(
                f,
                "cannot bind the same member to two different names ('{existing}' and '{requested}')"
            ),
            Self::AssignmentRejected { member } => write!(f, "can not assign to {member}"),
            Self::StorageUnavailable { type_name, slot } => write!(
                f,
                "no slot storage on '{type_name}' instance to save '{slot}' property"
            ),
            Self::UnboundMember { what } => write!(f, "{what} is not bound to a name"),
            Self::UnregisteredKey { key } => write!(f, "no variant was registered by {key}"),
            Self::InvalidCallbackTarget { reason } => write!(f, "invalid callback: {reason}"),
            Self::TooManyArguments { given } => {
                write!(f, "too many arguments for emit (expected at most 1, got {given})")
            }
            Self::MissingArgument { signal } => {
                write!(f, "emit on '{signal}' requires a value for a unary callback")
            }
            Self::NotImplemented { method, class } => write!(
                f,
                "can not find the implementation of the method '{method}' in '{class}'"
            ),
            Self::AlreadyImplemented { name, class: None } => {
                write!(f, "function '{name}' has already been implemented")
            }
            Self::AlreadyImplemented {
                name,
                class: Some(class),
            } => write!(
                f,
                "method '{name}' of class '{class}' has already been implemented"
            ),
            Self::InvalidImplementationTarget { found } => write!(
                f,
                "expected a method or a function for implementation, but got {found}"
            ),
        }
    }
}

impl std::error::Error for ClassError {}

/// Result alias used across the classkit crates.
pub type Result<T> = std::result::Result<T, ClassError>;
