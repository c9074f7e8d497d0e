#![forbid(unsafe_code)]

//! Signals for classkit.
//!
//! A [`Signal`] is declared once per class and resolves, per instance, to an
//! [`Emitter`] whose listener list starts as the class-level callbacks and
//! then grows or shrinks independently. Listeners are [`Callback`]s of a
//! declared shape; emitting adapts the call to each shape.
//!
//! # Emit order
//!
//! | Order | Source |
//! |-------|--------|
//! | 1 | [`Signal::bind_method`], bound to the instance |
//! | 2 | [`Signal::bind_free`] |
//! | 3 | [`Emitter::connect`] on this instance |
//!
//! # Failure Modes
//!
//! | Failure | Cause | Effect |
//! |---------|-------|--------|
//! | `TooManyArguments` | more than one value passed | nothing runs |
//! | `MissingArgument` | no value, but a unary listener is present | nothing runs |
//! | `StorageUnavailable` | instance has no slot storage | no emitter |
//! | `InvalidCallbackTarget` | wrong callback shape for the registry | not bound |

mod callback;
mod emitter;
mod signal;

pub use callback::{Arity, Callback};
pub use emitter::Emitter;
pub use signal::{Signal, signal_method};
