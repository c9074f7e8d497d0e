#![forbid(unsafe_code)]

//! Runtime-selectable and forward-declared methods for classkit.
//!
//! - [`VariantMethod`]: a keyed virtual table shared by every instance, with a
//!   lazily materialized per-instance [`Dispatcher`] that remembers which
//!   variant is selected.
//! - [`Declaration`]: a method declared by its [`Stub`] and implemented later,
//!   independently per subclass.

pub mod declare;
pub mod variant;

pub use declare::{Declaration, Stub, declare, implement_in};
pub use variant::{Dispatcher, VariantMethod, VariantView};
