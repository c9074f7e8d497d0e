#![forbid(unsafe_code)]

//! Per-instance lazy members for runtime class objects.
//!
//! `classkit` bundles the building blocks split across its sub-crates:
//!
//! - [`core`]: [`LazySlot`](core::LazySlot), [`Class`](core::Class), slot
//!   storage and the shared [`ClassError`](core::ClassError)
//! - [`dispatch`] (feature `dispatch`): variant methods and forward
//!   declarations
//! - [`signal`] (feature `signal`): signals with arity-adaptive callbacks
//!
//! Most code only needs the [`prelude`].
//!
//! ```
//! use classkit::prelude::*;
//!
//! struct Counter {
//!     slots: SlotStorage,
//! }
//!
//! impl SlotHost for Counter {
//!     fn slot_storage(&self) -> Option<&SlotStorage> {
//!         Some(&self.slots)
//!     }
//! }
//!
//! let history = descriptor::<Counter, std::cell::RefCell<Vec<u32>>>(Default::default)
//!     .named("history")
//!     .unwrap();
//! let counter = Counter { slots: SlotStorage::new() };
//! history.get(&counter).unwrap().borrow_mut().push(1);
//! assert_eq!(*history.get(&counter).unwrap().borrow(), [1]);
//! ```

pub use classkit_core as core;

#[cfg(feature = "dispatch")]
pub use classkit_dispatch as dispatch;

#[cfg(feature = "signal")]
pub use classkit_signal as signal;

pub use classkit_core::{ClassError, Result};

/// Common imports.
pub mod prelude {
    pub use classkit_core::{
        Class, ClassError, ClassInstance, Implementation, LazySlot, Member, SlotHost, SlotStorage,
        descriptor, lazy,
    };

    #[cfg(feature = "dispatch")]
    pub use classkit_dispatch::{Declaration, Stub, VariantMethod, declare, implement_in};

    #[cfg(feature = "signal")]
    pub use classkit_signal::{Callback, Signal, signal_method};
}
