//! Modlink Slots - Multiplexes logical components onto host slots.
//!
//! The host declares a small, fixed set of slots up front: one singleton
//! slot and N interchangeable pooled slots. Modules can ship any number of
//! long-running components. [`SlotPool`] binds each active component, by its
//! [`ComponentKey`](modlink_core::ComponentKey), to one free pooled slot and
//! hands the slot back when the component is released.
//!
//! # Example
//!
//! ```rust
//! use modlink_core::{ComponentKey, ModuleId};
//! use modlink_slots::{SlotError, SlotPool};
//!
//! let pool = SlotPool::new();
//! pool.configure_pool(["S1", "S2"]).unwrap();
//!
//! let module = ModuleId::from_static("media");
//! let x = ComponentKey::new(module.clone(), "media.Player");
//! let y = ComponentKey::new(module.clone(), "media.Downloader");
//! let z = ComponentKey::new(module, "media.Scanner");
//!
//! assert_eq!(pool.acquire(&x).unwrap().name(), "S1");
//! assert_eq!(pool.acquire(&y).unwrap().name(), "S2");
//! assert!(matches!(pool.acquire(&z), Err(SlotError::Exhausted { .. })));
//!
//! pool.release(&x);
//! assert_eq!(pool.acquire(&z).unwrap().name(), "S1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod handle;
mod pool;

pub use error::{SlotError, SlotResult};
pub use handle::{SlotHandle, SlotKind};
pub use pool::{PoolStats, SlotPool};
