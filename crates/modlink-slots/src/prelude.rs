//! Prelude module - commonly used types for convenient import.
//!
//! Use `use modlink_slots::prelude::*;` to import all essential types.

pub use crate::{PoolStats, SlotError, SlotHandle, SlotKind, SlotPool, SlotResult};
