//! Slot pool error types.

use modlink_core::ComponentKey;
use thiserror::Error;

use crate::handle::SlotKind;

/// Errors raised by the slot pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Every pooled slot is bound. No state was changed.
    #[error("no free slot for {key}: all {capacity} pooled slots are in use")]
    Exhausted {
        /// The key that could not be bound.
        key: ComponentKey,
        /// Number of pooled slots.
        capacity: usize,
    },

    /// No slot of this kind has been configured.
    #[error("no {0} slot configured")]
    Unconfigured(SlotKind),

    /// A roster named the same slot twice.
    #[error("slot declared more than once: {0}")]
    DuplicateSlot(String),
}

/// Result type for slot pool operations.
pub type SlotResult<T> = Result<T, SlotError>;
