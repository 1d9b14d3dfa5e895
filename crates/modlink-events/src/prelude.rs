//! Prelude module - commonly used types for convenient import.
//!
//! Use `use modlink_events::prelude::*;` to import all essential types.

pub use crate::{
    DEFAULT_CHANNEL_CAPACITY, EventMetadata, EventReceiver, ModuleEvent, ModuleEventBus,
};
