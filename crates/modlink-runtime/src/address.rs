//! In-process slot addresses.

use std::fmt;

use modlink_core::ComponentKey;
use modlink_slots::SlotHandle;
use uuid::Uuid;

/// Where the host should start a component: which slot, for which key.
///
/// Every address carries a fresh request id so hosts can tell repeated
/// requests for the same binding apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAddress {
    /// The slot serving the component.
    pub slot: SlotHandle,
    /// The component's logical key.
    pub key: ComponentKey,
    /// Unique id of this request.
    pub request_id: Uuid,
}

impl SlotAddress {
    /// Address `key` at `slot` with a new request id.
    #[must_use]
    pub fn new(slot: SlotHandle, key: ComponentKey) -> Self {
        Self {
            slot,
            key,
            request_id: Uuid::new_v4(),
        }
    }
}

impl fmt::Display for SlotAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.key, self.slot)
    }
}
