//! Modlink Events - Catalog change notifications for the modlink runtime.
//!
//! The module catalog (installer side) publishes a [`ModuleEvent`] on the
//! [`ModuleEventBus`] whenever a module is installed, removed, or has its
//! enabled flag flipped. The runtime subscribes and reacts by creating or
//! destroying module loaders and evicting stale slot bindings.
//!
//! # Example
//!
//! ```rust
//! use modlink_core::{ModuleId, ModuleInfo};
//! use modlink_events::{EventMetadata, ModuleEvent, ModuleEventBus};
//!
//! # async fn example() {
//! let bus = ModuleEventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(ModuleEvent::Installed {
//!     metadata: EventMetadata::new("installer"),
//!     module: ModuleInfo::new(ModuleId::from_static("home"), "1.0.0"),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.event_type(), "module_installed");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod event;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventReceiver, ModuleEventBus};
pub use event::{EventMetadata, ModuleEvent};
