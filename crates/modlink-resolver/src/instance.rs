//! Instances produced by module code, and the contracts they are checked
//! against.

use std::any::Any;
use std::fmt;

use modlink_core::{Capability, ComponentKey, ModuleId};

/// Context handed to a module entry point when its module loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleContext {
    /// The module being loaded.
    pub module_id: ModuleId,
    /// Installed version of the module.
    pub version: String,
}

/// A module's entry point.
///
/// Instantiated once per load. `on_load` runs after the module's loader is
/// registered; `on_unload` runs before it is retired.
pub trait ModuleEntry: Send {
    /// The module has been loaded and can resolve symbols.
    fn on_load(&mut self, ctx: &ModuleContext);

    /// The module is about to be unloaded.
    fn on_unload(&mut self) {}
}

/// Context handed to a hosted component when a slot adopts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentContext {
    /// The component's logical key.
    pub key: ComponentKey,
    /// Name of the host slot serving the component.
    pub slot: String,
}

/// A host-level signal forwarded from the slot to its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    /// Host configuration (locale, display, ...) changed.
    ConfigurationChanged,
    /// The host is running low on memory.
    LowMemory,
    /// The host asks components to trim memory to the given level.
    TrimMemory {
        /// Host-defined severity.
        level: u32,
    },
}

/// A long-running component hosted by a slot.
///
/// The slot calls `on_attach` exactly once, before any other callback.
pub trait HostedComponent: Send {
    /// The component has been bound to a slot.
    fn on_attach(&mut self, ctx: &ComponentContext);

    /// Creation callback, after `on_attach`.
    fn on_create(&mut self) {}

    /// A start request was delivered. `start_id` increases per request.
    fn on_start(&mut self, start_id: u64) {
        let _ = start_id;
    }

    /// A host signal was delivered.
    fn on_state_changed(&mut self, signal: HostSignal) {
        let _ = signal;
    }

    /// The slot is shutting the component down. No callbacks follow.
    fn on_destroy(&mut self) {}
}

/// An instance implementing one or more named contracts.
pub struct ContractObject {
    contracts: Vec<String>,
    value: Box<dyn Any + Send + Sync>,
}

impl ContractObject {
    /// Wrap `value` as an implementation of `contracts`.
    #[must_use]
    pub fn new<T, I, S>(contracts: I, value: T) -> Self
    where
        T: Any + Send + Sync,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            contracts: contracts.into_iter().map(Into::into).collect(),
            value: Box::new(value),
        }
    }

    /// Whether this object implements the named contract.
    #[must_use]
    pub fn implements(&self, contract: &str) -> bool {
        self.contracts.iter().any(|c| c == contract)
    }

    /// The contracts this object implements.
    #[must_use]
    pub fn contracts(&self) -> &[String] {
        &self.contracts
    }

    /// Borrow the value as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    /// Take the value as `T`, or give the object back.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged if the value is not a `T`.
    pub fn downcast<T: Any>(self) -> Result<Box<T>, Self> {
        let Self { contracts, value } = self;
        value.downcast().map_err(|value| Self { contracts, value })
    }
}

impl fmt::Debug for ContractObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractObject")
            .field("contracts", &self.contracts)
            .finish_non_exhaustive()
    }
}

/// A freshly constructed instance, tagged by what it is.
pub enum Instance {
    /// A module entry point.
    Entry(Box<dyn ModuleEntry>),
    /// A slot-hosted component.
    Component(Box<dyn HostedComponent>),
    /// An object implementing named contracts.
    Object(ContractObject),
}

impl Instance {
    /// Whether this instance satisfies `capability`.
    #[must_use]
    pub fn satisfies(&self, capability: &Capability) -> bool {
        match (self, capability) {
            (Self::Entry(_), Capability::Entry) | (Self::Component(_), Capability::Component) => {
                true
            },
            (Self::Object(object), Capability::Contract(name)) => object.implements(name),
            _ => false,
        }
    }

    /// Short description of the variant, used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Entry(_) => "entry".to_string(),
            Self::Component(_) => "component".to_string(),
            Self::Object(object) => format!("object[{}]", object.contracts.join(", ")),
        }
    }

    /// Unwrap an entry point.
    #[must_use]
    pub fn into_entry(self) -> Option<Box<dyn ModuleEntry>> {
        match self {
            Self::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    /// Unwrap a hosted component.
    #[must_use]
    pub fn into_component(self) -> Option<Box<dyn HostedComponent>> {
        match self {
            Self::Component(component) => Some(component),
            _ => None,
        }
    }

    /// Unwrap a contract object.
    #[must_use]
    pub fn into_object(self) -> Option<ContractObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&self.describe()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl ModuleEntry for Nop {
        fn on_load(&mut self, _ctx: &ModuleContext) {}
    }

    impl HostedComponent for Nop {
        fn on_attach(&mut self, _ctx: &ComponentContext) {}
    }

    #[test]
    fn test_satisfies() {
        let entry = Instance::Entry(Box::new(Nop));
        assert!(entry.satisfies(&Capability::Entry));
        assert!(!entry.satisfies(&Capability::Component));

        let component = Instance::Component(Box::new(Nop));
        assert!(component.satisfies(&Capability::Component));
        assert!(!component.satisfies(&Capability::contract("x.Greeter")));

        let object = Instance::Object(ContractObject::new(["x.Greeter", "x.Named"], 7u32));
        assert!(object.satisfies(&Capability::contract("x.Named")));
        assert!(!object.satisfies(&Capability::contract("x.Other")));
        assert!(!object.satisfies(&Capability::Entry));
        assert_eq!(object.describe(), "object[x.Greeter, x.Named]");
    }

    #[test]
    fn test_contract_object_downcast() {
        let object = ContractObject::new(["x.Counter"], 41u64);
        assert_eq!(object.downcast_ref::<u64>(), Some(&41));
        assert!(object.downcast_ref::<String>().is_none());

        let object = object.downcast::<String>().unwrap_err();
        assert!(object.implements("x.Counter"));
        assert_eq!(*object.downcast::<u64>().unwrap(), 41);
    }

    #[test]
    fn test_into_variants() {
        assert!(Instance::Entry(Box::new(Nop)).into_entry().is_some());
        assert!(Instance::Entry(Box::new(Nop)).into_component().is_none());
        assert!(Instance::Component(Box::new(Nop)).into_component().is_some());
        assert!(
            Instance::Object(ContractObject::new(["a"], ()))
                .into_object()
                .is_some()
        );
    }
}
