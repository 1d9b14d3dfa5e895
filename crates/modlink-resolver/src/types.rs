//! Runtime type descriptors and the handles that reference them.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use modlink_core::{Capability, ModuleId};

use crate::error::{ResolveError, ResolveResult};
use crate::instance::{ContractObject, HostedComponent, Instance, ModuleEntry};

/// Zero-argument constructor of a type.
pub type Constructor = Arc<dyn Fn() -> Result<Instance, String> + Send + Sync>;

/// Shared liveness token of one loader.
///
/// Every handle the loader hands out carries a clone. Retiring the loader
/// flips the token for all of them at once.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    /// A fresh, live token.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Whether the owning loader is still live.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the owning loader retired. Irreversible.
    pub fn retire(&self) {
        self.0.store(false, Ordering::Release);
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Definition of one type exported by module code.
pub struct TypeDef {
    symbol: String,
    constructor: Option<Constructor>,
}

impl TypeDef {
    /// A type built by `constructor`.
    #[must_use]
    pub fn new<F>(symbol: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Result<Instance, String> + Send + Sync + 'static,
    {
        Self {
            symbol: symbol.into(),
            constructor: Some(Arc::new(constructor)),
        }
    }

    /// A type without a zero-argument constructor (an interface, or a
    /// class that needs arguments).
    #[must_use]
    pub fn abstract_type(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            constructor: None,
        }
    }

    /// A module entry point type.
    #[must_use]
    pub fn entry<E, F>(symbol: impl Into<String>, make: F) -> Self
    where
        E: ModuleEntry + 'static,
        F: Fn() -> E + Send + Sync + 'static,
    {
        Self::new(symbol, move || Ok(Instance::Entry(Box::new(make()))))
    }

    /// A slot-hosted component type.
    #[must_use]
    pub fn component<C, F>(symbol: impl Into<String>, make: F) -> Self
    where
        C: HostedComponent + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self::new(symbol, move || Ok(Instance::Component(Box::new(make()))))
    }

    /// A type implementing the named contracts.
    #[must_use]
    pub fn object<T, F>(symbol: impl Into<String>, contracts: &[&str], make: F) -> Self
    where
        T: std::any::Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let contracts: Vec<String> = contracts.iter().map(|c| (*c).to_owned()).collect();
        Self::new(symbol, move || {
            Ok(Instance::Object(ContractObject::new(
                contracts.iter().cloned(),
                make(),
            )))
        })
    }

    /// The fully-qualified symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Whether the type has a zero-argument constructor.
    #[must_use]
    pub fn is_constructible(&self) -> bool {
        self.constructor.is_some()
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("symbol", &self.symbol)
            .field("constructible", &self.is_constructible())
            .finish()
    }
}

/// A resolved type, bound to the loader that produced it.
///
/// Cheap to clone. Two handles are the same type only if they come from the
/// same definition through the same loader.
#[derive(Clone)]
pub struct TypeHandle {
    def: Arc<TypeDef>,
    owner: ModuleId,
    liveness: Liveness,
}

impl TypeHandle {
    pub(crate) fn new(def: Arc<TypeDef>, owner: ModuleId, liveness: Liveness) -> Self {
        Self {
            def,
            owner,
            liveness,
        }
    }

    /// The type's symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        self.def.symbol()
    }

    /// The module whose loader produced this handle.
    #[must_use]
    pub fn owner(&self) -> &ModuleId {
        &self.owner
    }

    /// False once the producing loader has been retired.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Whether both handles denote the same runtime type.
    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.def, &other.def) && self.liveness.ptr_eq(&other.liveness)
    }

    /// Construct a zero-argument instance and check it against `expected`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Retired`] if the producing loader was retired
    /// - [`ResolveError::NotConstructible`] if the type has no zero-argument
    ///   constructor or its constructor fails
    /// - [`ResolveError::AttachFailed`] if the instance does not satisfy
    ///   `expected`
    pub fn instantiate(&self, expected: &Capability) -> ResolveResult<Instance> {
        if !self.is_usable() {
            return Err(ResolveError::Retired {
                symbol: self.symbol().to_owned(),
                module: self.owner.clone(),
            });
        }

        let constructor =
            self.def
                .constructor
                .as_ref()
                .ok_or_else(|| ResolveError::NotConstructible {
                    symbol: self.symbol().to_owned(),
                    reason: "no zero-argument constructor".to_owned(),
                })?;

        let instance = constructor().map_err(|reason| ResolveError::NotConstructible {
            symbol: self.symbol().to_owned(),
            reason,
        })?;

        if !instance.satisfies(expected) {
            return Err(ResolveError::AttachFailed {
                symbol: self.symbol().to_owned(),
                expected: expected.clone(),
                actual: instance.describe(),
            });
        }

        Ok(instance)
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("symbol", &self.symbol())
            .field("owner", &self.owner)
            .field("usable", &self.is_usable())
            .finish()
    }
}
