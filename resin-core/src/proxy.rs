use std::sync::Arc;

use crate::address::Address;
use crate::model::Model;

/// A reference to a stored object.
///
/// Proxies exist in two states:
/// - **Unresolved**: contains only the target's address (after decoding)
/// - **Resolved**: also shares the loaded target object
///
/// When encoded, proxies always emit just the address.
#[derive(Debug, Clone)]
pub enum Proxy {
    /// Unresolved reference - contains only the address.
    Unresolved(Address),
    /// Resolved reference - address plus the loaded object.
    Resolved {
        address: Address,
        target: Arc<dyn Model>,
    },
}

/// Something that can load the object behind an address.
pub trait Resolve {
    type Error;

    fn resolve_address(&self, address: &Address) -> Result<Arc<dyn Model>, Self::Error>;
}

impl Proxy {
    /// Creates an unresolved proxy.
    pub fn new(address: Address) -> Self {
        Proxy::Unresolved(address)
    }

    /// Creates a resolved proxy around an already loaded object.
    pub fn resolved(address: Address, target: Arc<dyn Model>) -> Self {
        Proxy::Resolved { address, target }
    }

    /// Returns the address of the referenced object.
    pub fn address(&self) -> &Address {
        match self {
            Proxy::Unresolved(address) => address,
            Proxy::Resolved { address, .. } => address,
        }
    }

    /// Returns true if this proxy is resolved.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Proxy::Resolved { .. })
    }

    /// Returns the loaded object, if resolved.
    pub fn target(&self) -> Option<&Arc<dyn Model>> {
        match self {
            Proxy::Unresolved(_) => None,
            Proxy::Resolved { target, .. } => Some(target),
        }
    }

    /// Returns the loaded object as a `T`, if resolved and of that type.
    pub fn get<T: Model>(&self) -> Option<&T> {
        self.target().and_then(|target| target.downcast_ref::<T>())
    }

    /// Loads the target through `resolver`. Already resolved proxies are
    /// returned unchanged.
    pub fn resolve<R>(self, resolver: &R) -> Result<Proxy, R::Error>
    where
        R: Resolve + ?Sized,
    {
        match self {
            Proxy::Unresolved(address) => {
                let target = resolver.resolve_address(&address)?;
                Ok(Proxy::Resolved { address, target })
            }
            resolved => Ok(resolved),
        }
    }
}
