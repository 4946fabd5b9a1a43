use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use trafgen_source::AddressResolver;
use trafgen_wire::Address;

/// Maps node names to addresses.
///
/// Resolves registered names (e.g. `host[1]`) and, failing that, literal IPv4, IPv6 and
/// hardware addresses. Clones share the same table, so names registered after a traffic source
/// was created are visible to it on its next resolution.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: Arc<RwLock<FxHashMap<String, Address>>>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` for `address`, returning the address it previously named.
    pub fn insert(&self, name: impl Into<String>, address: Address) -> Option<Address> {
        self.names.write().insert(name.into(), address)
    }

    /// Forgets `name`.
    pub fn remove(&self, name: &str) -> Option<Address> {
        self.names.write().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.read().contains_key(name)
    }
}

impl AddressResolver for NameTable {
    fn resolve(&self, name: &str) -> Option<Address> {
        if let Some(address) = self.names.read().get(name) {
            return Some(*address);
        }

        name.parse().ok()
    }
}
