//! Ancillary client-name lookup.
//!
//! Display-only collaborator. Failures here are tolerated by callers and
//! never affect timeline state.

use crate::model::activity::ClientId;
use std::collections::BTreeMap;
use std::error::Error;

pub type ClientLookupError = Box<dyn Error + Send + Sync>;

pub trait ClientDirectory {
    /// Resolves display names for the given clients. Unknown ids may be
    /// omitted from the result.
    fn client_names(&self, ids: &[ClientId]) -> Result<BTreeMap<ClientId, String>, ClientLookupError>;
}

/// Fixed in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct StaticClientDirectory {
    names: BTreeMap<ClientId, String>,
}

impl StaticClientDirectory {
    pub fn new(names: BTreeMap<ClientId, String>) -> Self {
        Self { names }
    }
}

impl ClientDirectory for StaticClientDirectory {
    fn client_names(&self, ids: &[ClientId]) -> Result<BTreeMap<ClientId, String>, ClientLookupError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.names.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}
