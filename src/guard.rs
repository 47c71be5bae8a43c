use std::collections::HashSet;

use crate::{error::Result, registry::Registry};

/// Caller privilege check consulted before index-rebuild operations.
pub trait AccessPolicy: Send + Sync {
    /// Whether the caller identified by `token` holds administrative
    /// privilege. Must never fail for an unauthenticated caller.
    fn has_admin_rights(&self, token: &str) -> bool;
}

/// [`AccessPolicy`] backed by the registry's admin-token set.
#[derive(Debug, Default)]
pub struct TokenGuard {
    tokens: HashSet<String>,
}

impl TokenGuard {
    pub fn new<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Load the current admin-token set from the registry.
    pub fn from_registry(registry: &Registry) -> Result<Self> {
        let tokens = registry
            .list_admin_tokens()?
            .into_iter()
            .map(|(token, _label)| token)
            .collect();
        Ok(Self { tokens })
    }
}

impl AccessPolicy for TokenGuard {
    fn has_admin_rights(&self, token: &str) -> bool {
        !token.is_empty() && self.tokens.contains(token)
    }
}

/// Check rebuild privilege, leaving an audit record on denial.
pub fn authorize_rebuild(policy: &dyn AccessPolicy, token: &str) -> bool {
    if policy.has_admin_rights(token) {
        true
    } else {
        tracing::warn!("access denied to rebuild_index: insufficient rights");
        false
    }
}
