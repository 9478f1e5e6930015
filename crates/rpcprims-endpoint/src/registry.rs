use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{DuplicatePolicy, RegistryConfig};
use crate::endpoint::Endpoint;
use crate::error::{EndpointError, Result};

/// Name-keyed store of endpoints.
///
/// Construct one per application (or per test) and share it; there is no
/// process-global instance. Registration takes `&self`, so installers running
/// on different threads can register concurrently. Endpoints are never
/// removed.
pub struct EndpointRegistry<C> {
    endpoints: RwLock<HashMap<String, Arc<Endpoint<C>>>>,
    config: RegistryConfig,
}

impl<C> EndpointRegistry<C> {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register an endpoint under its own name.
    ///
    /// With [`DuplicatePolicy::Reject`] a second registration of a name fails
    /// and leaves the registry unchanged. With [`DuplicatePolicy::Replace`]
    /// the new endpoint wins and the previous one is returned.
    pub fn register(
        &self,
        endpoint: impl Into<Arc<Endpoint<C>>>,
    ) -> Result<Option<Arc<Endpoint<C>>>> {
        let endpoint = endpoint.into();
        let name = endpoint.name().to_string();
        let mut endpoints = self.write();

        if endpoints.contains_key(&name) {
            match self.config.duplicate_policy {
                DuplicatePolicy::Reject => {
                    tracing::warn!(endpoint = %name, "rejected duplicate endpoint registration");
                    return Err(EndpointError::DuplicateEndpoint(name));
                }
                DuplicatePolicy::Replace => {
                    tracing::warn!(endpoint = %name, "replacing registered endpoint");
                }
            }
        } else {
            tracing::debug!(
                endpoint = %name,
                path = endpoint.path(),
                methods = endpoint.methods().len(),
                "registered endpoint"
            );
        }

        Ok(endpoints.insert(name, endpoint))
    }

    /// Look up an endpoint by name. `None` when nothing is registered under it.
    pub fn get(&self, name: &str) -> Option<Arc<Endpoint<C>>> {
        self.read().get(name).cloned()
    }

    /// Every registered endpoint, in no particular order.
    pub fn get_all(&self) -> Vec<Arc<Endpoint<C>>> {
        self.read().values().cloned().collect()
    }

    /// Registered endpoint names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // A writer that panicked cannot leave the map half-updated: `insert` is the
    // only mutation. Keep serving instead of propagating the poison.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Endpoint<C>>>> {
        self.endpoints.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Endpoint<C>>>> {
        self.endpoints.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> Default for EndpointRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
