//! Tenant registration source.
//!
//! The registration subsystem owns tenant records; the control API only
//! reads them. Reads go to the source on every call so a newly registered
//! tenant shows up on the next request.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tenantctl_common::error::{ControlError, Result};
use tenantctl_common::types::Tenant;

/// Read-only source of registered tenants.
pub trait TenantStore: Send + Sync {
    /// Returns every registered tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn tenants(&self) -> Result<Vec<Tenant>>;

    /// Returns the tenant owning `container`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn find(&self, container: &str) -> Result<Option<Tenant>> {
        Ok(self
            .tenants()?
            .into_iter()
            .find(|t| t.container_name() == container))
    }
}

/// Tenants read from a JSON array file.
#[derive(Debug, Clone)]
pub struct JsonTenantStore {
    path: PathBuf,
}

impl JsonTenantStore {
    /// Creates a store reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file this store reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TenantStore for JsonTenantStore {
    fn tenants(&self) -> Result<Vec<Tenant>> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "tenant file missing, no tenants registered");
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| ControlError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        let tenants: Vec<Tenant> = serde_json::from_str(&content)?;
        Ok(dedupe_subdomains(tenants))
    }
}

/// Tenants held in memory.
#[derive(Debug, Default)]
pub struct MemoryTenantStore {
    tenants: Vec<Tenant>,
}

impl MemoryTenantStore {
    /// Creates a store holding `tenants`.
    #[must_use]
    pub fn new(tenants: Vec<Tenant>) -> Self {
        Self {
            tenants: dedupe_subdomains(tenants),
        }
    }
}

impl TenantStore for MemoryTenantStore {
    fn tenants(&self) -> Result<Vec<Tenant>> {
        Ok(self.tenants.clone())
    }
}

/// Keeps the first tenant for each subdomain; a container name has one owner.
fn dedupe_subdomains(tenants: Vec<Tenant>) -> Vec<Tenant> {
    let mut seen = HashSet::new();
    tenants
        .into_iter()
        .filter(|t| {
            let fresh = seen.insert(t.subdomain.clone());
            if !fresh {
                tracing::warn!(subdomain = %t.subdomain, id = t.id, "duplicate subdomain ignored");
            }
            fresh
        })
        .collect()
}
