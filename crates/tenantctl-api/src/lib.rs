//! # tenantctl-api
//!
//! Operator-facing control surface over the lifecycle core.
//!
//! - [`ControlService`](service::ControlService): authenticated listing,
//!   fleet statistics, and action invocation.
//! - [`Server`](server::Server) / [`ControlClient`](client::ControlClient):
//!   line-delimited JSON transport, one request per line.
//! - [`TokenVerifier`](auth::TokenVerifier) and [`TenantStore`](tenants::TenantStore):
//!   seams to the identity and registration subsystems.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tenantctl_api::auth::JwtAuthority;
//! use tenantctl_api::service::ControlService;
//! use tenantctl_api::tenants::MemoryTenantStore;
//! use tenantctl_runtime::backend::memory::MemoryRuntime;
//!
//! let authority = Arc::new(JwtAuthority::new("secret", 3600));
//! let service = ControlService::new(
//!     Arc::new(MemoryTenantStore::default()),
//!     Arc::new(MemoryRuntime::new()),
//!     authority.clone(),
//!     "nginx:alpine",
//! );
//! let token = authority.issue("admin").unwrap();
//! let operator = service.authenticate(Some(&token)).unwrap();
//! let stats = service.fleet_stats(&operator).unwrap();
//! assert_eq!(stats.total_users, 0);
//! ```
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod auth;
pub mod client;
pub mod protocol;
pub mod server;
pub mod service;
pub mod tenants;
