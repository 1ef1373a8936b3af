//! Container lifecycle control for tenantctl.
//!
//! Leaf-first: [`backend`] talks to the engine, [`resolver`] turns its
//! observations into operator-facing statuses, [`dispatcher`] drives
//! actions under the per-container [`lock`], and [`fleet`] folds resolved
//! records into summary counters.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod backend;
pub mod dispatcher;
pub mod fleet;
pub mod lock;
pub mod resolver;
