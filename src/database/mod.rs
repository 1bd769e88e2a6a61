//! # Registry Access
//!
//! Read-only access to the organization registry that supplies the domains
//! for each run.
//!
//! - [`connection`] - pooled PostgreSQL connection with health check
//! - [`registry`] - the active-domain query behind the [`DomainRegistry`] seam

pub mod connection;
pub mod registry;

pub use connection::RegistryConnection;
pub use registry::{DomainRegistry, PgDomainRegistry};
