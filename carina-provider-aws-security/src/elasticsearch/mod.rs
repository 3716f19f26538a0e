//! Elasticsearch Service resources

pub mod domain;
pub mod security;

pub use domain::DomainSpec;
pub use security::{MasterUserOptions, SecurityOptions};
