//! Carina Core
//!
//! Resource model, provider trait and attribute schemas shared by Carina providers

pub mod provider;
pub mod resource;
pub mod schema;
