//! AWS resource schema definitions

pub mod elasticsearch;
pub mod guardduty;
pub mod types;

use carina_core::schema::ResourceSchema;

/// Returns all AWS schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    let mut schemas = Vec::new();
    schemas.extend(guardduty::schemas());
    schemas.extend(elasticsearch::schemas());
    schemas
}
