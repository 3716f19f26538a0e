//! Elasticsearch Service schema definitions

use carina_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::types as aws_types;
use crate::elasticsearch::domain::RESOURCE_TYPE;

/// Returns the schema for Elasticsearch domains
pub fn domain_schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("An Elasticsearch Service domain")
        .attribute(
            AttributeSchema::new("domain_name", aws_types::domain_name())
                .required()
                .force_new()
                .with_description("Name of the domain"),
        )
        .attribute(
            AttributeSchema::new("elasticsearch_version", AttributeType::String)
                .force_new()
                .with_description("Engine version, e.g. 7.10"),
        )
        .attribute(
            AttributeSchema::new("advanced_security_options", aws_types::security_options())
                .with_description("Fine-grained access control settings"),
        )
}

/// Returns all Elasticsearch-related schemas
pub fn schemas() -> Vec<ResourceSchema> {
    vec![domain_schema()]
}
