//! Resource type definitions
//!
//! Each type carries the attribute schema the provider validates against.

use carina_core::provider::ResourceType;
use carina_core::schema::ResourceSchema;

use crate::schemas;

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:path) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
        }
    };
}

define_resource_type!(
    GuardDutyFilterType,
    crate::guardduty::filter::RESOURCE_TYPE,
    schemas::guardduty::filter_schema
);
define_resource_type!(
    ElasticsearchDomainType,
    crate::elasticsearch::domain::RESOURCE_TYPE,
    schemas::elasticsearch::domain_schema
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(GuardDutyFilterType), Box::new(ElasticsearchDomainType)]
}
