//! GuardDuty schema definitions

use carina_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as aws_types;
use crate::guardduty::filter::RESOURCE_TYPE;

/// Returns the schema for GuardDuty filters
pub fn filter_schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("A GuardDuty filter that acts on matching findings")
        .attribute(
            AttributeSchema::new("detector_id", AttributeType::String)
                .required()
                .force_new()
                .with_description("ID of the detector the filter belongs to"),
        )
        .attribute(
            AttributeSchema::new("name", aws_types::filter_name())
                .required()
                .force_new()
                .with_description("Name of the filter"),
        )
        .attribute(
            AttributeSchema::new("description", aws_types::filter_description())
                .with_description("Description of the filter"),
        )
        .attribute(
            AttributeSchema::new("action", aws_types::filter_action())
                .required()
                .with_description("Action applied to matching findings"),
        )
        .attribute(
            AttributeSchema::new("rank", AttributeType::Int)
                .required()
                .with_description("Position of the filter in the list of saved filters"),
        )
        .attribute(
            AttributeSchema::new("tags", types::string_map())
                .with_description("Tags applied when the filter is created"),
        )
        .attribute(
            AttributeSchema::new("finding_criteria", aws_types::finding_criteria())
                .required()
                .with_description("Criteria findings must match, as a list of criterion blocks"),
        )
}

/// Returns all GuardDuty-related schemas
pub fn schemas() -> Vec<ResourceSchema> {
    vec![filter_schema()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use carina_core::resource::Value;
    use carina_core::schema::TypeError;
    use std::collections::HashMap;

    fn valid_attrs() -> HashMap<String, Value> {
        let criterion = Value::Map(HashMap::from([
            ("field".to_string(), Value::from("type")),
            ("condition".to_string(), Value::from("not_equals")),
            (
                "values".to_string(),
                Value::List(vec![Value::from("Recon:EC2/PortProbeUnprotectedPort")]),
            ),
        ]));
        HashMap::from([
            ("detector_id".to_string(), Value::from("abc123")),
            ("name".to_string(), Value::from("port-scans")),
            ("action".to_string(), Value::from("NOOP")),
            ("rank".to_string(), Value::Int(2)),
            (
                "finding_criteria".to_string(),
                Value::Map(HashMap::from([(
                    "criterion".to_string(),
                    Value::List(vec![criterion]),
                )])),
            ),
        ])
    }

    #[test]
    fn valid_filter() {
        assert!(filter_schema().validate(&valid_attrs()).is_ok());
    }

    #[test]
    fn missing_required_attributes() {
        let schema = filter_schema();
        let mut attrs = valid_attrs();
        attrs.remove("rank");
        attrs.remove("detector_id");
        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(
            errors
                .iter()
                .all(|e| matches!(e, TypeError::MissingRequired { .. }))
        );
    }

    #[test]
    fn invalid_action_names_the_attribute() {
        let mut attrs = valid_attrs();
        attrs.insert("action".to_string(), Value::from("DROP"));
        let errors = filter_schema().validate(&attrs).unwrap_err();
        assert!(errors[0].to_string().starts_with("Attribute 'action'"));
    }

    #[test]
    fn detector_and_name_force_replacement() {
        let schema = filter_schema();
        let from = valid_attrs();
        let mut to = valid_attrs();
        to.insert("name".to_string(), Value::from("renamed"));
        to.insert("rank".to_string(), Value::Int(5));
        assert_eq!(schema.requires_replacement(&from, &to), vec!["name"]);
    }
}
