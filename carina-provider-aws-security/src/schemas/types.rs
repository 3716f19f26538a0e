//! AWS-specific type definitions

use std::collections::HashMap;

use carina_core::resource::Value;
use carina_core::schema::{AttributeType, validate_string_length};

use crate::elasticsearch::SecurityOptions;
use crate::guardduty::criteria::{FieldRegistry, criteria_from_value, serialize};

/// GuardDuty filter name: 3 to 64 characters
pub fn filter_name() -> AttributeType {
    AttributeType::Custom {
        name: "FilterName".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| validate_string_length(value, 3, 64),
    }
}

/// GuardDuty filter description: at most 512 characters
pub fn filter_description() -> AttributeType {
    AttributeType::Custom {
        name: "FilterDescription".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| validate_string_length(value, 0, 512),
    }
}

/// What GuardDuty does with matching findings
/// - NOOP: findings stay visible
/// - ARCHIVE: findings are archived automatically
pub fn filter_action() -> AttributeType {
    AttributeType::Enum(vec!["NOOP".to_string(), "ARCHIVE".to_string()])
}

/// Entry of a `criterion` block: `field` and `condition` are strings,
/// `values` is a list of strings
fn criterion_entry() -> AttributeType {
    AttributeType::Custom {
        name: "CriterionEntry".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(_) => Ok(()),
            Value::List(_) => AttributeType::List(Box::new(AttributeType::String))
                .validate(value)
                .map_err(|e| e.to_string()),
            other => Err(format!("Expected string or list, got {}", other.type_name())),
        },
    }
}

/// One `criterion { field, condition, values }` block
pub fn criterion() -> AttributeType {
    AttributeType::Custom {
        name: "Criterion".to_string(),
        base: Box::new(AttributeType::Map(Box::new(criterion_entry()))),
        validate: |value| {
            let block = HashMap::from([(
                "criterion".to_string(),
                Value::List(vec![value.clone()]),
            )]);
            criteria_from_value(&Value::Map(block))
                .map(|_| ())
                .map_err(|e| e.to_string())
        },
    }
}

/// `finding_criteria { criterion = [...] }` block
///
/// Runs the whole criteria check so that unknown fields and illegal
/// conditions are reported at validation time.
pub fn finding_criteria() -> AttributeType {
    AttributeType::Custom {
        name: "FindingCriteria".to_string(),
        base: Box::new(AttributeType::Map(Box::new(AttributeType::List(Box::new(
            criterion(),
        ))))),
        validate: |value| {
            let criteria = criteria_from_value(value).map_err(|e| e.to_string())?;
            if criteria.is_empty() {
                return Err("finding_criteria needs at least one criterion".to_string());
            }
            serialize(&criteria, FieldRegistry::guardduty())
                .map(|_| ())
                .map_err(|e| e.to_string())
        },
    }
}

/// Elasticsearch domain name: 3 to 28 characters, lowercase letters, digits
/// and hyphens, starting with a letter
pub fn domain_name() -> AttributeType {
    AttributeType::Custom {
        name: "DomainName".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            validate_string_length(value, 3, 28)?;
            let Value::String(s) = value else {
                return Err("Expected string".to_string());
            };
            let starts_with_letter = s.chars().next().is_some_and(|c| c.is_ascii_lowercase());
            let valid_chars = s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
            if starts_with_letter && valid_chars {
                Ok(())
            } else {
                Err(format!(
                    "Invalid domain name '{}': must start with a lowercase letter and contain only lowercase letters, digits and hyphens",
                    s
                ))
            }
        },
    }
}

/// Entry of `advanced_security_options`: a flag or the nested
/// `master_user_options` block
fn security_option_entry() -> AttributeType {
    AttributeType::Custom {
        name: "SecurityOptionEntry".to_string(),
        base: Box::new(AttributeType::Bool),
        validate: |value| match value {
            Value::Bool(_) | Value::Map(_) | Value::List(_) => Ok(()),
            other => Err(format!("Expected bool or block, got {}", other.type_name())),
        },
    }
}

/// `advanced_security_options { ... }` block
pub fn security_options() -> AttributeType {
    AttributeType::Custom {
        name: "AdvancedSecurityOptions".to_string(),
        base: Box::new(AttributeType::Map(Box::new(security_option_entry()))),
        validate: |value| match value {
            Value::List(items) if items.is_empty() => Ok(()),
            _ => SecurityOptions::from_value(value)
                .map(|_| ())
                .map_err(|e| e.to_string()),
        },
    }
}
