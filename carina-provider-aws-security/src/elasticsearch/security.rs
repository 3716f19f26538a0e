//! Advanced security options of an Elasticsearch domain
//!
//! The block is written as `advanced_security_options { ... }` and comes back
//! from reads as a list holding at most one map.

use std::collections::HashMap;
use std::fmt;

use aws_sdk_elasticsearch::types::{
    AdvancedSecurityOptions, AdvancedSecurityOptionsInput,
    MasterUserOptions as SdkMasterUserOptions,
};
use carina_core::resource::Value;

/// Shape errors in the `advanced_security_options` block
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityOptionsError {
    #[error("{block} must be a single block, got {got}")]
    NotABlock { block: &'static str, got: String },

    #[error("'{key}' in {block} must be a {expected}, got {got}")]
    InvalidAttribute {
        block: &'static str,
        key: String,
        expected: &'static str,
        got: &'static str,
    },
}

/// Master user of the internal user database or IAM role
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MasterUserOptions {
    pub master_user_arn: Option<String>,
    pub master_user_name: Option<String>,
    pub master_user_password: Option<String>,
}

impl fmt::Debug for MasterUserOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterUserOptions")
            .field("master_user_arn", &self.master_user_arn)
            .field("master_user_name", &self.master_user_name)
            .field(
                "master_user_password",
                &self.master_user_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl MasterUserOptions {
    fn from_value(value: &Value) -> Result<Self, SecurityOptionsError> {
        let block = single_block(value, "master_user_options")?;
        Ok(Self {
            master_user_arn: optional_string(block, "master_user_options", "master_user_arn")?,
            master_user_name: optional_string(block, "master_user_options", "master_user_name")?,
            master_user_password: optional_string(
                block,
                "master_user_options",
                "master_user_password",
            )?,
        })
    }

    /// Only non-empty strings are sent
    fn expand(&self) -> SdkMasterUserOptions {
        SdkMasterUserOptions::builder()
            .set_master_user_arn(non_empty(&self.master_user_arn))
            .set_master_user_name(non_empty(&self.master_user_name))
            .set_master_user_password(non_empty(&self.master_user_password))
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityOptions {
    pub enabled: Option<bool>,
    pub internal_user_database_enabled: Option<bool>,
    pub master_user_options: Option<MasterUserOptions>,
}

impl SecurityOptions {
    /// Parse the attribute block: a map, or a list holding one map
    pub fn from_value(value: &Value) -> Result<Self, SecurityOptionsError> {
        let block = single_block(value, "advanced_security_options")?;

        let master_user_options = match block.get("master_user_options") {
            None => None,
            Some(Value::List(items)) if items.is_empty() => None,
            Some(v) => Some(MasterUserOptions::from_value(v)?),
        };

        Ok(Self {
            enabled: optional_bool(block, "enabled")?,
            internal_user_database_enabled: optional_bool(block, "internal_user_database_enabled")?,
            master_user_options,
        })
    }

    /// Build the API request shape
    ///
    /// The internal user database flag and master user are only sent when
    /// security is enabled.
    pub fn expand(&self) -> AdvancedSecurityOptionsInput {
        let mut input = AdvancedSecurityOptionsInput::builder().set_enabled(self.enabled);

        if self.enabled == Some(true) {
            input = input.set_internal_user_database_enabled(self.internal_user_database_enabled);
            if let Some(master) = &self.master_user_options {
                input = input.master_user_options(master.expand());
            }
        }

        input.build()
    }
}

/// Convert options returned by the API back into attribute form
///
/// Absent options give an empty list; missing flags read as false.
/// The master user is never returned by the service.
pub fn flatten(options: Option<&AdvancedSecurityOptions>) -> Value {
    let Some(options) = options else {
        return Value::List(Vec::new());
    };

    let block = HashMap::from([
        (
            "enabled".to_string(),
            Value::Bool(options.enabled().unwrap_or(false)),
        ),
        (
            "internal_user_database_enabled".to_string(),
            Value::Bool(options.internal_user_database_enabled().unwrap_or(false)),
        ),
    ]);
    Value::List(vec![Value::Map(block)])
}

fn single_block<'a>(
    value: &'a Value,
    block: &'static str,
) -> Result<&'a HashMap<String, Value>, SecurityOptionsError> {
    match value {
        Value::Map(map) => Ok(map),
        Value::List(items) => match items.as_slice() {
            [Value::Map(map)] => Ok(map),
            _ => Err(SecurityOptionsError::NotABlock {
                block,
                got: format!("a list of {} items", items.len()),
            }),
        },
        other => Err(SecurityOptionsError::NotABlock {
            block,
            got: other.type_name().to_string(),
        }),
    }
}

fn optional_bool(
    block: &HashMap<String, Value>,
    key: &str,
) -> Result<Option<bool>, SecurityOptionsError> {
    match block.get(key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(SecurityOptionsError::InvalidAttribute {
            block: "advanced_security_options",
            key: key.to_string(),
            expected: "bool",
            got: other.type_name(),
        }),
    }
}

fn optional_string(
    block: &HashMap<String, Value>,
    block_name: &'static str,
    key: &str,
) -> Result<Option<String>, SecurityOptionsError> {
    match block.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(SecurityOptionsError::InvalidAttribute {
            block: block_name,
            key: key.to_string(),
            expected: "string",
            got: other.type_name(),
        }),
    }
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_ref().filter(|s| !s.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    fn master_user() -> Value {
        Value::List(vec![block(vec![
            ("master_user_name", Value::from("admin")),
            ("master_user_password", Value::from("Sup3r-secret")),
            ("master_user_arn", Value::from("")),
        ])])
    }

    #[test]
    fn parse_list_form() {
        let value = Value::List(vec![block(vec![
            ("enabled", Value::Bool(true)),
            ("internal_user_database_enabled", Value::Bool(true)),
            ("master_user_options", master_user()),
        ])]);
        let options = SecurityOptions::from_value(&value).unwrap();
        assert_eq!(options.enabled, Some(true));
        assert_eq!(options.internal_user_database_enabled, Some(true));
        let master = options.master_user_options.unwrap();
        assert_eq!(master.master_user_name.as_deref(), Some("admin"));
        assert_eq!(master.master_user_arn.as_deref(), Some(""));
    }

    #[test]
    fn parse_rejects_wrong_shapes() {
        assert!(matches!(
            SecurityOptions::from_value(&Value::Bool(true)),
            Err(SecurityOptionsError::NotABlock { .. })
        ));
        assert!(matches!(
            SecurityOptions::from_value(&Value::List(vec![])),
            Err(SecurityOptionsError::NotABlock { .. })
        ));
        let err = SecurityOptions::from_value(&block(vec![("enabled", Value::from("yes"))]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "'enabled' in advanced_security_options must be a bool, got String"
        );
    }

    #[test]
    fn expand_enabled_sets_everything_non_empty() {
        let options = SecurityOptions::from_value(&block(vec![
            ("enabled", Value::Bool(true)),
            ("internal_user_database_enabled", Value::Bool(true)),
            ("master_user_options", master_user()),
        ]))
        .unwrap();

        let input = options.expand();
        assert_eq!(input.enabled(), Some(true));
        assert_eq!(input.internal_user_database_enabled(), Some(true));
        let master = input.master_user_options().unwrap();
        assert_eq!(master.master_user_name(), Some("admin"));
        assert_eq!(master.master_user_password(), Some("Sup3r-secret"));
        // Empty strings are dropped
        assert_eq!(master.master_user_arn(), None);
    }

    #[test]
    fn expand_disabled_only_sets_enabled() {
        let options = SecurityOptions::from_value(&block(vec![
            ("enabled", Value::Bool(false)),
            ("internal_user_database_enabled", Value::Bool(true)),
            ("master_user_options", master_user()),
        ]))
        .unwrap();

        let input = options.expand();
        assert_eq!(input.enabled(), Some(false));
        assert_eq!(input.internal_user_database_enabled(), None);
        assert!(input.master_user_options().is_none());
    }

    #[test]
    fn expand_without_enabled_is_empty() {
        let input = SecurityOptions::default().expand();
        assert_eq!(input.enabled(), None);
        assert!(input.master_user_options().is_none());
    }

    #[test]
    fn flatten_absent_is_empty_list() {
        assert_eq!(flatten(None), Value::List(vec![]));
    }

    #[test]
    fn flatten_defaults_missing_flags_to_false() {
        let options = AdvancedSecurityOptions::builder().enabled(true).build();
        let value = flatten(Some(&options));
        assert_eq!(
            value,
            Value::List(vec![block(vec![
                ("enabled", Value::Bool(true)),
                ("internal_user_database_enabled", Value::Bool(false)),
            ])])
        );
    }

    #[test]
    fn debug_redacts_password() {
        let options = SecurityOptions::from_value(&block(vec![
            ("enabled", Value::Bool(true)),
            ("master_user_options", master_user()),
        ]))
        .unwrap();
        let rendered = format!("{:?}", options);
        assert!(!rendered.contains("Sup3r-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
