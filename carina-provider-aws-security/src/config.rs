//! Provider configuration

use std::collections::HashMap;
use std::time::Duration;

use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::resource::Value;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Create/update bound for GuardDuty filters
pub const DEFAULT_FILTER_TIMEOUT: Duration = Duration::from_secs(60);

/// Elasticsearch domains take several minutes to settle
pub const DEFAULT_DOMAIN_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Settings of the `provider aws { ... }` block
#[derive(Debug, Clone, PartialEq)]
pub struct AwsProviderConfig {
    pub region: String,
    pub profile: Option<String>,
    pub filter_timeout: Duration,
    pub domain_timeout: Duration,
}

impl Default for AwsProviderConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            profile: None,
            filter_timeout: DEFAULT_FILTER_TIMEOUT,
            domain_timeout: DEFAULT_DOMAIN_TIMEOUT,
        }
    }
}

impl AwsProviderConfig {
    /// Build from provider block attributes
    ///
    /// Recognized keys: `region`, `profile`, `filter_timeout_secs`,
    /// `domain_timeout_secs`. Anything else is ignored.
    pub fn from_attributes(attrs: &HashMap<String, Value>) -> ProviderResult<Self> {
        let mut config = Self::default();

        if let Some(value) = attrs.get("region") {
            let region = value.as_str().ok_or_else(|| {
                ProviderError::new(format!(
                    "provider region must be a string, got {}",
                    value.type_name()
                ))
            })?;
            config.region = normalize_region(region);
        }

        if let Some(value) = attrs.get("profile") {
            let profile = value.as_str().ok_or_else(|| {
                ProviderError::new(format!(
                    "provider profile must be a string, got {}",
                    value.type_name()
                ))
            })?;
            config.profile = Some(profile.to_string());
        }

        if let Some(secs) = timeout_secs(attrs, "filter_timeout_secs")? {
            config.filter_timeout = secs;
        }
        if let Some(secs) = timeout_secs(attrs, "domain_timeout_secs")? {
            config.domain_timeout = secs;
        }

        Ok(config)
    }
}

fn timeout_secs(attrs: &HashMap<String, Value>, key: &str) -> ProviderResult<Option<Duration>> {
    match attrs.get(key) {
        None => Ok(None),
        Some(Value::Int(n)) if *n > 0 => Ok(Some(Duration::from_secs(*n as u64))),
        Some(other) => Err(ProviderError::new(format!(
            "{} must be a positive integer, got {:?}",
            key, other
        ))),
    }
}

/// Normalize region value (e.g., "aws.Region.ap_northeast_1" -> "ap-northeast-1")
pub fn normalize_region(s: &str) -> String {
    let region_part = s.split('.').next_back().unwrap_or(s);
    region_part.replace('_', "-")
}
