//! Elasticsearch domain resource
//!
//! Only the domain name, engine version and advanced security options are
//! managed. The provider-side identifier is the domain name.

use std::collections::HashMap;
use std::time::Duration;

use aws_sdk_elasticsearch::types::ElasticsearchDomainStatus;
use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::resource::{Resource, ResourceId, State, Value};
use log::{debug, warn};

use super::security::{self, SecurityOptions};
use crate::provider::{AwsProvider, validate_attributes};
use crate::schemas::elasticsearch::domain_schema;

pub const RESOURCE_TYPE: &str = "elasticsearch.domain";

const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct DomainSpec {
    pub domain_name: String,
    pub elasticsearch_version: Option<String>,
    pub advanced_security_options: Option<SecurityOptions>,
}

impl DomainSpec {
    pub fn from_resource(resource: &Resource) -> ProviderResult<Self> {
        let attrs = &resource.attributes;
        let invalid = |msg: String| ProviderError::new(msg).for_resource(resource.id.clone());

        let domain_name = match attrs.get("domain_name") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(invalid(format!(
                    "domain_name must be a string, got {}",
                    other.type_name()
                )));
            }
            None => return Err(invalid("domain_name is required".to_string())),
        };

        let elasticsearch_version = match attrs.get("elasticsearch_version") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(invalid(format!(
                    "elasticsearch_version must be a string, got {}",
                    other.type_name()
                )));
            }
        };

        let advanced_security_options = match attrs.get("advanced_security_options") {
            None => None,
            Some(Value::List(items)) if items.is_empty() => None,
            Some(value) => Some(SecurityOptions::from_value(value).map_err(|e| {
                ProviderError::new(format!("Invalid advanced_security_options: {}", e))
                    .for_resource(resource.id.clone())
                    .with_cause(e)
            })?),
        };

        Ok(Self {
            domain_name,
            elasticsearch_version,
            advanced_security_options,
        })
    }
}

/// Map a domain status back into resource attributes
pub fn domain_attributes(status: &ElasticsearchDomainStatus) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    attributes.insert(
        "domain_name".to_string(),
        Value::String(status.domain_name().to_string()),
    );
    attributes.insert("arn".to_string(), Value::String(status.arn().to_string()));
    if let Some(version) = status.elasticsearch_version() {
        attributes.insert(
            "elasticsearch_version".to_string(),
            Value::String(version.to_string()),
        );
    }
    attributes.insert(
        "advanced_security_options".to_string(),
        security::flatten(status.advanced_security_options()),
    );
    attributes
}

impl AwsProvider {
    /// Read an Elasticsearch domain
    pub(crate) async fn read_elasticsearch_domain(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let Some(domain_name) = identifier else {
            return Ok(State::not_found(id.clone()));
        };

        debug!("Describing Elasticsearch domain {}", domain_name);
        let output = match self
            .elasticsearch_client
            .describe_elasticsearch_domain()
            .domain_name(domain_name)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception())
                {
                    warn!("Elasticsearch domain {} not found", domain_name);
                    return Ok(State::not_found(id.clone()));
                }
                return Err(ProviderError::new(format!(
                    "Failed to describe Elasticsearch domain '{}': {:?}",
                    domain_name, err
                ))
                .for_resource(id.clone()));
            }
        };

        let Some(status) = output.domain_status() else {
            return Ok(State::not_found(id.clone()));
        };
        if status.deleted() == Some(true) {
            warn!(
                "Elasticsearch domain {} is being deleted, treating it as gone",
                domain_name
            );
            return Ok(State::not_found(id.clone()));
        }

        let attributes = domain_attributes(status);
        Ok(State::existing(id.clone(), attributes).with_identifier(domain_name))
    }

    /// Create an Elasticsearch domain and wait until it stops processing
    pub(crate) async fn create_elasticsearch_domain(
        &self,
        resource: Resource,
    ) -> ProviderResult<State> {
        validate_attributes(&domain_schema(), &resource)?;
        let spec = DomainSpec::from_resource(&resource)?;

        debug!(
            "Creating Elasticsearch domain {} (version: {}, security options: {:?})",
            spec.domain_name,
            spec.elasticsearch_version.as_deref().unwrap_or("default"),
            spec.advanced_security_options
        );
        self.elasticsearch_client
            .create_elasticsearch_domain()
            .domain_name(&spec.domain_name)
            .set_elasticsearch_version(spec.elasticsearch_version.clone())
            .set_advanced_security_options(
                spec.advanced_security_options.as_ref().map(SecurityOptions::expand),
            )
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "Failed to create Elasticsearch domain '{}': {:?}",
                    spec.domain_name, e
                ))
                .for_resource(resource.id.clone())
            })?;

        self.with_timeout(
            self.config.domain_timeout,
            "create Elasticsearch domain",
            self.wait_for_domain(&spec.domain_name, true),
        )
        .await
        .map_err(|e| e.for_resource(resource.id.clone()))?;

        self.read_elasticsearch_domain(&resource.id, Some(&spec.domain_name))
            .await
    }

    /// Update the security options of an Elasticsearch domain
    pub(crate) async fn update_elasticsearch_domain(
        &self,
        id: ResourceId,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let schema = domain_schema();
        validate_attributes(&schema, &to)?;

        let replaced = schema.requires_replacement(&from.attributes, &to.attributes);
        if !replaced.is_empty() {
            return Err(ProviderError::new(format!(
                "Changing {} requires replacing the domain",
                replaced.join(", ")
            ))
            .for_resource(id));
        }

        let spec = DomainSpec::from_resource(&to)?;

        debug!(
            "Updating Elasticsearch domain {} (security options: {:?})",
            identifier, spec.advanced_security_options
        );
        self.elasticsearch_client
            .update_elasticsearch_domain_config()
            .domain_name(identifier)
            .set_advanced_security_options(
                spec.advanced_security_options.as_ref().map(SecurityOptions::expand),
            )
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "Failed to update Elasticsearch domain '{}': {:?}",
                    identifier, e
                ))
                .for_resource(id.clone())
            })?;

        self.with_timeout(
            self.config.domain_timeout,
            "update Elasticsearch domain",
            self.wait_for_domain(identifier, false),
        )
        .await
        .map_err(|e| e.for_resource(id.clone()))?;

        self.read_elasticsearch_domain(&id, Some(identifier)).await
    }

    /// Delete an Elasticsearch domain
    ///
    /// Deletion continues in the background; a domain that is already gone
    /// counts as deleted.
    pub(crate) async fn delete_elasticsearch_domain(
        &self,
        id: ResourceId,
        identifier: &str,
    ) -> ProviderResult<()> {
        debug!("Deleting Elasticsearch domain {}", identifier);
        match self
            .elasticsearch_client
            .delete_elasticsearch_domain()
            .domain_name(identifier)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                warn!("Elasticsearch domain {} already deleted", identifier);
                Ok(())
            }
            Err(err) => Err(ProviderError::new(format!(
                "Failed to delete Elasticsearch domain '{}': {:?}",
                identifier, err
            ))
            .for_resource(id)),
        }
    }

    /// Poll until the domain reports it is no longer processing
    ///
    /// Right after creation the domain may not be visible yet; with
    /// `allow_missing` a not-found answer counts as still processing.
    async fn wait_for_domain(&self, domain_name: &str, allow_missing: bool) -> ProviderResult<()> {
        loop {
            let processing = match self
                .elasticsearch_client
                .describe_elasticsearch_domain()
                .domain_name(domain_name)
                .send()
                .await
            {
                Ok(output) => is_processing(output.domain_status()),
                Err(err)
                    if allow_missing
                        && err
                            .as_service_error()
                            .is_some_and(|e| e.is_resource_not_found_exception()) =>
                {
                    debug!("Elasticsearch domain {} is not visible yet", domain_name);
                    true
                }
                Err(err) => {
                    return Err(ProviderError::new(format!(
                        "Failed to describe Elasticsearch domain '{}': {:?}",
                        domain_name, err
                    )));
                }
            };
            if !processing {
                return Ok(());
            }

            debug!("Elasticsearch domain {} is still processing", domain_name);
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

fn is_processing(status: Option<&ElasticsearchDomainStatus>) -> bool {
    status.and_then(|s| s.processing()).unwrap_or(false)
}
