//! AWS security provider
//!
//! Holds one SDK client per service plus the provider configuration.
//! Resource handlers live next to their resource modules as `impl AwsProvider`
//! blocks.

use std::future::Future;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_elasticsearch::Client as ElasticsearchClient;
use aws_sdk_guardduty::Client as GuardDutyClient;
use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::resource::Resource;
use carina_core::schema::{ResourceSchema, format_type_errors};
use log::debug;

use crate::config::AwsProviderConfig;

/// AWS provider for GuardDuty filters and Elasticsearch domains
pub struct AwsProvider {
    pub(crate) guardduty_client: GuardDutyClient,
    pub(crate) elasticsearch_client: ElasticsearchClient,
    pub(crate) config: AwsProviderConfig,
}

impl AwsProvider {
    /// Create a new provider, loading credentials from the environment
    pub async fn new(config: AwsProviderConfig) -> Self {
        debug!(
            "Loading AWS configuration for region {} (profile: {})",
            config.region,
            config.profile.as_deref().unwrap_or("default")
        );
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        Self {
            guardduty_client: GuardDutyClient::new(&sdk_config),
            elasticsearch_client: ElasticsearchClient::new(&sdk_config),
            config,
        }
    }

    /// Create with specific clients (for testing)
    pub fn with_clients(
        guardduty_client: GuardDutyClient,
        elasticsearch_client: ElasticsearchClient,
        config: AwsProviderConfig,
    ) -> Self {
        Self {
            guardduty_client,
            elasticsearch_client,
            config,
        }
    }

    pub fn config(&self) -> &AwsProviderConfig {
        &self.config
    }

    /// Run `operation`, failing if it does not finish within `limit`
    pub(crate) async fn with_timeout<T, F>(
        &self,
        limit: Duration,
        what: &str,
        operation: F,
    ) -> ProviderResult<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        match tokio::time::timeout(limit, operation).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::new(format!(
                "Timed out after {}s waiting to {}",
                limit.as_secs(),
                what
            ))),
        }
    }
}

/// Validate attributes against the resource schema before any API call
pub(crate) fn validate_attributes(schema: &ResourceSchema, resource: &Resource) -> ProviderResult<()> {
    schema.validate(&resource.attributes).map_err(|errors| {
        ProviderError::new(format!(
            "Invalid attributes: {}",
            format_type_errors(&errors)
        ))
        .for_resource(resource.id.clone())
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::offline_provider;
    use super::*;

    #[tokio::test]
    async fn timeout_elapses() {
        let provider = offline_provider();
        let err = provider
            .with_timeout(Duration::from_millis(10), "finish", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("waiting to finish"));
    }

    #[tokio::test]
    async fn timeout_passes_result_through() {
        let provider = offline_provider();
        let value = provider
            .with_timeout(Duration::from_secs(5), "finish", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn with_clients_keeps_config() {
        let provider = offline_provider();
        assert_eq!(provider.config().region, "us-east-1");
    }
}
