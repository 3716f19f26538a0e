//! Carina AWS Security Provider
//!
//! Manages GuardDuty filters and the advanced security options of
//! Elasticsearch domains.

pub mod config;
pub mod elasticsearch;
pub mod guardduty;
pub mod provider;
pub mod resources;
pub mod schemas;

use carina_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use carina_core::resource::{Resource, ResourceId, State};

pub use config::AwsProviderConfig;
pub use provider::AwsProvider;

use elasticsearch::domain::RESOURCE_TYPE as ELASTICSEARCH_DOMAIN;
use guardduty::filter::RESOURCE_TYPE as GUARDDUTY_FILTER;

fn unknown_resource_type(id: &ResourceId) -> ProviderError {
    ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
        .for_resource(id.clone())
}

impl Provider for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resources::resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(String::from);
        Box::pin(async move {
            match id.resource_type.as_str() {
                GUARDDUTY_FILTER => {
                    self.read_guardduty_filter(&id, identifier.as_deref())
                        .await
                }
                ELASTICSEARCH_DOMAIN => {
                    self.read_elasticsearch_domain(&id, identifier.as_deref())
                        .await
                }
                _ => Err(unknown_resource_type(&id)),
            }
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            match resource.id.resource_type.as_str() {
                GUARDDUTY_FILTER => self.create_guardduty_filter(resource).await,
                ELASTICSEARCH_DOMAIN => self.create_elasticsearch_domain(resource).await,
                _ => Err(unknown_resource_type(&resource.id)),
            }
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            match id.resource_type.as_str() {
                GUARDDUTY_FILTER => {
                    self.update_guardduty_filter(id, &identifier, &from, to)
                        .await
                }
                ELASTICSEARCH_DOMAIN => {
                    self.update_elasticsearch_domain(id, &identifier, &from, to)
                        .await
                }
                _ => Err(unknown_resource_type(&id)),
            }
        })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            match id.resource_type.as_str() {
                GUARDDUTY_FILTER => self.delete_guardduty_filter(id, &identifier).await,
                ELASTICSEARCH_DOMAIN => self.delete_elasticsearch_domain(id, &identifier).await,
                _ => Err(unknown_resource_type(&id)),
            }
        })
    }
}
