//! GuardDuty filter resource
//!
//! A filter is addressed by its detector and name; the provider-side
//! identifier is `<detector_id>_<name>`.

use std::collections::HashMap;

use aws_sdk_guardduty::error::ProvideErrorMetadata;
use aws_sdk_guardduty::operation::get_filter::GetFilterOutput;
use aws_sdk_guardduty::types::{
    Condition as SdkCondition, FilterAction, FindingCriteria as SdkFindingCriteria,
};
use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::resource::{Resource, ResourceId, State, Value};
use log::{debug, warn};

use super::criteria::{
    ConditionRecord, Criterion, FieldRegistry, FindingCriteria, criteria_from_value,
    criteria_to_value, flatten, serialize,
};
use crate::provider::{AwsProvider, validate_attributes};
use crate::schemas::guardduty::filter_schema;

pub const RESOURCE_TYPE: &str = "guardduty.filter";

/// Message GuardDuty returns when the detector belongs to another account
/// or no longer exists
const DETECTOR_NOT_OWNED: &str = "The request is rejected because the input detectorId is not owned by the current account.";

/// Desired filter, read from resource attributes
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub detector_id: String,
    pub name: String,
    pub description: Option<String>,
    pub action: FilterAction,
    pub rank: i32,
    pub tags: HashMap<String, String>,
    pub criteria: Vec<Criterion>,
}

impl FilterSpec {
    pub fn from_resource(resource: &Resource) -> ProviderResult<Self> {
        let attrs = &resource.attributes;
        let invalid = |msg: String| ProviderError::new(msg).for_resource(resource.id.clone());

        let detector_id = required_string(attrs, "detector_id").map_err(invalid)?;
        let name = required_string(attrs, "name").map_err(invalid)?;

        let description = match attrs.get("description") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(invalid(format!(
                    "description must be a string, got {}",
                    other.type_name()
                )));
            }
        };

        let action = required_string(attrs, "action")
            .and_then(|s| parse_action(&s))
            .map_err(invalid)?;

        let rank = match attrs.get("rank") {
            Some(Value::Int(n)) => i32::try_from(*n)
                .map_err(|_| invalid(format!("rank {} is out of range", n)))?,
            _ => return Err(invalid("rank is required".to_string())),
        };

        let tags = match attrs.get("tags") {
            None => HashMap::new(),
            Some(Value::Map(map)) => map
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k.clone(), s.clone())),
                    other => Err(invalid(format!(
                        "tag '{}' must be a string, got {}",
                        k,
                        other.type_name()
                    ))),
                })
                .collect::<ProviderResult<HashMap<_, _>>>()?,
            Some(other) => {
                return Err(invalid(format!(
                    "tags must be a map, got {}",
                    other.type_name()
                )));
            }
        };

        let criteria_value = attrs
            .get("finding_criteria")
            .ok_or_else(|| invalid("finding_criteria is required".to_string()))?;
        let criteria = criteria_from_value(criteria_value).map_err(|e| {
            ProviderError::new(format!("Invalid finding_criteria: {}", e))
                .for_resource(resource.id.clone())
                .with_cause(e)
        })?;

        Ok(Self {
            detector_id,
            name,
            description,
            action,
            rank,
            tags,
            criteria,
        })
    }

    pub fn identifier(&self) -> String {
        filter_identifier(&self.detector_id, &self.name)
    }

    /// Validate and fold the criteria into the API shape
    pub fn finding_criteria(&self, id: &ResourceId) -> ProviderResult<SdkFindingCriteria> {
        let criteria = serialize(&self.criteria, FieldRegistry::guardduty()).map_err(|e| {
            ProviderError::new(e.to_string())
                .for_resource(id.clone())
                .with_cause(e)
        })?;
        Ok(to_sdk_criteria(&criteria))
    }
}

fn required_string(attrs: &HashMap<String, Value>, key: &str) -> Result<String, String> {
    match attrs.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!("{} must be a string, got {}", key, other.type_name())),
        None => Err(format!("{} is required", key)),
    }
}

/// Parse `NOOP` / `ARCHIVE`, also in `FilterAction.ARCHIVE` form
pub fn parse_action(s: &str) -> Result<FilterAction, String> {
    let raw = s.split('.').next_back().unwrap_or(s);
    match raw {
        "NOOP" => Ok(FilterAction::Noop),
        "ARCHIVE" => Ok(FilterAction::Archive),
        _ => Err(format!(
            "Invalid action '{}', expected one of: NOOP, ARCHIVE",
            s
        )),
    }
}

pub fn filter_identifier(detector_id: &str, name: &str) -> String {
    format!("{}_{}", detector_id, name)
}

/// Split `<detector_id>_<name>` on the first underscore
pub fn parse_filter_identifier(identifier: &str) -> Result<(&str, &str), String> {
    match identifier.split_once('_') {
        Some((detector_id, name)) if !detector_id.is_empty() && !name.is_empty() => {
            Ok((detector_id, name))
        }
        _ => Err(format!(
            "Error importing GuardDuty filter '{}': please make sure the ID is in the form detectorId_name",
            identifier
        )),
    }
}

// =============================================================================
// SDK Conversion
// =============================================================================

pub fn to_sdk_criteria(criteria: &FindingCriteria) -> SdkFindingCriteria {
    let criterion: HashMap<String, SdkCondition> = criteria
        .iter()
        .map(|(field, record)| (field.to_string(), to_sdk_condition(record)))
        .collect();

    SdkFindingCriteria::builder()
        .set_criterion(Some(criterion))
        .build()
}

fn to_sdk_condition(record: &ConditionRecord) -> SdkCondition {
    SdkCondition::builder()
        .set_equals(record.equals.clone())
        .set_not_equals(record.not_equals.clone())
        .set_greater_than(record.greater_than)
        .set_greater_than_or_equal(record.greater_than_or_equal)
        .set_less_than(record.less_than)
        .set_less_than_or_equal(record.less_than_or_equal)
        .build()
}

/// Convert criteria returned by the API
///
/// Fields outside the registry are kept so that drift stays visible,
/// but they are logged.
pub fn from_sdk_criteria(criteria: &SdkFindingCriteria, registry: &FieldRegistry) -> FindingCriteria {
    criteria
        .criterion
        .iter()
        .flatten()
        .map(|(field, condition)| {
            if !registry.contains(field) {
                warn!("GuardDuty returned unknown finding criteria field '{}'", field);
            }
            (field.clone(), from_sdk_condition(condition))
        })
        .collect()
}

fn from_sdk_condition(condition: &SdkCondition) -> ConditionRecord {
    ConditionRecord {
        equals: condition.equals.clone(),
        not_equals: condition.not_equals.clone(),
        greater_than: condition.greater_than,
        greater_than_or_equal: condition.greater_than_or_equal,
        less_than: condition.less_than,
        less_than_or_equal: condition.less_than_or_equal,
    }
}

/// Map a `GetFilter` response back into resource attributes
///
/// `name` is the requested filter name, used when the response omits it.
pub fn filter_attributes(
    output: &GetFilterOutput,
    detector_id: &str,
    name: &str,
) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    attributes.insert(
        "detector_id".to_string(),
        Value::String(detector_id.to_string()),
    );
    attributes.insert(
        "name".to_string(),
        Value::String(output.name().unwrap_or(name).to_string()),
    );
    if let Some(action) = output.action() {
        attributes.insert(
            "action".to_string(),
            Value::String(action.as_str().to_string()),
        );
    }
    if let Some(description) = output.description() {
        attributes.insert(
            "description".to_string(),
            Value::String(description.to_string()),
        );
    }
    if let Some(rank) = output.rank() {
        attributes.insert("rank".to_string(), Value::Int(rank as i64));
    }
    if let Some(tags) = output.tags()
        && !tags.is_empty()
    {
        let tags = tags
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        attributes.insert("tags".to_string(), Value::Map(tags));
    }

    let criteria = output
        .finding_criteria()
        .map(|c| from_sdk_criteria(c, FieldRegistry::guardduty()))
        .unwrap_or_default();
    attributes.insert(
        "finding_criteria".to_string(),
        criteria_to_value(&flatten(&criteria)),
    );

    attributes
}

// =============================================================================
// Lifecycle
// =============================================================================

impl AwsProvider {
    /// Read a GuardDuty filter
    pub(crate) async fn read_guardduty_filter(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        let (detector_id, name) = parse_filter_identifier(identifier)
            .map_err(|msg| ProviderError::new(msg).for_resource(id.clone()))?;

        debug!(
            "Reading GuardDuty filter {} on detector {}",
            name, detector_id
        );
        let output = match self
            .guardduty_client
            .get_filter()
            .detector_id(detector_id)
            .filter_name(name)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let detector_gone = err.as_service_error().is_some_and(|e| {
                    e.is_bad_request_exception()
                        && e.message().is_some_and(|m| m.contains(DETECTOR_NOT_OWNED))
                });
                if detector_gone {
                    warn!(
                        "GuardDuty detector {} not found, treating filter {} as deleted",
                        detector_id, name
                    );
                    return Ok(State::not_found(id.clone()));
                }
                return Err(ProviderError::new(format!(
                    "Failed to read GuardDuty filter '{}': {:?}",
                    name, err
                ))
                .for_resource(id.clone()));
            }
        };

        let attributes = filter_attributes(&output, detector_id, name);
        Ok(State::existing(id.clone(), attributes)
            .with_identifier(filter_identifier(detector_id, name)))
    }

    /// Create a GuardDuty filter
    pub(crate) async fn create_guardduty_filter(&self, resource: Resource) -> ProviderResult<State> {
        validate_attributes(&filter_schema(), &resource)?;
        let spec = FilterSpec::from_resource(&resource)?;
        // Criteria are fully validated before anything is sent
        let finding_criteria = spec.finding_criteria(&resource.id)?;

        debug!(
            "Creating GuardDuty filter {} on detector {} ({} criteria)",
            spec.name,
            spec.detector_id,
            spec.criteria.len()
        );
        let request = self
            .guardduty_client
            .create_filter()
            .detector_id(&spec.detector_id)
            .name(&spec.name)
            .description(spec.description.clone().unwrap_or_default())
            .action(spec.action.clone())
            .rank(spec.rank)
            .finding_criteria(finding_criteria)
            .set_tags((!spec.tags.is_empty()).then(|| spec.tags.clone()));

        self.with_timeout(self.config.filter_timeout, "create GuardDuty filter", async {
            request.send().await.map_err(|e| {
                ProviderError::new(format!("Failed to create GuardDuty filter: {:?}", e))
            })
        })
        .await
        .map_err(|e| e.for_resource(resource.id.clone()))?;

        self.read_guardduty_filter(&resource.id, Some(&spec.identifier()))
            .await
    }

    /// Update a GuardDuty filter in place
    ///
    /// Detector and name cannot change; tags are left as they are.
    pub(crate) async fn update_guardduty_filter(
        &self,
        id: ResourceId,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let schema = filter_schema();
        validate_attributes(&schema, &to)?;

        let replaced = schema.requires_replacement(&from.attributes, &to.attributes);
        if !replaced.is_empty() {
            return Err(ProviderError::new(format!(
                "Changing {} requires replacing the filter",
                replaced.join(", ")
            ))
            .for_resource(id));
        }

        let spec = FilterSpec::from_resource(&to)?;
        let finding_criteria = spec.finding_criteria(&id)?;
        let (detector_id, name) = parse_filter_identifier(identifier)
            .map_err(|msg| ProviderError::new(msg).for_resource(id.clone()))?;

        debug!(
            "Updating GuardDuty filter {} on detector {}",
            name, detector_id
        );
        let request = self
            .guardduty_client
            .update_filter()
            .detector_id(detector_id)
            .filter_name(name)
            .description(spec.description.clone().unwrap_or_default())
            .action(spec.action.clone())
            .rank(spec.rank)
            .finding_criteria(finding_criteria);

        self.with_timeout(self.config.filter_timeout, "update GuardDuty filter", async {
            request.send().await.map_err(|e| {
                ProviderError::new(format!(
                    "Failed to update GuardDuty filter '{}': {:?}",
                    identifier, e
                ))
            })
        })
        .await
        .map_err(|e| e.for_resource(id.clone()))?;

        self.read_guardduty_filter(&id, Some(identifier)).await
    }

    /// Delete a GuardDuty filter
    pub(crate) async fn delete_guardduty_filter(
        &self,
        id: ResourceId,
        identifier: &str,
    ) -> ProviderResult<()> {
        let (detector_id, name) = parse_filter_identifier(identifier)
            .map_err(|msg| ProviderError::new(msg).for_resource(id.clone()))?;

        debug!(
            "Deleting GuardDuty filter {} on detector {}",
            name, detector_id
        );
        self.guardduty_client
            .delete_filter()
            .detector_id(detector_id)
            .filter_name(name)
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "Failed to delete GuardDuty filter '{}': {:?}",
                    identifier, e
                ))
                .for_resource(id.clone())
            })?;

        Ok(())
    }
}
