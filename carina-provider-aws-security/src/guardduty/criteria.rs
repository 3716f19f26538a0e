//! Finding criteria codec
//!
//! GuardDuty filters are declared as a flat list of criteria
//! (`field`, `condition`, `values`), while the API expects one
//! `Condition` per field carrying every comparison for that field.
//! This module converts between the two shapes and checks which
//! conditions each field accepts.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use carina_core::resource::Value;
use serde::{Deserialize, Serialize};

/// Comparison applied to a finding field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl ConditionKind {
    /// Every condition, in the order criteria are emitted when flattening
    pub const ALL: [ConditionKind; 6] = [
        ConditionKind::Equals,
        ConditionKind::NotEquals,
        ConditionKind::GreaterThan,
        ConditionKind::GreaterThanOrEqual,
        ConditionKind::LessThan,
        ConditionKind::LessThanOrEqual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::Equals => "equals",
            ConditionKind::NotEquals => "not_equals",
            ConditionKind::GreaterThan => "greater_than",
            ConditionKind::GreaterThanOrEqual => "greater_than_or_equal",
            ConditionKind::LessThan => "less_than",
            ConditionKind::LessThanOrEqual => "less_than_or_equal",
        }
    }

    /// Ordering conditions take a single integer value
    pub fn is_ordering(&self) -> bool {
        !matches!(self, ConditionKind::Equals | ConditionKind::NotEquals)
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionKind {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConditionKind::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CriteriaError::UnknownCondition(s.to_string()))
    }
}

fn join_conditions(conditions: &[ConditionKind]) -> String {
    conditions
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while reading or serializing finding criteria
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CriteriaError {
    #[error("Unknown criterion field '{0}'")]
    UnknownField(String),

    #[error("Unknown condition '{0}', expected one of: {all}", all = join_conditions(&ConditionKind::ALL))]
    UnknownCondition(String),

    #[error(
        "The condition '{condition}' is not supported for field '{field}'. Supported conditions are: {supported}",
        supported = join_conditions(allowed)
    )]
    UnsupportedCondition {
        field: String,
        condition: ConditionKind,
        allowed: Vec<ConditionKind>,
    },

    #[error(
        "Exactly one value must be given for condition '{condition}' on field '{field}', got {count}"
    )]
    MalformedValueCount {
        field: String,
        condition: ConditionKind,
        count: usize,
    },

    #[error("Value '{value}' for condition '{condition}' on field '{field}' is not an integer")]
    MalformedValueType {
        field: String,
        condition: ConditionKind,
        value: String,
    },

    #[error("Malformed criterion: {0}")]
    MalformedCriterion(String),
}

// =============================================================================
// Field Registry
// =============================================================================

const EQUALITY: &[ConditionKind] = &[ConditionKind::Equals, ConditionKind::NotEquals];
const COMPARABLE: &[ConditionKind] = &ConditionKind::ALL;

/// Finding fields a GuardDuty filter can match on
const GUARDDUTY_FIELDS: &[(&str, &[ConditionKind])] = &[
    ("confidence", EQUALITY),
    ("id", EQUALITY),
    ("account_id", EQUALITY),
    ("region", EQUALITY),
    ("resource.accessKeyDetails.accessKeyId", EQUALITY),
    ("resource.accessKeyDetails.principalId", EQUALITY),
    ("resource.accessKeyDetails.userName", EQUALITY),
    ("resource.accessKeyDetails.userType", EQUALITY),
    ("resource.instanceDetails.iamInstanceProfile.id", EQUALITY),
    ("resource.instanceDetails.imageId", EQUALITY),
    ("resource.instanceDetails.instanceId", EQUALITY),
    ("resource.instanceDetails.networkInterfaces.ipv6Addresses", EQUALITY),
    (
        "resource.instanceDetails.networkInterfaces.privateIpAddresses.privateIpAddress",
        EQUALITY,
    ),
    ("resource.instanceDetails.networkInterfaces.publicDnsName", EQUALITY),
    ("resource.instanceDetails.networkInterfaces.publicIp", EQUALITY),
    ("resource.instanceDetails.networkInterfaces.securityGroups.groupId", EQUALITY),
    ("resource.instanceDetails.networkInterfaces.securityGroups.groupName", EQUALITY),
    ("resource.instanceDetails.networkInterfaces.subnetId", EQUALITY),
    ("resource.instanceDetails.networkInterfaces.vpcId", EQUALITY),
    ("resource.instanceDetails.tags.key", EQUALITY),
    ("resource.instanceDetails.tags.value", EQUALITY),
    ("resource.resourceType", EQUALITY),
    ("service.action.actionType", EQUALITY),
    ("service.action.awsApiCallAction.api", EQUALITY),
    ("service.action.awsApiCallAction.callerType", EQUALITY),
    ("service.action.awsApiCallAction.remoteIpDetails.city.cityName", EQUALITY),
    ("service.action.awsApiCallAction.remoteIpDetails.country.countryName", EQUALITY),
    ("service.action.awsApiCallAction.remoteIpDetails.ipAddressV4", EQUALITY),
    ("service.action.awsApiCallAction.remoteIpDetails.organization.asn", EQUALITY),
    ("service.action.awsApiCallAction.remoteIpDetails.organization.asnOrg", EQUALITY),
    ("service.action.awsApiCallAction.serviceName", EQUALITY),
    ("service.action.dnsRequestAction.domain", EQUALITY),
    ("service.action.networkConnectionAction.blocked", EQUALITY),
    ("service.action.networkConnectionAction.connectionDirection", EQUALITY),
    ("service.action.networkConnectionAction.localPortDetails.port", EQUALITY),
    ("service.action.networkConnectionAction.protocol", EQUALITY),
    ("service.action.networkConnectionAction.remoteIpDetails.city.cityName", EQUALITY),
    ("service.action.networkConnectionAction.remoteIpDetails.country.countryName", EQUALITY),
    ("service.action.networkConnectionAction.remoteIpDetails.ipAddressV4", EQUALITY),
    ("service.action.networkConnectionAction.remoteIpDetails.organization.asn", EQUALITY),
    ("service.action.networkConnectionAction.remoteIpDetails.organization.asnOrg", EQUALITY),
    ("service.action.networkConnectionAction.remotePortDetails.port", EQUALITY),
    ("service.additionalInfo.threatListName", EQUALITY),
    ("service.archived", EQUALITY),
    ("service.resourceRole", EQUALITY),
    ("severity", EQUALITY),
    ("type", EQUALITY),
    ("updatedAt", COMPARABLE),
];

/// Immutable lookup of field name -> conditions allowed for that field
#[derive(Debug)]
pub struct FieldRegistry {
    fields: HashMap<&'static str, &'static [ConditionKind]>,
}

impl FieldRegistry {
    /// Build a registry from a static table. Field names must be unique.
    pub fn from_entries(entries: &'static [(&'static str, &'static [ConditionKind])]) -> Self {
        let fields: HashMap<_, _> = entries.iter().copied().collect();
        debug_assert_eq!(fields.len(), entries.len(), "duplicate field in registry");
        Self { fields }
    }

    /// Registry of GuardDuty finding fields, built on first use
    pub fn guardduty() -> &'static FieldRegistry {
        static REGISTRY: LazyLock<FieldRegistry> =
            LazyLock::new(|| FieldRegistry::from_entries(GUARDDUTY_FIELDS));
        &REGISTRY
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn allowed_conditions(&self, field: &str) -> Option<&'static [ConditionKind]> {
        self.fields.get(field).copied()
    }

    pub fn is_allowed(&self, field: &str, condition: ConditionKind) -> bool {
        self.allowed_conditions(field)
            .is_some_and(|allowed| allowed.contains(&condition))
    }

    /// All field names, sorted
    pub fn fields(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.fields.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// =============================================================================
// Criteria Types
// =============================================================================

/// One user-facing criterion: `field <condition> values`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub field: String,
    pub condition: ConditionKind,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Criterion {
    pub fn new<I, S>(field: impl Into<String>, condition: ConditionKind, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            condition,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Every comparison attached to a single field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionRecord {
    pub equals: Option<Vec<String>>,
    pub not_equals: Option<Vec<String>>,
    pub greater_than: Option<i64>,
    pub greater_than_or_equal: Option<i64>,
    pub less_than: Option<i64>,
    pub less_than_or_equal: Option<i64>,
}

impl ConditionRecord {
    /// Integer bound stored for an ordering condition
    pub fn bound(&self, condition: ConditionKind) -> Option<i64> {
        match condition {
            ConditionKind::GreaterThan => self.greater_than,
            ConditionKind::GreaterThanOrEqual => self.greater_than_or_equal,
            ConditionKind::LessThan => self.less_than,
            ConditionKind::LessThanOrEqual => self.less_than_or_equal,
            ConditionKind::Equals | ConditionKind::NotEquals => None,
        }
    }

    fn bound_mut(&mut self, condition: ConditionKind) -> Option<&mut Option<i64>> {
        match condition {
            ConditionKind::GreaterThan => Some(&mut self.greater_than),
            ConditionKind::GreaterThanOrEqual => Some(&mut self.greater_than_or_equal),
            ConditionKind::LessThan => Some(&mut self.less_than),
            ConditionKind::LessThanOrEqual => Some(&mut self.less_than_or_equal),
            ConditionKind::Equals | ConditionKind::NotEquals => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ConditionRecord::default()
    }
}

/// Field name -> condition record, ordered by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingCriteria {
    criterion: BTreeMap<String, ConditionRecord>,
}

impl FindingCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&ConditionRecord> {
        self.criterion.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, record: ConditionRecord) {
        self.criterion.insert(field.into(), record);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConditionRecord)> {
        self.criterion.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.criterion.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criterion.is_empty()
    }

    fn record_mut(&mut self, field: &str) -> &mut ConditionRecord {
        self.criterion.entry(field.to_string()).or_default()
    }
}

impl FromIterator<(String, ConditionRecord)> for FindingCriteria {
    fn from_iter<T: IntoIterator<Item = (String, ConditionRecord)>>(iter: T) -> Self {
        Self {
            criterion: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Serialize / Flatten
// =============================================================================

/// Fold a list of criteria into per-field condition records
///
/// Fails on the first criterion whose field is unknown, whose condition is
/// not allowed for the field, or whose ordering value is not exactly one
/// base-10 integer.
pub fn serialize(
    criteria: &[Criterion],
    registry: &FieldRegistry,
) -> Result<FindingCriteria, CriteriaError> {
    let mut result = FindingCriteria::new();

    for criterion in criteria {
        let allowed = registry
            .allowed_conditions(&criterion.field)
            .ok_or_else(|| CriteriaError::UnknownField(criterion.field.clone()))?;

        if !allowed.contains(&criterion.condition) {
            return Err(CriteriaError::UnsupportedCondition {
                field: criterion.field.clone(),
                condition: criterion.condition,
                allowed: allowed.to_vec(),
            });
        }

        match criterion.condition {
            ConditionKind::Equals => {
                result.record_mut(&criterion.field).equals = Some(criterion.values.clone());
            }
            ConditionKind::NotEquals => {
                result.record_mut(&criterion.field).not_equals = Some(criterion.values.clone());
            }
            ordering => {
                let value = parse_bound(criterion)?;
                if let Some(slot) = result.record_mut(&criterion.field).bound_mut(ordering) {
                    *slot = Some(value);
                }
            }
        }
    }

    Ok(result)
}

fn parse_bound(criterion: &Criterion) -> Result<i64, CriteriaError> {
    let [value] = criterion.values.as_slice() else {
        return Err(CriteriaError::MalformedValueCount {
            field: criterion.field.clone(),
            condition: criterion.condition,
            count: criterion.values.len(),
        });
    };

    value
        .parse::<i64>()
        .map_err(|_| CriteriaError::MalformedValueType {
            field: criterion.field.clone(),
            condition: criterion.condition,
            value: value.clone(),
        })
}

/// Expand per-field condition records back into a list of criteria
///
/// Fields come out in name order; within a field, criteria follow
/// `ConditionKind::ALL`. Empty string sets are skipped.
pub fn flatten(criteria: &FindingCriteria) -> Vec<Criterion> {
    let mut flat = Vec::new();

    for (field, record) in criteria.iter() {
        for (condition, values) in [
            (ConditionKind::Equals, &record.equals),
            (ConditionKind::NotEquals, &record.not_equals),
        ] {
            if let Some(values) = values
                && !values.is_empty()
            {
                flat.push(Criterion::new(field, condition, values.iter().cloned()));
            }
        }

        for condition in ConditionKind::ALL.into_iter().filter(|c| c.is_ordering()) {
            if let Some(bound) = record.bound(condition) {
                flat.push(Criterion::new(field, condition, [bound.to_string()]));
            }
        }
    }

    flat
}

// =============================================================================
// Attribute Conversion
// =============================================================================

/// Read the `finding_criteria` attribute into typed criteria
///
/// Accepts `{ criterion = [...] }` or a one-element list holding that map.
/// A missing `criterion` key means no criteria.
pub fn criteria_from_value(value: &Value) -> Result<Vec<Criterion>, CriteriaError> {
    let block = match value {
        Value::Map(map) => map,
        Value::List(items) => match items.as_slice() {
            [Value::Map(map)] => map,
            [] => return Ok(Vec::new()),
            _ => {
                return Err(CriteriaError::MalformedCriterion(format!(
                    "finding_criteria must be a single block, got {} items",
                    items.len()
                )));
            }
        },
        other => {
            return Err(CriteriaError::MalformedCriterion(format!(
                "finding_criteria must be a block, got {}",
                other.type_name()
            )));
        }
    };

    match block.get("criterion") {
        None => Ok(Vec::new()),
        Some(Value::List(items)) => items.iter().map(criterion_from_value).collect(),
        Some(other) => Err(CriteriaError::MalformedCriterion(format!(
            "criterion must be a list, got {}",
            other.type_name()
        ))),
    }
}

fn criterion_from_value(value: &Value) -> Result<Criterion, CriteriaError> {
    let map = value.as_map().ok_or_else(|| {
        CriteriaError::MalformedCriterion(format!(
            "criterion must be a block, got {}",
            value.type_name()
        ))
    })?;

    let field = map
        .get("field")
        .and_then(Value::as_str)
        .ok_or_else(|| CriteriaError::MalformedCriterion("'field' must be a string".to_string()))?;

    let condition = map
        .get("condition")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            CriteriaError::MalformedCriterion("'condition' must be a string".to_string())
        })?
        .parse::<ConditionKind>()?;

    let values = match map.get("values") {
        None => Vec::new(),
        Some(Value::List(items)) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(CriteriaError::MalformedCriterion(format!(
                "'values' must be a list, got {}",
                other.type_name()
            )));
        }
    };

    Ok(Criterion {
        field: field.to_string(),
        condition,
        values,
    })
}

// Values are strings on the wire; integers and booleans are accepted in their text form.
fn scalar_to_string(value: &Value) -> Result<String, CriteriaError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(CriteriaError::MalformedCriterion(format!(
            "criterion values must be scalars, got {}",
            other.type_name()
        ))),
    }
}

/// Render criteria as the `finding_criteria` attribute
pub fn criteria_to_value(criteria: &[Criterion]) -> Value {
    let items = criteria
        .iter()
        .map(|c| {
            Value::Map(HashMap::from([
                ("field".to_string(), Value::String(c.field.clone())),
                (
                    "condition".to_string(),
                    Value::String(c.condition.as_str().to_string()),
                ),
                (
                    "values".to_string(),
                    Value::List(c.values.iter().cloned().map(Value::String).collect()),
                ),
            ]))
        })
        .collect();

    Value::Map(HashMap::from([(
        "criterion".to_string(),
        Value::List(items),
    )]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> &'static FieldRegistry {
        FieldRegistry::guardduty()
    }

    fn criterion(field: &str, condition: ConditionKind, values: &[&str]) -> Criterion {
        Criterion::new(field, condition, values.iter().copied())
    }

    #[test]
    fn registry_contents() {
        let registry = registry();
        assert_eq!(registry.len(), GUARDDUTY_FIELDS.len());
        assert_eq!(registry.len(), 48);
        assert_eq!(
            registry.allowed_conditions("updatedAt"),
            Some(&ConditionKind::ALL[..])
        );
        assert_eq!(
            registry.allowed_conditions("severity"),
            Some(&[ConditionKind::Equals, ConditionKind::NotEquals][..])
        );
        assert!(registry.contains("service.action.dnsRequestAction.domain"));
        assert!(!registry.contains("service.unknown"));
        assert!(!registry.is_allowed("severity", ConditionKind::GreaterThan));
    }

    #[test]
    fn condition_kind_parses_wire_names() {
        for condition in ConditionKind::ALL {
            assert_eq!(condition.as_str().parse::<ConditionKind>(), Ok(condition));
        }
        assert_eq!(
            "between".parse::<ConditionKind>(),
            Err(CriteriaError::UnknownCondition("between".to_string()))
        );
    }

    #[test]
    fn unknown_condition_lists_every_condition() {
        let err = CriteriaError::UnknownCondition("between".to_string());
        assert_eq!(
            err.to_string(),
            "Unknown condition 'between', expected one of: equals, not_equals, greater_than, greater_than_or_equal, less_than, less_than_or_equal"
        );
    }

    #[test]
    fn disallowed_conditions_are_rejected_for_every_field() {
        let registry = registry();
        for field in registry.fields() {
            for condition in ConditionKind::ALL {
                if registry.is_allowed(field, condition) {
                    continue;
                }
                let err = serialize(&[criterion(field, condition, &["1"])], registry).unwrap_err();
                assert!(
                    matches!(err, CriteriaError::UnsupportedCondition { .. }),
                    "{} {} gave {:?}",
                    field,
                    condition,
                    err
                );
            }
        }
    }

    #[test]
    fn unsupported_condition_message_lists_allowed() {
        let err = serialize(
            &[criterion("severity", ConditionKind::LessThan, &["4"])],
            registry(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The condition 'less_than' is not supported for field 'severity'. \
             Supported conditions are: equals, not_equals"
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = serialize(
            &[criterion("resource.bogus", ConditionKind::Equals, &["x"])],
            registry(),
        )
        .unwrap_err();
        assert_eq!(err, CriteriaError::UnknownField("resource.bogus".to_string()));
    }

    #[test]
    fn equals_values_survive_round_trip() {
        let input = [criterion("region", ConditionKind::Equals, &["eu-west-1", "us-east-1"])];
        let serialized = serialize(&input, registry()).unwrap();
        assert_eq!(
            serialized.get("region").unwrap().equals,
            Some(vec!["eu-west-1".to_string(), "us-east-1".to_string()])
        );
        assert_eq!(flatten(&serialized), input.to_vec());
    }

    #[test]
    fn ordering_bounds_combine_on_one_field() {
        let input = [
            criterion("updatedAt", ConditionKind::GreaterThan, &["5"]),
            criterion("updatedAt", ConditionKind::LessThan, &["10"]),
        ];
        let serialized = serialize(&input, registry()).unwrap();
        assert_eq!(serialized.len(), 1);

        let record = serialized.get("updatedAt").unwrap();
        assert_eq!(record.greater_than, Some(5));
        assert_eq!(record.less_than, Some(10));

        assert_eq!(flatten(&serialized), input.to_vec());
    }

    #[test]
    fn later_bound_overwrites_earlier_for_same_condition() {
        let input = [
            criterion("updatedAt", ConditionKind::GreaterThanOrEqual, &["1"]),
            criterion("updatedAt", ConditionKind::GreaterThanOrEqual, &["2"]),
        ];
        let serialized = serialize(&input, registry()).unwrap();
        assert_eq!(
            serialized.get("updatedAt").unwrap().greater_than_or_equal,
            Some(2)
        );
    }

    #[test]
    fn equality_and_bounds_coexist() {
        let input = [
            criterion("updatedAt", ConditionKind::LessThanOrEqual, &["1700000000000"]),
            criterion("updatedAt", ConditionKind::Equals, &["1600000000000"]),
            criterion("updatedAt", ConditionKind::NotEquals, &["1650000000000"]),
        ];
        let serialized = serialize(&input, registry()).unwrap();
        let record = serialized.get("updatedAt").unwrap();
        assert_eq!(record.less_than_or_equal, Some(1_700_000_000_000));
        assert!(record.equals.is_some());
        assert!(record.not_equals.is_some());

        let conditions: Vec<_> = flatten(&serialized).iter().map(|c| c.condition).collect();
        assert_eq!(
            conditions,
            vec![
                ConditionKind::Equals,
                ConditionKind::NotEquals,
                ConditionKind::LessThanOrEqual
            ]
        );
    }

    #[test]
    fn ordering_requires_exactly_one_value() {
        let err = serialize(
            &[criterion("updatedAt", ConditionKind::GreaterThan, &["5", "6"])],
            registry(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CriteriaError::MalformedValueCount {
                field: "updatedAt".to_string(),
                condition: ConditionKind::GreaterThan,
                count: 2,
            }
        );

        let err = serialize(
            &[criterion("updatedAt", ConditionKind::LessThan, &[])],
            registry(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CriteriaError::MalformedValueCount { count: 0, .. }
        ));
    }

    #[test]
    fn ordering_requires_integer_value() {
        let err = serialize(
            &[criterion("updatedAt", ConditionKind::GreaterThan, &["abc"])],
            registry(),
        )
        .unwrap_err();
        assert!(matches!(err, CriteriaError::MalformedValueType { ref value, .. } if value == "abc"));

        assert!(
            serialize(
                &[criterion("updatedAt", ConditionKind::GreaterThan, &["1.5"])],
                registry()
            )
            .is_err()
        );
        assert!(
            serialize(
                &[criterion("updatedAt", ConditionKind::GreaterThan, &["-42"])],
                registry()
            )
            .is_ok()
        );
    }

    #[test]
    fn failure_leaves_no_partial_result() {
        let input = [
            criterion("region", ConditionKind::Equals, &["eu-west-1"]),
            criterion("updatedAt", ConditionKind::GreaterThan, &["later"]),
        ];
        assert!(serialize(&input, registry()).is_err());
    }

    #[test]
    fn flatten_orders_fields_and_skips_empty_sets() {
        let criteria: FindingCriteria = [
            (
                "severity".to_string(),
                ConditionRecord {
                    equals: Some(vec!["8".to_string()]),
                    not_equals: Some(vec![]),
                    ..Default::default()
                },
            ),
            (
                "account_id".to_string(),
                ConditionRecord {
                    not_equals: Some(vec!["123456789012".to_string()]),
                    ..Default::default()
                },
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            flatten(&criteria),
            vec![
                criterion("account_id", ConditionKind::NotEquals, &["123456789012"]),
                criterion("severity", ConditionKind::Equals, &["8"]),
            ]
        );
    }

    #[test]
    fn criteria_from_value_reads_block() {
        let value = Value::Map(HashMap::from([(
            "criterion".to_string(),
            Value::List(vec![
                Value::Map(HashMap::from([
                    ("field".to_string(), Value::from("updatedAt")),
                    ("condition".to_string(), Value::from("greater_than")),
                    ("values".to_string(), Value::List(vec![Value::Int(5)])),
                ])),
                Value::Map(HashMap::from([
                    ("field".to_string(), Value::from("type")),
                    ("condition".to_string(), Value::from("equals")),
                    (
                        "values".to_string(),
                        Value::List(vec![Value::from("Recon:EC2/PortProbeUnprotectedPort")]),
                    ),
                ])),
            ]),
        )]));

        let criteria = criteria_from_value(&value).unwrap();
        assert_eq!(
            criteria,
            vec![
                criterion("updatedAt", ConditionKind::GreaterThan, &["5"]),
                criterion(
                    "type",
                    ConditionKind::Equals,
                    &["Recon:EC2/PortProbeUnprotectedPort"]
                ),
            ]
        );

        // A single-element list wrapping the block is accepted too
        let wrapped = Value::List(vec![value]);
        assert_eq!(criteria_from_value(&wrapped).unwrap(), criteria);
    }

    #[test]
    fn criteria_from_value_rejects_bad_shapes() {
        assert!(matches!(
            criteria_from_value(&Value::from("nope")),
            Err(CriteriaError::MalformedCriterion(_))
        ));

        let missing_condition = Value::Map(HashMap::from([(
            "criterion".to_string(),
            Value::List(vec![Value::Map(HashMap::from([(
                "field".to_string(),
                Value::from("type"),
            )]))]),
        )]));
        let err = criteria_from_value(&missing_condition).unwrap_err();
        assert!(err.to_string().contains("'condition'"));

        let bad_condition = Value::Map(HashMap::from([(
            "criterion".to_string(),
            Value::List(vec![Value::Map(HashMap::from([
                ("field".to_string(), Value::from("type")),
                ("condition".to_string(), Value::from("contains")),
            ]))]),
        )]));
        assert_eq!(
            criteria_from_value(&bad_condition),
            Err(CriteriaError::UnknownCondition("contains".to_string()))
        );
    }

    #[test]
    fn missing_values_mean_empty_list() {
        let value = Value::Map(HashMap::from([(
            "criterion".to_string(),
            Value::List(vec![Value::Map(HashMap::from([
                ("field".to_string(), Value::from("updatedAt")),
                ("condition".to_string(), Value::from("less_than")),
            ]))]),
        )]));
        let criteria = criteria_from_value(&value).unwrap();
        assert!(criteria[0].values.is_empty());
        assert!(matches!(
            serialize(&criteria, registry()),
            Err(CriteriaError::MalformedValueCount { count: 0, .. })
        ));
    }

    #[test]
    fn criteria_value_round_trip() {
        let criteria = vec![
            criterion("id", ConditionKind::NotEquals, &["a", "b"]),
            criterion("updatedAt", ConditionKind::LessThan, &["10"]),
        ];
        let value = criteria_to_value(&criteria);
        assert_eq!(criteria_from_value(&value).unwrap(), criteria);
    }

    #[test]
    fn criterion_serde_uses_wire_condition_names() {
        let c = criterion("updatedAt", ConditionKind::GreaterThanOrEqual, &["1"]);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["condition"], "greater_than_or_equal");

        let parsed: Criterion =
            serde_json::from_str(r#"{"field":"type","condition":"not_equals"}"#).unwrap();
        assert_eq!(parsed, criterion("type", ConditionKind::NotEquals, &[]));
    }
}
