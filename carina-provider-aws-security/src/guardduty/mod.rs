//! GuardDuty resources

pub mod criteria;
pub mod filter;

pub use criteria::{
    ConditionKind, ConditionRecord, CriteriaError, Criterion, FieldRegistry, FindingCriteria,
};
pub use filter::FilterSpec;
