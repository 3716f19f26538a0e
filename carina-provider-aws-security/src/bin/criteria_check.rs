//! GuardDuty finding criteria checker
//!
//! Validates a JSON list of criteria against the GuardDuty field registry
//! and prints the per-field condition records that would be sent to the API.
//!
//! Usage:
//!   echo '[{"field":"severity","condition":"equals","values":["8"]}]' | criteria-check
//!   criteria-check --file criteria.json
//!   criteria-check --list-fields

use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use carina_provider_aws_security::guardduty::criteria::{
    ConditionKind, Criterion, FieldRegistry, FindingCriteria, serialize,
};
use clap::Parser;
use serde_json::{Map, Value as Json, json};

#[derive(Parser, Debug)]
#[command(name = "criteria-check")]
#[command(about = "Validate GuardDuty finding criteria without calling AWS")]
struct Args {
    /// Input file (reads from stdin if not specified)
    #[arg(long)]
    file: Option<String>,

    /// Print every known field with its allowed conditions
    #[arg(long)]
    list_fields: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let registry = FieldRegistry::guardduty();

    if args.list_fields {
        for field in registry.fields() {
            let allowed: Vec<&str> = registry
                .allowed_conditions(field)
                .unwrap_or_default()
                .iter()
                .map(ConditionKind::as_str)
                .collect();
            println!("{}\t{}", field, allowed.join(","));
        }
        return Ok(());
    }

    let input = match &args.file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let criteria: Vec<Criterion> =
        serde_json::from_str(&input).context("Input must be a JSON list of criteria")?;
    log::debug!("Checking {} criteria", criteria.len());
    if criteria.is_empty() {
        bail!("No criteria given");
    }

    let finding_criteria = serialize(&criteria, registry)?;
    println!("{}", serde_json::to_string_pretty(&to_json(&finding_criteria))?);
    Ok(())
}

/// API-shaped rendering: `{"Criterion": {field: {"Equals": [...], ...}}}`
fn to_json(criteria: &FindingCriteria) -> Json {
    let mut fields = Map::new();
    for (field, record) in criteria.iter() {
        let mut condition = Map::new();
        if let Some(values) = &record.equals {
            condition.insert("Equals".to_string(), json!(values));
        }
        if let Some(values) = &record.not_equals {
            condition.insert("NotEquals".to_string(), json!(values));
        }
        for (key, kind) in [
            ("GreaterThan", ConditionKind::GreaterThan),
            ("GreaterThanOrEqual", ConditionKind::GreaterThanOrEqual),
            ("LessThan", ConditionKind::LessThan),
            ("LessThanOrEqual", ConditionKind::LessThanOrEqual),
        ] {
            if let Some(bound) = record.bound(kind) {
                condition.insert(key.to_string(), json!(bound));
            }
        }
        fields.insert(field.to_string(), Json::Object(condition));
    }
    json!({ "Criterion": fields })
}
