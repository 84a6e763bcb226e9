//! Relational migration plan
//!
//! The backend returns the plan either with its fields at the top level or
//! nested under `planJson` (the stored plan record). [`MigrationPlan::from_payload`]
//! normalizes both into the same value.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const NESTED_PLAN_KEY: &str = "planJson";

/// Column produced from a source field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub source_field: String,
    pub target_column: String,
    pub data_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub requires_transformation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation_type: Option<String>,
}

fn default_nullable() -> bool {
    true
}

/// Collection to table mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMapping {
    pub source_collection: String,
    pub target_table: String,
    #[serde(default)]
    pub columns: Vec<ColumnMapping>,
}

/// Ordered migration step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStep {
    #[serde(deserialize_with = "step_number")]
    pub step: u32,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Step numbers arrive as numbers or numeric strings
fn step_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Foreign key inferred from a relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Recommended index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecommendation {
    pub index_name: String,
    #[serde(default)]
    pub reason: String,
}

/// Migration plan generated from the latest analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    #[serde(default)]
    pub table_mappings: Vec<TableMapping>,
    #[serde(default)]
    pub migration_steps: Vec<MigrationStep>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub indexes: Vec<IndexRecommendation>,
}

impl MigrationPlan {
    /// Normalize a plan payload in either wire shape.
    ///
    /// `planJson` may hold the plan object or the plan serialized as a string.
    ///
    /// # Errors
    /// Fails when the (unwrapped) payload does not describe a plan.
    pub fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        let plan = match payload {
            Value::Object(mut record) if record.contains_key(NESTED_PLAN_KEY) => {
                match record.remove(NESTED_PLAN_KEY).unwrap_or(Value::Null) {
                    Value::String(encoded) => serde_json::from_str(&encoded)?,
                    nested => nested,
                }
            }
            flat => flat,
        };
        serde_json::from_value(plan)
    }

    /// Whether the plan carries none of the expected sections
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table_mappings.is_empty()
            && self.migration_steps.is_empty()
            && self.foreign_keys.is_empty()
            && self.indexes.is_empty()
    }

    /// Target table for a source collection
    #[must_use]
    pub fn target_table(&self, source_collection: &str) -> Option<&str> {
        self.table_mappings
            .iter()
            .find(|m| m.source_collection == source_collection)
            .map(|m| m.target_table.as_str())
    }
}
