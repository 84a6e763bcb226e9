//! Analysis artifacts discovered on the source database

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Explicit `null` reads as the type's default, like a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One field observed in a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "collection")]
    pub collection_name: String,
    pub field_name: String,
    /// Dot notation for nested fields (`address.city`)
    pub field_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_types: BTreeSet<String>,
    /// Share of sampled documents containing the field, 0.0 - 1.0
    #[serde(default, deserialize_with = "null_as_default")]
    pub frequency: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_required: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_array: bool,
}

/// Discovered fields keyed by collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaCatalog(pub BTreeMap<String, Vec<SchemaField>>);

impl SchemaCatalog {
    /// Empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no collection has been loaded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of collections
    #[inline]
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.0.len()
    }

    /// Collection names in sorted order
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Fields of one collection
    #[must_use]
    pub fn fields(&self, collection: &str) -> &[SchemaField] {
        self.0.get(collection).map_or(&[], Vec::as_slice)
    }

    /// Total number of fields across collections
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

impl FromIterator<SchemaField> for SchemaCatalog {
    fn from_iter<I: IntoIterator<Item = SchemaField>>(iter: I) -> Self {
        let mut by_collection: BTreeMap<String, Vec<SchemaField>> = BTreeMap::new();
        for field in iter {
            by_collection
                .entry(field.collection_name.clone())
                .or_default()
                .push(field);
        }
        Self(by_collection)
    }
}

/// Reference detected between two collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source_collection: String,
    pub source_field: String,
    pub target_collection: String,
    pub relation_type: String,
    /// 0.0 - 1.0
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub detection_method: String,
}

/// Risk severity, ordered from least to most severe.
///
/// `Unknown` ranks below `Low`, so it is listed last when most severe
/// comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    /// Severity the client does not recognize
    #[serde(other)]
    Unknown,
}

impl Severity {
    #[inline]
    fn rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Migration risk reported by the analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub risk_type: String,
    pub severity: Severity,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub affected_collections: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mitigation: String,
}

impl Risk {
    /// Group risks by severity, most severe first
    #[must_use]
    pub fn by_severity(risks: &[Risk]) -> Vec<(Severity, Vec<&Risk>)> {
        let mut grouped: BTreeMap<Severity, Vec<&Risk>> = BTreeMap::new();
        for risk in risks {
            grouped.entry(risk.severity).or_default().push(risk);
        }
        grouped.into_iter().rev().collect()
    }
}

/// Summary of the most recent analysis. Superseded, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub collections: Vec<String>,
    pub field_counts_by_collection: BTreeMap<String, usize>,
    pub relationship_count: usize,
    pub risk_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(collection: &str, name: &str) -> SchemaField {
        SchemaField {
            id: None,
            collection_name: collection.to_string(),
            field_name: name.to_string(),
            field_path: name.to_string(),
            data_types: BTreeSet::from(["string".to_string()]),
            frequency: 1.0,
            is_required: true,
            is_array: false,
        }
    }

    fn risk(severity: Severity) -> Risk {
        Risk {
            id: None,
            risk_type: "SCHEMA_INCONSISTENCY".to_string(),
            severity,
            description: "mixed types".to_string(),
            affected_collections: BTreeSet::new(),
            mitigation: String::new(),
        }
    }

    #[test]
    fn catalog_groups_fields_by_collection() {
        let catalog: SchemaCatalog = vec![
            field("users", "_id"),
            field("orders", "_id"),
            field("users", "email"),
        ]
        .into_iter()
        .collect();

        assert_eq!(catalog.collection_count(), 2);
        assert_eq!(catalog.field_count(), 3);
        assert_eq!(catalog.fields("users").len(), 2);
        assert!(catalog.fields("missing").is_empty());
        assert_eq!(catalog.collections().collect::<Vec<_>>(), vec!["orders", "users"]);
    }

    #[test]
    fn schema_field_reads_backend_shape() {
        let json = serde_json::json!({
            "id": "f1",
            "collectionName": "users",
            "fieldName": "city",
            "fieldPath": "address.city",
            "dataTypes": ["string", "null"],
            "frequency": 0.75,
            "isRequired": false,
            "isArray": false
        });
        let field: SchemaField = serde_json::from_value(json).unwrap();
        assert_eq!(field.field_path, "address.city");
        assert_eq!(field.data_types.len(), 2);
    }

    #[test]
    fn unknown_severity_is_kept() {
        let severity: Severity = serde_json::from_str("\"CATASTROPHIC\"").unwrap();
        assert_eq!(severity, Severity::Unknown);
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"HIGH\"");
    }

    #[test]
    fn risks_group_most_severe_first() {
        let risks = vec![
            risk(Severity::Low),
            risk(Severity::Critical),
            risk(Severity::Low),
            risk(Severity::Medium),
        ];
        let grouped = Risk::by_severity(&risks);
        let order: Vec<_> = grouped.iter().map(|(s, r)| (*s, r.len())).collect();
        assert_eq!(
            order,
            vec![(Severity::Critical, 1), (Severity::Medium, 1), (Severity::Low, 2)]
        );
    }

    #[test]
    fn unknown_severity_groups_after_low() {
        let unknown: Severity = serde_json::from_str("\"SEVERE_ISH\"").unwrap();
        let risks = vec![
            risk(unknown),
            risk(Severity::Low),
            risk(Severity::High),
            risk(Severity::Unknown),
        ];
        let order: Vec<_> = Risk::by_severity(&risks)
            .iter()
            .map(|(s, r)| (*s, r.len()))
            .collect();
        assert_eq!(
            order,
            vec![(Severity::High, 1), (Severity::Low, 1), (Severity::Unknown, 2)]
        );
        assert!(Severity::Unknown < Severity::Low);
    }

    #[test]
    fn null_fields_read_as_defaults() {
        let field: SchemaField = serde_json::from_value(serde_json::json!({
            "collectionName": "users",
            "fieldName": "city",
            "fieldPath": "address.city",
            "dataTypes": null,
            "frequency": null,
            "isRequired": null,
            "isArray": null
        }))
        .unwrap();
        assert!(!field.is_required);
        assert!(field.data_types.is_empty());

        let rel: Relationship = serde_json::from_value(serde_json::json!({
            "sourceCollection": "orders",
            "sourceField": "userId",
            "targetCollection": "users",
            "relationType": "MANY_TO_ONE",
            "confidence": null,
            "detectionMethod": null
        }))
        .unwrap();
        assert!(rel.confidence.abs() < f64::EPSILON);
        assert!(rel.detection_method.is_empty());

        let risk: Risk = serde_json::from_value(serde_json::json!({
            "riskType": "MIXED_TYPES",
            "severity": "MEDIUM",
            "description": "price stored as string and number",
            "affectedCollections": null,
            "mitigation": null
        }))
        .unwrap();
        assert_eq!(risk.severity, Severity::Medium);
        assert!(risk.affected_collections.is_empty());
        assert!(risk.mitigation.is_empty());
    }
}
