//! Sample data shared by tests

use std::collections::BTreeSet;

use mm_types::{
    ColumnMapping, ConnectionDescriptor, IndexRecommendation, MigrationPlan, MigrationStep,
    Relationship, Risk, RunId, SchemaField, SessionKey, Severity, TableMapping, TableProgress,
    TableStatus, TargetCredentials, UserId,
};

pub const SAMPLE_COLLECTIONS: [&str; 5] = ["customers", "inventory", "orders", "products", "reviews"];

pub fn sample_user() -> UserId {
    UserId::new("user-42")
}

pub fn sample_connection() -> ConnectionDescriptor {
    ConnectionDescriptor::source("localhost", 27017, "shop")
}

pub fn sample_session_key() -> SessionKey {
    SessionKey::new(sample_user(), &sample_connection())
}

pub fn field(collection: &str, name: &str, data_type: &str) -> SchemaField {
    SchemaField {
        id: None,
        collection_name: collection.to_string(),
        field_name: name.to_string(),
        field_path: name.to_string(),
        data_types: BTreeSet::from([data_type.to_string()]),
        frequency: 1.0,
        is_required: name == "_id",
        is_array: false,
    }
}

/// Two fields in each of the five sample collections
pub fn sample_fields() -> Vec<SchemaField> {
    SAMPLE_COLLECTIONS
        .iter()
        .flat_map(|c| [field(c, "_id", "objectId"), field(c, "createdAt", "date")])
        .collect()
}

pub fn relationship(source: &str, field: &str, target: &str) -> Relationship {
    Relationship {
        id: None,
        source_collection: source.to_string(),
        source_field: field.to_string(),
        target_collection: target.to_string(),
        relation_type: "MANY_TO_ONE".to_string(),
        confidence: 0.9,
        detection_method: "NAMING_CONVENTION".to_string(),
    }
}

pub fn sample_relationships() -> Vec<Relationship> {
    vec![
        relationship("orders", "customerId", "customers"),
        relationship("orders", "productId", "products"),
        relationship("reviews", "productId", "products"),
    ]
}

pub fn risk(risk_type: &str, severity: Severity) -> Risk {
    Risk {
        id: None,
        risk_type: risk_type.to_string(),
        severity,
        description: format!("{risk_type} detected"),
        affected_collections: BTreeSet::from(["orders".to_string()]),
        mitigation: "Review before migrating".to_string(),
    }
}

pub fn sample_risks() -> Vec<Risk> {
    vec![risk("MIXED_TYPES", Severity::High)]
}

pub fn sample_plan() -> MigrationPlan {
    MigrationPlan {
        table_mappings: vec![TableMapping {
            source_collection: "orders".to_string(),
            target_table: "orders".to_string(),
            columns: vec![ColumnMapping {
                source_field: "_id".to_string(),
                target_column: "id".to_string(),
                data_type: "VARCHAR(24)".to_string(),
                primary_key: true,
                nullable: false,
                requires_transformation: true,
                transformation_type: Some("OBJECTID_TO_STRING".to_string()),
            }],
        }],
        migration_steps: vec![MigrationStep {
            step: 1,
            description: "Create tables".to_string(),
            note: None,
        }],
        foreign_keys: Vec::new(),
        indexes: vec![IndexRecommendation {
            index_name: "idx_orders_created_at".to_string(),
            reason: "Frequent range queries".to_string(),
        }],
    }
}

pub fn sample_credentials() -> TargetCredentials {
    TargetCredentials {
        host: "pg.internal".to_string(),
        port: 5432,
        database_name: "postgres".to_string(),
        username: "migrator".to_string(),
        password: "pg-secret".to_string(),
    }
}

/// Progress row of run `r1`
pub fn progress(table: &str, status: TableStatus, processed: u64, total: u64) -> TableProgress {
    TableProgress {
        id: format!("progress-{table}"),
        run_id: RunId::new("r1"),
        table_name: table.to_string(),
        rows_total: total,
        rows_processed: processed,
        status,
        updated_at: None,
    }
}
