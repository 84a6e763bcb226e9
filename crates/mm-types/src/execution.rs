//! Target credentials and run progress

use serde::{Deserialize, Serialize};

use crate::ids::RunId;

/// Target credentials, entered once per session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCredentials {
    #[serde(rename = "targetHost")]
    pub host: String,
    #[serde(rename = "targetPort")]
    pub port: u16,
    #[serde(rename = "targetDatabase")]
    pub database_name: String,
    #[serde(rename = "targetUsername")]
    pub username: String,
    #[serde(rename = "targetPassword")]
    pub password: String,
}

/// Required credential field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    Host,
    Port,
    Database,
    Username,
    Password,
}

impl std::fmt::Display for CredentialField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Host => "host",
            Self::Port => "port",
            Self::Database => "database",
            Self::Username => "username",
            Self::Password => "password",
        };
        f.write_str(name)
    }
}

impl TargetCredentials {
    /// Fields left blank; a zero port counts as blank
    #[must_use]
    pub fn missing_fields(&self) -> Vec<CredentialField> {
        let mut missing = Vec::new();
        if self.host.trim().is_empty() {
            missing.push(CredentialField::Host);
        }
        if self.port == 0 {
            missing.push(CredentialField::Port);
        }
        if self.database_name.trim().is_empty() {
            missing.push(CredentialField::Database);
        }
        if self.username.trim().is_empty() {
            missing.push(CredentialField::Username);
        }
        if self.password.is_empty() {
            missing.push(CredentialField::Password);
        }
        missing
    }

    /// Summary that is safe to display
    #[must_use]
    pub fn summary(&self) -> TargetSummary {
        TargetSummary {
            host: self.host.clone(),
            port: self.port,
            database_name: self.database_name.clone(),
        }
    }
}

impl std::fmt::Debug for TargetCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Configured target as reported back by the backend (never the password)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub host: String,
    pub port: u16,
    pub database_name: String,
}

impl std::fmt::Display for TargetSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.database_name)
    }
}

/// Per-table migration status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// Status the client does not recognize; treated as still in progress
    #[serde(other)]
    Unknown,
}

impl TableStatus {
    /// Completed or failed
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Progress of one target table within a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableProgress {
    pub id: String,
    pub run_id: RunId,
    pub table_name: String,
    #[serde(default)]
    pub rows_total: u64,
    #[serde(default)]
    pub rows_processed: u64,
    pub status: TableStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl TableProgress {
    /// Completion percentage of this table
    #[inline]
    #[must_use]
    pub fn percentage(&self) -> u8 {
        completion_percentage(self.rows_processed, self.rows_total)
    }
}

/// `round(processed / total * 100)` clamped to 0..=100; a zero total yields 0
#[must_use]
pub fn completion_percentage(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let total = u128::from(total);
    let rounded = (u128::from(processed) * 100 + total / 2) / total;
    // min(100) guarantees the value fits
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

/// Overall run status, derived from the table snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Completed,
}

impl RunStatus {
    /// Completed once at least one table exists and every table is terminal
    #[must_use]
    pub fn from_progress(progress: &[TableProgress]) -> Self {
        if !progress.is_empty() && progress.iter().all(|p| p.status.is_terminal()) {
            Self::Completed
        } else {
            Self::Running
        }
    }

    /// Whether polling may stop
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Aggregate view over a progress snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub status: RunStatus,
    pub tables: usize,
    pub completed: usize,
    pub failed: usize,
    pub active: usize,
    pub rows_processed: u64,
    pub rows_total: u64,
}

impl RunSummary {
    /// Summarize a progress snapshot
    #[must_use]
    pub fn from_progress(progress: &[TableProgress]) -> Self {
        let count = |status: TableStatus| progress.iter().filter(|p| p.status == status).count();
        let completed = count(TableStatus::Completed);
        let failed = count(TableStatus::Failed);
        Self {
            status: RunStatus::from_progress(progress),
            tables: progress.len(),
            completed,
            failed,
            active: progress.len() - completed - failed,
            rows_processed: progress.iter().map(|p| p.rows_processed).sum(),
            rows_total: progress.iter().map(|p| p.rows_total).sum(),
        }
    }

    /// Completion percentage over all rows
    #[inline]
    #[must_use]
    pub fn percentage(&self) -> u8 {
        completion_percentage(self.rows_processed, self.rows_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(name: &str, status: TableStatus, processed: u64, total: u64) -> TableProgress {
        TableProgress {
            id: format!("p-{name}"),
            run_id: RunId::new("r1"),
            table_name: name.to_string(),
            rows_total: total,
            rows_processed: processed,
            status,
            updated_at: None,
        }
    }

    fn creds() -> TargetCredentials {
        TargetCredentials {
            host: "pg.local".to_string(),
            port: 5432,
            database_name: "postgres".to_string(),
            username: "admin".to_string(),
            password: "pw".to_string(),
        }
    }

    #[test]
    fn percentage_edge_cases() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(10, 0), 0);
        assert_eq!(completion_percentage(50, 50), 100);
        assert_eq!(completion_percentage(75, 50), 100);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(1, 200), 1);
        assert_eq!(completion_percentage(u64::MAX, u64::MAX), 100);
    }

    #[test]
    fn empty_snapshot_is_not_completed() {
        assert_eq!(RunStatus::from_progress(&[]), RunStatus::Running);
    }

    #[test]
    fn failed_tables_count_as_terminal() {
        let progress = vec![
            table("users", TableStatus::Completed, 10, 10),
            table("orders", TableStatus::Failed, 3, 10),
        ];
        assert_eq!(RunStatus::from_progress(&progress), RunStatus::Completed);

        let summary = RunSummary::from_progress(&progress);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.active, 0);
        assert_eq!(summary.percentage(), 65);
    }

    #[test]
    fn unknown_table_status_keeps_run_active() {
        let progress: Vec<TableProgress> = serde_json::from_value(serde_json::json!([{
            "id": "p1",
            "runId": "r1",
            "tableName": "users",
            "rowsTotal": 10,
            "rowsProcessed": 10,
            "status": "PAUSED",
            "updatedAt": "2026-10-17T09:30:00"
        }]))
        .unwrap();
        assert_eq!(progress[0].status, TableStatus::Unknown);
        assert_eq!(RunStatus::from_progress(&progress), RunStatus::Running);
    }

    #[test]
    fn credentials_report_every_blank_field() {
        assert!(creds().missing_fields().is_empty());

        let partial = TargetCredentials {
            username: " ".to_string(),
            password: String::new(),
            port: 0,
            ..creds()
        };
        assert_eq!(
            partial.missing_fields(),
            vec![
                CredentialField::Port,
                CredentialField::Username,
                CredentialField::Password
            ]
        );
    }

    #[test]
    fn credentials_wire_names_and_redaction() {
        let json = serde_json::to_value(creds()).unwrap();
        assert_eq!(json["targetHost"], "pg.local");
        assert_eq!(json["targetPort"], 5432);
        assert_eq!(json["targetPassword"], "pw");
        assert!(!format!("{:?}", creds()).contains("\"pw\""));
        assert_eq!(creds().summary().to_string(), "pg.local:5432/postgres");
    }

    fn any_status() -> impl Strategy<Value = TableStatus> {
        prop_oneof![
            Just(TableStatus::Pending),
            Just(TableStatus::Running),
            Just(TableStatus::Completed),
            Just(TableStatus::Failed),
        ]
    }

    proptest! {
        #[test]
        fn prop_percentage_is_bounded(processed in any::<u64>(), total in any::<u64>()) {
            let pct = completion_percentage(processed, total);
            prop_assert!(pct <= 100);
            if total == 0 {
                prop_assert_eq!(pct, 0);
            }
            if total > 0 && processed >= total {
                prop_assert_eq!(pct, 100);
            }
        }

        #[test]
        fn prop_completed_iff_nonempty_and_all_terminal(
            statuses in proptest::collection::vec(any_status(), 0..8)
        ) {
            let progress: Vec<_> = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| table(&format!("t{i}"), *s, 0, 0))
                .collect();
            let expected = !statuses.is_empty() && statuses.iter().all(|s| s.is_terminal());
            prop_assert_eq!(RunStatus::from_progress(&progress).is_terminal(), expected);
        }
    }
}
