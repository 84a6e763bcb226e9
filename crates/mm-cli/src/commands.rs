//! Subcommand handlers

use std::sync::Arc;

use anyhow::bail;
use clap::ArgMatches;
use mm_client::HttpBackend;
use mm_core::{
    AnalysisOutcome, Artifacts, MigrationError, MigrationWorkflow, MonitorState,
    OrchestratorConfig, ProgressSnapshot,
};
use mm_types::{ConnectionDescriptor, MigrationPlan, TargetCredentials, UserId};

/// Shared state of one CLI invocation
pub(crate) struct CliContext {
    pub(crate) backend: Arc<HttpBackend>,
    pub(crate) orchestrator: OrchestratorConfig,
    pub(crate) user: Option<UserId>,
}

/// Wrap a core error so the operator sees its message first
fn operator(err: MigrationError) -> anyhow::Error {
    let message = err.operator_message();
    anyhow::Error::new(err).context(message)
}

fn arg(args: &ArgMatches, name: &str) -> Option<String> {
    args.get_one::<String>(name).cloned()
}

/// Source connection from the shared connection arguments
pub(crate) fn connection_from(args: &ArgMatches) -> anyhow::Result<ConnectionDescriptor> {
    let host = arg(args, "host").unwrap_or_else(|| "localhost".to_string());
    let port = args.get_one::<u16>("port").copied().unwrap_or(27017);
    let mut connection =
        ConnectionDescriptor::source(host, port, arg(args, "database").unwrap_or_default());

    connection.username = arg(args, "username");
    connection.password = arg(args, "password");
    connection.auth_database = arg(args, "auth-database");

    if let Some(uri) = arg(args, "uri") {
        // a malformed string is logged and the explicit fields stay in effect
        let _ = connection.apply_connection_string(&uri);
    }

    if connection.database_name.trim().is_empty() {
        bail!("a source database is required (--database, or in --uri)");
    }
    Ok(connection)
}

/// Probe the source and resolve its session
async fn open_session(
    ctx: &CliContext,
    args: &ArgMatches,
) -> anyhow::Result<MigrationWorkflow<HttpBackend>> {
    let mut workflow = MigrationWorkflow::new(
        Arc::clone(&ctx.backend),
        ctx.orchestrator.clone(),
        ctx.user.clone(),
    );
    workflow.set_connection(connection_from(args)?);

    let check = workflow.test_connection().await.map_err(operator)?;
    if !check.probe.success {
        bail!("connection failed: {}", check.probe.message);
    }

    println!("Connected to {}", workflow.connection().endpoint());
    if let Some(count) = check.probe.collection_count {
        println!("  {count} collections");
    }
    if let Some(session) = &check.session {
        let kind = if session.is_existing { "existing" } else { "new" };
        println!("Session {} ({kind})", session.session_id);
    }
    if let Some(report) = &check.existing_analysis {
        println!("{}", check.message());
        for (kind, err) in &report.failed {
            println!("  warning: {kind} not loaded: {}", err.operator_message());
        }
    }
    Ok(workflow)
}

pub(crate) async fn probe(ctx: &CliContext, args: &ArgMatches) -> anyhow::Result<()> {
    let workflow = open_session(ctx, args).await?;
    if let Some(at) = workflow.analysis().last_analyzed_at() {
        println!("Last analysis: {at}");
    }
    Ok(())
}

pub(crate) async fn analyze(ctx: &CliContext, args: &ArgMatches) -> anyhow::Result<()> {
    let mut workflow = open_session(ctx, args).await?;

    if workflow.has_existing_analysis() && !args.get_flag("reanalyze") {
        if let Some(at) = workflow.analysis().last_analyzed_at() {
            println!("Analyzed at {at}; pass --reanalyze to run discovery again");
        }
    } else {
        let outcome = workflow.run_analysis().await.map_err(operator)?;
        print_outcome(&outcome);
    }

    print_artifacts(workflow.analysis().artifacts());
    Ok(())
}

pub(crate) async fn plan(ctx: &CliContext, args: &ArgMatches) -> anyhow::Result<()> {
    let mut workflow = open_session(ctx, args).await?;
    let plan = workflow.generate_plan().await.map_err(operator)?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

pub(crate) async fn migrate(ctx: &CliContext, args: &ArgMatches) -> anyhow::Result<()> {
    let workflow = open_session(ctx, args).await?;
    let mut monitor = workflow.execution_monitor().map_err(operator)?;

    if monitor.check_configured().await.map_err(operator)? {
        if args.get_flag("reconfigure") {
            monitor.reconfigure().map_err(operator)?;
        } else if let Some(target) = monitor.target() {
            println!("Target {target} already configured");
        }
    }

    if monitor.state() == &MonitorState::Unconfigured {
        monitor
            .configure(credentials_from(args))
            .await
            .map_err(operator)?;
        if let Some(target) = monitor.target() {
            println!("Target {target} saved");
        }
    }

    let started = monitor.start().await.map_err(operator)?;
    println!(
        "Run {} started{}",
        started.run_id,
        started
            .mode
            .as_deref()
            .map(|mode| format!(" ({mode})"))
            .unwrap_or_default()
    );

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    loop {
        let next = tokio::select! {
            snapshot = monitor.next_snapshot() => Some(snapshot),
            _ = &mut interrupt => None,
        };
        match next {
            Some(Some(snapshot)) => print_progress(&snapshot),
            Some(None) => break,
            None => {
                monitor.shutdown();
                println!("Stopped following run {}; it continues on the server", started.run_id);
                return Ok(());
            }
        }
    }

    let summary = monitor.summary();
    println!(
        "Migration finished: {} tables completed, {} failed, {}/{} rows ({}%)",
        summary.completed,
        summary.failed,
        summary.rows_processed,
        summary.rows_total,
        summary.percentage()
    );
    Ok(())
}

/// Target credentials; blanks are left for local validation to report
fn credentials_from(args: &ArgMatches) -> TargetCredentials {
    TargetCredentials {
        host: arg(args, "target-host").unwrap_or_default(),
        port: args.get_one::<u16>("target-port").copied().unwrap_or(5432),
        database_name: arg(args, "target-database").unwrap_or_else(|| "postgres".to_string()),
        username: arg(args, "target-username").unwrap_or_default(),
        password: arg(args, "target-password").unwrap_or_default(),
    }
}

fn print_outcome(outcome: &AnalysisOutcome) {
    let label = match outcome.kind {
        mm_core::AnalysisKind::Initial => "Analysis",
        mm_core::AnalysisKind::Reanalysis => "Re-analysis",
    };
    println!(
        "{label} complete: {} collections, {} relationships, {} risks",
        outcome.snapshot.collections.len(),
        outcome.snapshot.relationship_count,
        outcome.snapshot.risk_count
    );
    for (kind, err) in &outcome.loads.failed {
        println!("  warning: {kind} not loaded: {}", err.operator_message());
    }
}

fn print_artifacts(artifacts: &Artifacts) {
    println!("\nSchema ({} collections)", artifacts.schema.collection_count());
    for collection in artifacts.schema.collections() {
        println!("  {collection}: {} fields", artifacts.schema.fields(collection).len());
    }

    println!("\nRelationships ({})", artifacts.relationships.len());
    for rel in &artifacts.relationships {
        println!(
            "  {}.{} -> {} [{}, {:.0}%]",
            rel.source_collection,
            rel.source_field,
            rel.target_collection,
            rel.relation_type,
            rel.confidence * 100.0
        );
    }

    println!("\nRisks ({})", artifacts.risks.len());
    for (severity, risks) in artifacts.risks_by_severity() {
        println!("  {severity:?}");
        for risk in risks {
            println!("    {}: {}", risk.risk_type, risk.description);
        }
    }
}

fn print_plan(plan: &MigrationPlan) {
    println!("Tables ({})", plan.table_mappings.len());
    for mapping in &plan.table_mappings {
        println!("  {} -> {}", mapping.source_collection, mapping.target_table);
        for column in &mapping.columns {
            let key = if column.primary_key { " PK" } else { "" };
            println!("    {} {}{key}", column.target_column, column.data_type);
        }
    }
    if !plan.foreign_keys.is_empty() {
        println!("Foreign keys ({})", plan.foreign_keys.len());
        for fk in &plan.foreign_keys {
            println!(
                "  {}.{} -> {}.{}",
                fk.source_table, fk.source_column, fk.target_table, fk.target_column
            );
        }
    }
    if !plan.indexes.is_empty() {
        println!("Indexes ({})", plan.indexes.len());
        for index in &plan.indexes {
            println!("  {}: {}", index.index_name, index.reason);
        }
    }
    println!("Steps");
    for step in &plan.migration_steps {
        println!("  {}. {}", step.step, step.description);
    }
}

fn print_progress(snapshot: &ProgressSnapshot) {
    for table in &snapshot.tables {
        println!(
            "  {:<28} {:<10} {:>10}/{:<10} {:>3}%",
            table.table_name,
            format!("{:?}", table.status),
            table.rows_processed,
            table.rows_total,
            table.percentage()
        );
    }
    let summary = snapshot.summary();
    println!(
        "poll {}: {}/{} tables done, {}%",
        snapshot.revision,
        summary.completed + summary.failed,
        summary.tables,
        summary.percentage()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(argv: &[&str]) -> ArgMatches {
        let matches = crate::cli().try_get_matches_from(argv).unwrap();
        matches.subcommand().unwrap().1.clone()
    }

    #[test]
    fn uri_decomposes_into_connection() {
        let args = matches(&[
            "migration-mind",
            "probe",
            "--uri",
            "mongodb+srv://app:pw@cluster0.example.net/shop?retryWrites=true",
        ]);
        let connection = connection_from(&args).unwrap();
        assert_eq!(connection.host, "cluster0.example.net");
        assert_eq!(connection.database_name, "shop");
        assert_eq!(connection.username.as_deref(), Some("app"));
    }

    #[test]
    fn malformed_uri_keeps_explicit_fields() {
        let args = matches(&[
            "migration-mind",
            "probe",
            "--uri",
            "not-a-connection-string",
            "--host",
            "db.local",
            "--database",
            "crm",
        ]);
        let connection = connection_from(&args).unwrap();
        assert_eq!(connection.host, "db.local");
        assert_eq!(connection.database_name, "crm");
    }

    #[test]
    fn database_is_required() {
        let args = matches(&["migration-mind", "probe", "--host", "db.local"]);
        assert!(connection_from(&args).is_err());
    }

    #[test]
    fn blank_target_fields_are_left_for_validation() {
        let args = matches(&["migration-mind", "migrate", "--database", "shop"]);
        let credentials = credentials_from(&args);
        assert_eq!(credentials.port, 5432);
        assert_eq!(credentials.database_name, "postgres");
        assert!(!credentials.missing_fields().is_empty());
    }
}
