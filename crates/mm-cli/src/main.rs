mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{value_parser, Arg, ArgAction, Command};
use mm_client::HttpBackend;
use mm_types::UserId;

use crate::commands::CliContext;
use crate::config::AppConfig;

fn connection_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("uri")
                .long("uri")
                .env("MM_SOURCE_URI")
                .hide_env_values(true)
                .help("Source connection string (mongodb:// or mongodb+srv://)"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .default_value("localhost")
                .help("Source host"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .default_value("27017")
                .value_parser(value_parser!(u16))
                .help("Source port"),
        )
        .arg(
            Arg::new("database")
                .long("database")
                .short('d')
                .help("Source database name"),
        )
        .arg(Arg::new("username").long("username").help("Source username"))
        .arg(
            Arg::new("password")
                .long("password")
                .env("MM_SOURCE_PASSWORD")
                .hide_env_values(true)
                .help("Source password"),
        )
        .arg(
            Arg::new("auth-database")
                .long("auth-database")
                .help("Authentication database"),
        )
}

fn cli() -> Command {
    Command::new("migration-mind")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Analyze a document database and migrate it to a relational target")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("backend-url")
                .long("backend-url")
                .global(true)
                .help("Backend base URL (overrides config and MM_BACKEND_URL)"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .short('u')
                .global(true)
                .env("MM_USER")
                .help("Authenticated user id owning the analysis session"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand_required(true)
        .subcommand(connection_args(
            Command::new("probe").about("Test the source connection and resolve its session"),
        ))
        .subcommand(connection_args(
            Command::new("analyze")
                .about("Run schema, relationship and risk discovery")
                .arg(
                    Arg::new("reanalyze")
                        .long("reanalyze")
                        .action(ArgAction::SetTrue)
                        .help("Run discovery again even when a saved analysis exists"),
                ),
        ))
        .subcommand(connection_args(
            Command::new("plan")
                .about("Generate the relational migration plan")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the plan as JSON"),
                ),
        ))
        .subcommand(connection_args(
            Command::new("migrate")
                .about("Configure the target database, start the migration and follow its progress")
                .arg(Arg::new("target-host").long("target-host").help("Target host"))
                .arg(
                    Arg::new("target-port")
                        .long("target-port")
                        .default_value("5432")
                        .value_parser(value_parser!(u16))
                        .help("Target port"),
                )
                .arg(
                    Arg::new("target-database")
                        .long("target-database")
                        .default_value("postgres")
                        .help("Target database"),
                )
                .arg(
                    Arg::new("target-username")
                        .long("target-username")
                        .help("Target username"),
                )
                .arg(
                    Arg::new("target-password")
                        .long("target-password")
                        .env("MM_TARGET_PASSWORD")
                        .hide_env_values(true)
                        .help("Target password"),
                )
                .arg(
                    Arg::new("reconfigure")
                        .long("reconfigure")
                        .action(ArgAction::SetTrue)
                        .help("Replace the saved target credentials"),
                ),
        ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    logging::init_tracing(matches.get_flag("log-json"));

    let mut config = AppConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    if let Some(url) = matches.get_one::<String>("backend-url") {
        config.backend.base_url.clone_from(url);
    }
    tracing::debug!(backend = %config.backend.base_url, "configuration loaded");

    let ctx = CliContext {
        backend: Arc::new(HttpBackend::new(&config.backend)?),
        orchestrator: config.orchestrator,
        user: matches.get_one::<String>("user").map(|u| UserId::new(u.as_str())),
    };

    match matches.subcommand() {
        Some(("probe", args)) => commands::probe(&ctx, args).await,
        Some(("analyze", args)) => commands::analyze(&ctx, args).await,
        Some(("plan", args)) => commands::plan(&ctx, args).await,
        Some(("migrate", args)) => commands::migrate(&ctx, args).await,
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}
