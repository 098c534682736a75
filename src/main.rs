//! # Employee Workflow CLI
//!
//! Runs the employee approval workflow in-process and shows what it publishes.
//!
//! ## Usage
//!
//! ```bash
//! # Replay the built-in approval walk
//! ewf run
//!
//! # Replay a scenario against persistent storage
//! ewf run demos/approval-walk.yaml --storage rocksdb
//!
//! # Show the lifecycle transitions
//! ewf transitions
//! ```
//!
//! Logs go to stderr and honour `RUST_LOG` (default `info`).

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use employee_workflow::{
    AppConfig, AppContext,
    actor::{Guardian, GuardianMessage},
    adapter::storage::StorageType,
    cli::{Cli, Commands, Scenario},
    domain::{constant::guardian, error::WorkflowError},
    service::EmployeeService,
    ui::display
};
use tracing::{Level, event};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), WorkflowError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Transitions => {
            println!("{}", display::transition_table());
            Ok(())
        }
        Commands::Run { scenario, storage, settle_ms } => {
            run(cli.config, scenario, storage, Duration::from_millis(settle_ms)).await
        }
    }
}

async fn run(
    config_path: Option<PathBuf>,
    scenario_path: Option<PathBuf>,
    storage: Option<StorageType>,
    settle: Duration
) -> Result<(), WorkflowError> {
    let mut config = AppConfig::load(config_path.as_deref())?;
    if let Some(storage) = storage {
        config.storage_type = storage;
    }

    let scenario = match scenario_path.as_deref() {
        Some(path) => Scenario::load(path)?,
        None => Scenario::approval_walk()?
    };

    let step_timeout = config.call_timeout();
    let app_context = Arc::new(AppContext::init(config).await?);
    let service = EmployeeService::new(&app_context);
    let guardian_ref = Guardian::spawn_system(app_context).await?;

    let result = scenario.run(&service, settle, step_timeout).await;

    if let Ok(health) = Guardian::health(&guardian_ref).await {
        event!(Level::INFO, event = guardian::HEALTH_CHECK_COMPLETED,
               requests_routed = %health.requests_routed, uptime_seconds = %health.uptime_seconds);
    }

    if let Err(e) = guardian_ref.cast(GuardianMessage::Shutdown) {
        eprintln!("Failed to shut down actor system: {:?}", e);
    }

    tokio::time::sleep(Duration::from_millis(100)).await;

    let outcomes = result?;
    display::show_outcomes(&scenario.name, &outcomes);
    Ok(())
}
