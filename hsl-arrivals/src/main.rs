use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};
use futures::future::join_all;
use hsl_arrivals::cache::CacheConfig;
use hsl_arrivals::coordinator::{
    ArrivalCoordinator, CoordinatorConfig, RefreshOutcome, spawn_polling,
};
use hsl_arrivals::digitransit::{
    DEFAULT_BASE_URL, DigitransitClient, DigitransitConfig, DigitransitError,
};
use hsl_arrivals::directory::TransitDirectory;
use hsl_arrivals::domain::ApiKey;
use hsl_arrivals::entries::{EntryStore, FileEntryStore, StoreError};
use hsl_arrivals::sensor::RouteSensor;
use hsl_arrivals::web::{AppState, create_router};
use hsl_arrivals::wizard::{AbortReason, FlowStep, ResolutionWizard, StepId, WizardError};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Subscribe to HSL stop arrivals and serve them as sensors.
#[derive(Debug, Parser)]
#[command(name = "hsl-arrivals", version)]
struct Cli {
    /// JSON file holding the configured subscriptions
    #[arg(long, env = "HSL_ENTRIES", default_value = "hsl-entries.json", global = true)]
    entries: PathBuf,

    /// Digitransit GraphQL endpoint
    #[arg(long, env = "DIGITRANSIT_URL", default_value = DEFAULT_BASE_URL, global = true)]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add a subscription interactively
    Setup {
        /// Digitransit subscription key; prompted for when absent
        #[arg(long, env = "DIGITRANSIT_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// List configured subscriptions
    List,

    /// Poll arrivals for every subscription and serve them over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, env = "HSL_BIND", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,

        /// Seconds between refreshes
        #[arg(long, env = "HSL_UPDATE_SECS", default_value_t = 30)]
        update_secs: u64,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Digitransit(#[from] DigitransitError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("setup aborted ({}): {}", .0.code(), .0)]
    Aborted(AbortReason),

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Map a dialoguer failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Prompt(e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Setup { api_key } => setup(&cli.entries, &cli.url, api_key).await,
        Command::List => list(&cli.entries).await,
        Command::Serve { bind, update_secs } => {
            serve(&cli.entries, &cli.url, bind, Duration::from_secs(update_secs)).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn directory(url: &str) -> Result<Arc<TransitDirectory<DigitransitClient>>, CliError> {
    let client = DigitransitClient::new(DigitransitConfig::new(url))?;
    Ok(Arc::new(
        TransitDirectory::new(client).with_cache(&CacheConfig::default()),
    ))
}

async fn setup(entries: &Path, url: &str, api_key: Option<String>) -> Result<(), CliError> {
    let store = Arc::new(FileEntryStore::open(entries)?);
    let mut wizard = ResolutionWizard::new(directory(url)?, store);

    eprintln!("HSL arrivals setup");
    eprintln!("   Entries: {}\n", entries.display());

    // A blank key from the environment is the same as no key
    let known_key = api_key.as_deref().and_then(|k| ApiKey::parse(k).ok());
    let mut step = wizard.start(known_key)?;

    loop {
        let form = match step {
            FlowStep::Form(form) => form,
            FlowStep::Abort(reason) => return Err(CliError::Aborted(reason)),
            FlowStep::CreateEntry(entry) => {
                println!("Added {}", entry.title);
                println!("   id: {}", entry.unique_id());
                return Ok(());
            }
        };

        if let Some(e) = form.error {
            eprintln!("✗ {e}");
        }

        step = match form.step {
            StepId::ApiKey => {
                let input = prompt_text("Digitransit API key")?;
                wizard.submit_api_key(&input)?
            }
            StepId::StopQuery => {
                let input = prompt_text("Stop name or GTFS id (e.g. HSL:1303298)")?;
                wizard.submit_stop_query(&input).await?
            }
            StepId::PickStop => {
                let choice = prompt_choice("Stop", &form.options)?;
                wizard.choose_stop(&choice).await?
            }
            StepId::PickRoute => {
                let choice = prompt_choice("Route", &form.options)?;
                wizard.choose_route(&choice).await?
            }
            StepId::PickDestination => {
                let choice = prompt_choice("Destination", &form.options)?;
                wizard.choose_destination(&choice).await?
            }
        };
    }
}

fn prompt_text(prompt: &str) -> Result<String, CliError> {
    Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)
}

fn prompt_choice(prompt: &str, options: &[String]) -> Result<String, CliError> {
    let index = Select::new()
        .with_prompt(prompt)
        .items(options)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    options
        .get(index)
        .cloned()
        .ok_or_else(|| CliError::Prompt(format!("selection {index} out of range")))
}

async fn list(entries: &Path) -> Result<(), CliError> {
    let store = FileEntryStore::open(entries)?;
    let entries = store.entries().await;

    if entries.is_empty() {
        println!("No subscriptions in {}", store.path().display());
        return Ok(());
    }

    for entry in entries {
        println!("{}\t{}", entry.unique_id(), entry.title);
    }
    Ok(())
}

async fn serve(
    entries: &Path,
    url: &str,
    bind: SocketAddr,
    interval: Duration,
) -> Result<(), CliError> {
    let store = FileEntryStore::open(entries)?;
    let directory = directory(url)?;
    let config = CoordinatorConfig::default().with_update_interval(interval);

    let coordinators: Vec<Arc<ArrivalCoordinator<DigitransitClient>>> = store
        .entries()
        .await
        .into_iter()
        .map(|entry| {
            Arc::new(ArrivalCoordinator::new(
                directory.clone(),
                entry,
                config.clone(),
            ))
        })
        .collect();

    if coordinators.is_empty() {
        warn!(path = %store.path().display(), "No subscriptions configured; run `setup` first");
    }

    // Initial refresh before serving, like a first poll
    let outcomes = join_all(coordinators.iter().map(|c| c.refresh())).await;
    for (coordinator, outcome) in coordinators.iter().zip(outcomes) {
        match outcome {
            RefreshOutcome::Updated { arrivals } => {
                info!(title = %coordinator.entry().title, arrivals, "Loaded arrivals")
            }
            RefreshOutcome::Failed | RefreshOutcome::Skipped => {
                warn!(title = %coordinator.entry().title, "Initial refresh failed, will retry")
            }
        }
    }

    for coordinator in &coordinators {
        spawn_polling(coordinator.clone());
    }

    let sensors = coordinators
        .into_iter()
        .map(|c| Arc::new(RouteSensor::new(c)))
        .collect();
    let app = create_router(AppState::new(sensors));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %bind, "Serving sensors");
    info!("  GET  /health              - Health check");
    info!("  GET  /sensors             - All sensors");
    info!("  GET  /sensors/<unique_id> - One sensor");

    axum::serve(listener, app).await?;
    Ok(())
}
