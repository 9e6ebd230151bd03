//! # formwork-console
//!
//! Command-line host for the login and register forms.
//!
//! ## Session
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. Initialize Logging                                                 │
//! │     • tracing-subscriber with env filter                               │
//! │     • Default: info,formwork=debug,sqlx=warn; RUST_LOG overrides       │
//! │                                                                         │
//! │  2. Load Config                                                        │
//! │     • formwork.toml, then FORMWORK_* environment overrides             │
//! │                                                                         │
//! │  3. Open Database                                                      │
//! │     • SQLite file in the app data directory, or in memory              │
//! │     • Migrations run on connect                                        │
//! │                                                                         │
//! │  4. Mount Form                                                         │
//! │     • ErrorBoundary<LoginForm> or ErrorBoundary<RegisterForm>          │
//! │     • Cache, storage and fetch workers spawned                         │
//! │                                                                         │
//! │  5. Submit and Render                                                  │
//! │     • Child view: response records printed as JSON                     │
//! │     • Fallback: error printed, boundary reset, restored state printed  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod components;
pub mod config;
pub mod error;
pub mod state;

// =============================================================================
// Imports
// =============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use formwork_core::{ActiveInput, AppError, LoginState, RegisterState};
use formwork_store::{Database, DbConfig};
use formwork_workers::ReqwestClient;

use components::{
    BoundaryView, ErrorBoundary, FormComponent, FormModel, FormServices, RegisterForm,
};
use config::ConsoleConfig;
use error::{ConsoleError, ConsoleResult};

// =============================================================================
// Command Line
// =============================================================================

/// Submit credentials through a login or register form.
#[derive(Parser, Debug)]
#[command(name = "formwork-console", version)]
pub struct Cli {
    /// Config file to use instead of the platform default
    #[arg(short, long, env = "FORMWORK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keep stored values in memory only
    #[arg(long)]
    pub in_memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit the login form
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "FORMWORK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Validate and submit the register form
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "FORMWORK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Write the effective configuration to the config file
    InitConfig,
}

// =============================================================================
// Entry Point
// =============================================================================

/// Parses the command line and runs one session.
pub fn run() -> ConsoleResult<()> {
    init_tracing();

    let cli = Cli::parse();
    info!("Starting formwork console");

    let mut config = ConsoleConfig::load(cli.config.clone())?;
    if cli.in_memory {
        config.storage.in_memory = true;
    }

    if let Command::InitConfig = cli.command {
        return config.save(cli.config);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(session(config, cli.command))
}

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info,formwork=debug,sqlx=warn";

/// Initializes the tracing subscriber for logging.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

async fn session(config: ConsoleConfig, command: Command) -> ConsoleResult<()> {
    let db_config = match config.database_path()? {
        Some(path) => {
            info!(?path, "Database path determined");
            DbConfig::new(path)
        }
        None => DbConfig::in_memory(),
    };
    let db = Database::new(db_config).await?;

    let services = Arc::new(FormServices::new(
        config.workers.clone(),
        Arc::new(db.kv()),
        Arc::new(ReqwestClient::new()?),
        config.endpoints.clone(),
    ));

    let outcome = match command {
        Command::Login { username, password } => {
            submit_form(LoginState::default(), services, username, password, |_| {}).await
        }
        Command::Register { username, password } => {
            submit_form(
                RegisterState::default(),
                services,
                username,
                password,
                |form: &mut RegisterForm| form.set_last_active_input(ActiveInput::Password),
            )
            .await
        }
        Command::InitConfig => Ok(()),
    };

    db.close().await;
    outcome
}

/// Mounts `S` under an error boundary, submits once and prints the result.
async fn submit_form<S, F>(
    initial: S,
    services: Arc<FormServices>,
    username: String,
    password: String,
    prepare: F,
) -> ConsoleResult<()>
where
    S: FormModel,
    F: FnOnce(&mut FormComponent<S>),
{
    let mut boundary = ErrorBoundary::<FormComponent<S>>::mount(initial, services)?;
    let outcome = drive(&mut boundary, username, password, prepare).await;
    boundary.unmount();
    outcome
}

async fn drive<S, F>(
    boundary: &mut ErrorBoundary<FormComponent<S>>,
    username: String,
    password: String,
    prepare: F,
) -> ConsoleResult<()>
where
    S: FormModel,
    F: FnOnce(&mut FormComponent<S>),
{
    let form = boundary
        .child_mut()
        .ok_or_else(|| AppError::invariant("Form is not mounted"))?;

    form.set_username(username);
    form.set_password(password);
    prepare(form);

    form.submit().map_err(AppError::from)?;
    if form.settle().await.is_none() {
        warn!(form = S::NAME, "Workers stopped before the submission completed");
    }

    match boundary.render() {
        BoundaryView::Child(state) => {
            print_json(&state)?;
            Ok(())
        }
        BoundaryView::Fallback(err) => {
            println!("{} failed: {}", S::NAME, err);
            boundary.reset();
            if let BoundaryView::Child(restored) = boundary.render() {
                print_json(&restored)?;
            }
            Err(ConsoleError::App(err))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> ConsoleResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
