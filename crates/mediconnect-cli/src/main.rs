//! MediConnect CLI - a command-line client for the MediConnect
//! appointment-booking API.
//!
//! Sessions persist between runs; expired access tokens are refreshed
//! transparently and an unrecoverable session sends you back to `login`.

mod commands;
mod prompt;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mediconnect_core::config::BASE_URL_ENV;
use mediconnect_core::routes::LOGIN_PATH;
use mediconnect_core::{ApiClient, ApiError, Config, HttpTransport, NavigationCommand, Navigator, SessionContext};

use commands::{Cli, Command, Context};

/// Initialize the tracing subscriber for logging.
/// Returns the guard that flushes the log file, if one is written.
fn init_tracing(log_dir: Option<std::path::PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mediconnect.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Report redirects issued while the command ran.
///
/// A session that ended without a redirect (e.g. a 401 with nothing stored
/// to refresh) still gets the login hint when `hint_login` is set.
fn report_navigation(rx: &mut UnboundedReceiver<NavigationCommand>, result: &Result<()>, hint_login: bool) {
    let mut hinted = false;
    while let Ok(NavigationCommand::Redirect { to }) = rx.try_recv() {
        if to == LOGIN_PATH {
            if !hinted {
                eprintln!("Your session has expired. Please run `mediconnect login` again.");
                hinted = true;
            }
        } else {
            eprintln!("Redirected to {}", to);
        }
    }

    if hint_login && !hinted && result.as_ref().err().is_some_and(ends_session) {
        eprintln!("You are not signed in. Please run `mediconnect login`.");
    }
}

fn ends_session(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<ApiError>().is_some_and(ApiError::is_auth_failure))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let (config, config_error) = Config::load_or_default();

    let log_dir = if cli.log_file {
        Some(config.cache_dir()?.join("logs"))
    } else {
        None
    };
    let _guard = init_tracing(log_dir);
    info!("MediConnect CLI starting");
    if let Some(e) = config_error {
        warn!(error = %e, "Config unreadable, using defaults");
    }

    let base_url = config.api_base_url(std::env::var(BASE_URL_ENV).ok());
    let transport = HttpTransport::new(&base_url, config.request_timeout())?;
    let store = config.credential_store()?;
    let session = Arc::new(SessionContext::new(store));
    let (navigator, mut nav_rx) = Navigator::channel();
    let client = ApiClient::with_session(Arc::new(transport), session.clone(), navigator);

    let mut ctx = Context {
        config,
        client,
        session,
    };
    // A rejected password is not a lost session
    let hint_login = !matches!(cli.command, Command::Login { .. } | Command::Register);
    let result = commands::run(cli.command, &mut ctx).await;

    report_navigation(&mut nav_rx, &result, hint_login);
    result
}
