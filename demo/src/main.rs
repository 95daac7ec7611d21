//! portcullis — admin console authorization CLI
//!
//! Drives an `AuthzSession` the way the console's router does: log in, load
//! the admin's grants, and answer permission and navigation questions. The
//! session persists in the configured store file between invocations.
//!
//! Usage:
//!   portcullis login --username ops --password ops-pass
//!   portcullis whoami
//!   portcullis check GET:/admin/users/42
//!   portcullis navigate /orders
//!   portcullis routes
//!   portcullis logout

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use portcullis_console::{ConsoleConfig, NavigationGuard, RouteTable};
use portcullis_contracts::{
    error::PortcullisResult,
    identity::LoginRequest,
    session::SessionPhase,
};
use portcullis_core::AuthzSession;

// ── CLI definition ────────────────────────────────────────────────────────────

/// portcullis — permission-gated admin console session.
#[derive(Parser)]
#[command(
    name = "portcullis",
    about = "Admin console authorization session",
    long_about = "Logs an admin in, caches their granted policies and answers\n\
                  permission checks and guarded navigations against them."
)]
struct Cli {
    /// Console configuration file.
    #[arg(long, short, default_value = "config/portcullis.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and load the admin's authorization.
    Login {
        #[arg(long, short)]
        username: String,
        #[arg(long, short)]
        password: String,
    },
    /// Forget the token and all cached authorization.
    Logout,
    /// Show the session phase, roles and granted permission keys.
    Whoami,
    /// Check one permission key, e.g. `GET:/admin/orders`.
    Check { permission: String },
    /// Run the navigation guard for a console path, e.g. `/users/42`.
    Navigate { path: String },
    /// List the console routes the current admin may enter.
    Routes,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Execute one command and return the process exit code.
async fn run(cli: Cli) -> PortcullisResult<i32> {
    let config = ConsoleConfig::from_file(&cli.config)?;
    let session = config.open_session()?;
    debug!(session_id = %session.id(), phase = %session.phase(), "session opened");

    match cli.command {
        Command::Login { username, password } => {
            let response = session.login(&LoginRequest::new(username, password)).await?;
            println!("logged in as {} (id {})", response.user.username, response.user.id);
            if !response.expires_at.is_empty() {
                println!("token expires at {}", response.expires_at);
            }
            print_session(&session);
            Ok(0)
        }
        Command::Logout => {
            session.logout();
            println!("logged out");
            Ok(0)
        }
        Command::Whoami => {
            ensure_loaded(&session).await?;
            print_session(&session);
            Ok(0)
        }
        Command::Check { permission } => {
            ensure_loaded(&session).await?;
            let permitted = session.has_permission(Some(&permission));
            println!("{}: {}", permission, if permitted { "allowed" } else { "denied" });
            Ok(if permitted { 0 } else { 2 })
        }
        Command::Navigate { path } => {
            let routes = RouteTable::admin_console();
            let outcome = NavigationGuard::new(&session, &routes).before_each(&path).await;
            println!("{}: {}", path, outcome);
            Ok(0)
        }
        Command::Routes => {
            ensure_loaded(&session).await?;
            let routes = RouteTable::admin_console();
            for route in routes.accessible(&session) {
                println!(
                    "{:<20} {:<24} {}",
                    route.path,
                    route.name,
                    route.permission.as_deref().unwrap_or("-")
                );
            }
            Ok(0)
        }
    }
}

/// Refresh authorization for a hydrated session. A failed refresh ends
/// the session, as the console router does.
async fn ensure_loaded(session: &AuthzSession) -> PortcullisResult<()> {
    if session.phase() != SessionPhase::AuthenticatedUnloaded {
        return Ok(());
    }
    match session.load_authz().await {
        Ok(outcome) => {
            debug!(?outcome, "authorization refreshed");
            Ok(())
        }
        Err(e) => {
            session.logout();
            Err(e)
        }
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_session(session: &AuthzSession) {
    let snapshot = session.snapshot();
    println!("phase:    {}", session.phase());
    println!("super:    {}", snapshot.is_super);
    println!(
        "roles:    {}",
        snapshot.roles.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    println!("grants:");
    for key in &snapshot.permission_keys {
        println!("  {}", key);
    }
}
