//! Operator CLI for a local circlecast graph database.
//!
//! # Responsibility
//! - Load settings, start logging and open the configured database.
//! - Expose maintenance commands that have no request/response surface.

use circlecast_core::repo::graph_repo::SqliteGraphRepository;
use circlecast_core::{
    core_version, init_from_settings, open_db, AdminService, SessionService, Settings,
};
use clap::{Parser, Subcommand};
use log::error;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "circlecast")]
#[command(about = "Maintenance tool for the circlecast social graph", long_about = None)]
struct Cli {
    /// TOML settings file (defaults to ./circlecast.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the configured path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or migrate the database and ensure the PublicDomain exists
    Init,
    /// Delete every node and relationship, then re-initialize
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
    /// Delete expired session tokens
    PurgeSessions,
    /// Print core liveness and version
    Ping,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Command::Ping = cli.command {
        println!("circlecast_core ping={}", circlecast_core::ping());
        println!("circlecast_core version={}", core_version());
        return Ok(());
    }

    let settings = match cli.config.as_deref() {
        Some(path) => Settings::from_file(path)?,
        None => Settings::new()?,
    };
    init_from_settings(&settings.logging)?;

    let db_path = cli.db.unwrap_or_else(|| settings.database.path.clone());
    let conn = open_db(&db_path)?;
    let store = SqliteGraphRepository::try_new(&conn)?;

    match cli.command {
        Command::Init => {
            let domain = AdminService::new(store).initialize_graph()?;
            println!(
                "initialized {} (public domain since {})",
                db_path.display(),
                domain.created_at
            );
        }
        Command::Reset { yes } => {
            if !yes {
                return Err("refusing to reset without --yes".into());
            }
            AdminService::new(store).reset_graph()?;
            println!("reset {}", db_path.display());
        }
        Command::PurgeSessions => {
            let removed = SessionService::new(store, settings.policy()).purge_expired()?;
            println!("purged {removed} expired session(s)");
        }
        Command::Ping => {}
    }
    Ok(())
}
