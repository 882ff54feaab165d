//! Hydra settings CLI - inspect and exercise the settings engine from a terminal
//!
//! Every invocation behaves like an app launch: the durability snapshot is
//! restored, the active account is reconciled with the cloud store, and any
//! pending save or push is flushed before exit.

mod cli;
mod commands;
mod error;
mod paths;
mod secure_store;


use clap::{CommandFactory, Parser};
use hydra_settings::SettingsEngine;
use tracing_subscriber::EnvFilter;

use crate::cli::{BackupCommands, Cli, CloudCommands, Commands, SnapshotCommands};
use crate::commands::account::{run_login, run_logout, run_whoami};
use crate::commands::backup::{run_backup_restore, run_backup_set, run_backup_show};
use crate::commands::common::open_engine;
use crate::commands::completions::run_completions;
use crate::commands::settings::{run_delete, run_get, run_list, run_set};
use crate::commands::snapshot::{run_snapshot_restore, run_snapshot_save, run_snapshot_show};
use crate::commands::sync::{run_cloud_list, run_cloud_show, run_sync};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hydra_settings=info")),
        )
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help().map_err(CliError::Io)?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let engine = open_engine(&cli.locations)?;
    engine.start().await;
    let result = dispatch(&engine, command).await;

    let report = engine.flush().await;
    tracing::debug!(
        "Flushed settings (snapshot saved: {}, scopes pushed: {})",
        report.snapshot_saved,
        report.scopes_pushed
    );
    engine.stop();
    result
}

async fn dispatch(engine: &SettingsEngine, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Whoami => run_whoami(engine)?,
        Commands::Login { username } => {
            run_login(engine, &username)?;
        }
        Commands::Logout => run_logout(engine)?,
        Commands::Get { key, user, json } => run_get(engine, &key, user.as_deref(), json)?,
        Commands::Set {
            key,
            value,
            value_type,
            user,
        } => run_set(engine, &key, &value, value_type, user.as_deref())?,
        Commands::Delete { key, user } => run_delete(engine, &key, user.as_deref())?,
        Commands::List { user, json } => run_list(engine, user.as_deref(), json)?,
        Commands::Snapshot { command } => match command {
            SnapshotCommands::Save => run_snapshot_save(engine).await?,
            SnapshotCommands::Restore => run_snapshot_restore(engine).await?,
            SnapshotCommands::Show => run_snapshot_show(engine).await?,
        },
        Commands::Sync { user } => {
            run_sync(engine, user.as_deref())?;
        }
        Commands::Cloud { command } => match command {
            CloudCommands::Show { user } => run_cloud_show(engine, user.as_deref())?,
            CloudCommands::List => run_cloud_list(engine)?,
        },
        Commands::Backup { command } => match command {
            BackupCommands::Show { user } => run_backup_show(engine, user.as_deref())?,
            BackupCommands::Set {
                action,
                destination,
                folder,
                user,
            } => run_backup_set(engine, action, destination, folder, user.as_deref())?,
            BackupCommands::Restore { user } => run_backup_restore(engine, user.as_deref())?,
        },
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }
    Ok(())
}
