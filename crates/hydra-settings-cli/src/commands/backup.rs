use hydra_settings::backup::{DownloadSettingsBackup, ResolvedDownloadSettings};
use hydra_settings::SettingsEngine;

use crate::cli::{DestinationArg, LongPressActionArg};
use crate::commands::common::{describe_scope, scope_for};
use crate::error::CliError;

pub fn run_backup_show(engine: &SettingsEngine, user: Option<&str>) -> Result<(), CliError> {
    let scope = scope_for(engine, user)?;
    match engine.backups().get(&scope)? {
        Some(backup) => println!("{}", serde_json::to_string_pretty(&backup)?),
        None => println!("No download settings backup for {}.", describe_scope(&scope)),
    }
    Ok(())
}

pub fn run_backup_set(
    engine: &SettingsEngine,
    action: Option<LongPressActionArg>,
    destination: Option<DestinationArg>,
    folder: Option<String>,
    user: Option<&str>,
) -> Result<(), CliError> {
    let scope = scope_for(engine, user)?;
    let backup = DownloadSettingsBackup {
        long_press_action: action.map(Into::into),
        download_destination: destination.map(Into::into),
        files_root_uri: folder,
    };
    engine.backups().set(&scope, backup)?;
    println!("Updated download settings backup for {}", describe_scope(&scope));
    Ok(())
}

pub fn restore_backup(
    engine: &SettingsEngine,
    user: Option<&str>,
) -> Result<ResolvedDownloadSettings, CliError> {
    let scope = scope_for(engine, user)?;
    Ok(engine.backups().restore_if_needed(engine.settings(), &scope)?)
}

pub fn run_backup_restore(engine: &SettingsEngine, user: Option<&str>) -> Result<(), CliError> {
    let resolved = restore_backup(engine, user)?;
    println!("downloadLongPressAction  {}", resolved.long_press_action.as_str());
    println!("downloadDestination      {}", resolved.download_destination.as_str());
    println!(
        "downloadFilesRootUri     {}",
        resolved.files_root_uri.as_deref().unwrap_or("(none)")
    );
    Ok(())
}
