use hydra_settings::sync::SyncOutcome;
use hydra_settings::SettingsEngine;

use crate::commands::common::{
    describe_scope, format_setting_lines, format_sync_timestamp, normalize_username, scope_for,
};
use crate::error::CliError;

pub fn run_sync(engine: &SettingsEngine, user: Option<&str>) -> Result<SyncOutcome, CliError> {
    if !engine.sync().is_available() {
        return Err(CliError::CloudUnavailable);
    }

    let outcome = match user {
        Some(user) => engine
            .sync()
            .sync_for_user(Some(&normalize_username(user)?)),
        None => engine.sync_current_user(),
    };
    let scope = scope_for(engine, user)?;
    println!("Sync {} for {}", outcome, describe_scope(&scope));
    Ok(outcome)
}

pub fn run_cloud_show(engine: &SettingsEngine, user: Option<&str>) -> Result<(), CliError> {
    if !engine.sync().is_available() {
        return Err(CliError::CloudUnavailable);
    }

    let scope = scope_for(engine, user)?;
    if scope.is_guest() {
        println!("Guest settings are never synced to the cloud.");
        return Ok(());
    }
    let Some(record) = engine.sync().read_remote(&scope)? else {
        println!("No cloud record for {}.", describe_scope(&scope));
        return Ok(());
    };

    println!(
        "{}  updated {}",
        describe_scope(&scope),
        format_sync_timestamp(record.updated_at)
    );
    let entries = record.values.into_iter().collect::<Vec<_>>();
    for line in format_setting_lines(&entries) {
        println!("  {line}");
    }
    Ok(())
}

pub fn run_cloud_list(engine: &SettingsEngine) -> Result<(), CliError> {
    if !engine.sync().is_available() {
        return Err(CliError::CloudUnavailable);
    }

    let scopes = engine.sync().remote_scopes()?;
    if scopes.is_empty() {
        println!("No cloud records.");
        return Ok(());
    }
    for scope in scopes {
        println!("{scope}");
    }
    Ok(())
}
