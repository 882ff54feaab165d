use hydra_settings::models::CURRENT_USER_KEY;
use hydra_settings::store::KeyValueStore;
use hydra_settings::sync::SyncOutcome;
use hydra_settings::SettingsEngine;

use crate::commands::common::{describe_scope, normalize_username};
use crate::error::CliError;

pub fn run_whoami(engine: &SettingsEngine) -> Result<(), CliError> {
    println!("{}", describe_account(engine)?);
    Ok(())
}

pub fn describe_account(engine: &SettingsEngine) -> Result<String, CliError> {
    let username = engine.store().get_string(CURRENT_USER_KEY)?;
    let scope = engine.active_scope()?;
    Ok(match username {
        Some(username) if !scope.is_guest() => format!("{username} (scope {scope})"),
        _ => "Not logged in (guest settings)".to_string(),
    })
}

pub fn run_login(engine: &SettingsEngine, username: &str) -> Result<SyncOutcome, CliError> {
    let username = normalize_username(username)?;
    let outcome = engine.activate_account(Some(&username))?;
    println!(
        "Logged in as {} (sync: {outcome})",
        describe_scope(&engine.active_scope()?)
    );
    Ok(outcome)
}

pub fn run_logout(engine: &SettingsEngine) -> Result<(), CliError> {
    engine.activate_account(None)?;
    println!("Logged out; using guest settings");
    Ok(())
}
