use hydra_settings::{SettingValue, SettingsEngine};

use crate::cli::ValueTypeArg;
use crate::commands::common::{
    describe_scope, format_setting_lines, normalize_setting_key, parse_setting_value, scope_for,
    SettingListItem,
};
use crate::error::CliError;

pub fn get_setting(
    engine: &SettingsEngine,
    key: &str,
    user: Option<&str>,
) -> Result<Option<SettingValue>, CliError> {
    let key = normalize_setting_key(key)?;
    let scope = scope_for(engine, user)?;
    Ok(engine.settings().read(&key, Some(&scope))?)
}

pub fn run_get(
    engine: &SettingsEngine,
    key: &str,
    user: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let value = get_setting(engine, key, user)?;
    match (value, as_json) {
        (Some(value), true) => println!("{}", serde_json::to_string_pretty(&value)?),
        (Some(value), false) => println!("{value}"),
        (None, true) => println!("null"),
        (None, false) => println!("{} is not set", key.trim()),
    }
    Ok(())
}

pub fn run_set(
    engine: &SettingsEngine,
    key: &str,
    raw: &str,
    value_type: ValueTypeArg,
    user: Option<&str>,
) -> Result<(), CliError> {
    let key = normalize_setting_key(key)?;
    let value = parse_setting_value(value_type, raw)?;
    let scope = scope_for(engine, user)?;
    engine.settings().write(&key, value.clone(), Some(&scope))?;
    println!("{key} = {value} ({})", describe_scope(&scope));
    Ok(())
}

pub fn run_delete(engine: &SettingsEngine, key: &str, user: Option<&str>) -> Result<(), CliError> {
    let key = normalize_setting_key(key)?;
    let scope = scope_for(engine, user)?;
    engine.settings().delete(&key, Some(&scope))?;
    println!("Deleted {key} ({})", describe_scope(&scope));
    Ok(())
}

pub fn run_list(engine: &SettingsEngine, user: Option<&str>, as_json: bool) -> Result<(), CliError> {
    let scope = scope_for(engine, user)?;
    let entries = engine.settings().list(&scope)?;

    if as_json {
        let items = entries
            .into_iter()
            .map(|(key, value)| SettingListItem { key, value })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No settings stored for {}.", describe_scope(&scope));
        return Ok(());
    }

    for line in format_setting_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}
