use hydra_settings::models::LocalSnapshot;
use hydra_settings::SettingsEngine;

use crate::error::CliError;

pub async fn run_snapshot_save(engine: &SettingsEngine) -> Result<(), CliError> {
    let snapshotter = engine.snapshotter();
    let path = snapshotter.file().path().display().to_string();
    if !snapshotter.save_now().await {
        return Err(CliError::SnapshotWriteFailed(path));
    }
    println!("{path}");
    Ok(())
}

pub async fn run_snapshot_restore(engine: &SettingsEngine) -> Result<(), CliError> {
    let snapshotter = engine.snapshotter();
    let restored = snapshotter.restore().await;
    println!(
        "Restored {restored} settings from {}",
        snapshotter.file().path().display()
    );
    Ok(())
}

/// The snapshot currently on disk, if it exists and parses.
pub async fn read_snapshot(engine: &SettingsEngine) -> Result<Option<LocalSnapshot>, CliError> {
    let file = engine.snapshotter().file();
    if !file.exists().await {
        return Ok(None);
    }
    let raw = file.read_text().await?;
    Ok(LocalSnapshot::parse(&raw))
}

pub async fn run_snapshot_show(engine: &SettingsEngine) -> Result<(), CliError> {
    match read_snapshot(engine).await? {
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        None => println!(
            "No readable snapshot at {}",
            engine.snapshotter().file().path().display()
        ),
    }
    Ok(())
}
