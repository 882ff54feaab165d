//! Services shared by every client of the settings engine.

mod engine;

pub use engine::{EnginePaths, FlushReport, SettingsEngine, StartReport};
