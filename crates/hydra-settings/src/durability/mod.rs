//! Local durability snapshots
//!
//! Mirrors every namespaced setting (all scopes) plus a small allow-list of
//! global keys into one JSON file so settings survive a reset or corrupted
//! key-value store. The file is a cache of the live store, never authoritative.

mod file;
mod snapshotter;

pub use file::SnapshotFile;
pub use snapshotter::SettingsSnapshotter;
