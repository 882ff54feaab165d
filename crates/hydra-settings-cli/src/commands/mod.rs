pub mod account;
pub mod backup;
pub mod common;
pub mod completions;
pub mod settings;
pub mod snapshot;
pub mod sync;
