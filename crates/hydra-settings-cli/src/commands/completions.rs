use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::{Cli, CompletionShell};
use crate::error::CliError;

const BIN_NAME: &str = "hydra-settings";

/// Completion script for `shell`, naming the installed binary.
pub fn render_completions(shell: CompletionShell) -> Vec<u8> {
    let mut script = Vec::new();
    clap_complete::generate(Shell::from(shell), &mut Cli::command(), BIN_NAME, &mut script);
    script
}

/// Print the script, or write it to `output_path`, creating its directory.
pub fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let script = render_completions(shell);
    let Some(path) = output_path else {
        io::stdout().write_all(&script)?;
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &script)?;
    eprintln!("Wrote {shell:?} completions to {}", path.display());
    Ok(())
}
