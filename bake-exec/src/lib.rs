//! Change detection and shell invocation: component F of the design.

mod plan;
mod shell;

pub use plan::{decide_prune, decide_run, Decision, TaskSpec};
pub use shell::{run_shell, ShellOutcome};

use std::path::Path as FsPath;

use bake_diagnostic::{Category, Diagnostic};

/// Recursively removes `creates`. Used both by the `prune` subcommand's real
/// removal and by prune-on-rename when a task's `creates` changed.
pub fn remove_creates(creates: &str) -> Result<(), Diagnostic> {
    let path = FsPath::new(creates);
    if !path.exists() {
        return Ok(());
    }
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| {
        Diagnostic::error(Category::Execution, format!("failed to remove {creates}")).with_detail(e.to_string())
    })
}
