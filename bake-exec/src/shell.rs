use std::collections::BTreeMap;

use bake_diagnostic::{Category, Diagnostic};
use tokio::process::Command;

pub struct ShellOutcome {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

/// Spawns the user's login shell (`$SHELL`, default `bash`) with `-c` and the
/// script `set -euo pipefail\n\n<command>`. The subprocess inherits the
/// current process environment, overridden by `env`.
pub async fn run_shell(command: &str, env: &BTreeMap<String, String>) -> Result<ShellOutcome, Diagnostic> {
    let shell = std::env::var("SHELL").unwrap_or_else(|_| "bash".to_string());
    let script = format!("set -euo pipefail\n\n{command}");

    let output = Command::new(&shell)
        .arg("-c")
        .arg(&script)
        .envs(env)
        .output()
        .await
        .map_err(|e| {
            Diagnostic::error(Category::Execution, format!("failed to spawn {shell}")).with_detail(e.to_string())
        })?;

    Ok(ShellOutcome {
        exit_code: output.status.code().unwrap_or(-1) as i64,
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_of_a_successful_command() {
        let outcome = run_shell("echo hello", &BTreeMap::new()).await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, "hello");
    }

    #[tokio::test]
    async fn reports_non_zero_exit_code() {
        let outcome = run_shell("exit 7", &BTreeMap::new()).await.unwrap();
        assert_eq!(outcome.exit_code, 7);
    }

    #[tokio::test]
    async fn task_env_overrides_process_env() {
        let mut env = BTreeMap::new();
        env.insert("BAKE_TEST_VAR".to_string(), "from-task".to_string());
        let outcome = run_shell("echo $BAKE_TEST_VAR", &env).await.unwrap();
        assert_eq!(outcome.stdout, "from-task");
    }
}
