use std::path::Path as FsPath;
use std::time::SystemTime;

use bake_diagnostic::{Category, Diagnostic};
use bake_lock::Hash;

/// The facts a dry-run/dry-prune decision needs about one task instance.
pub struct TaskSpec<'a> {
    pub command: &'a str,
    pub creates: &'a str,
    pub sources: &'a [String],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Run(String),
    Skip(String),
}

impl Decision {
    pub fn should_run(&self) -> bool {
        matches!(self, Decision::Run(_))
    }

    pub fn reason(&self) -> &str {
        match self {
            Decision::Run(r) | Decision::Skip(r) => r,
        }
    }
}

/// Steps (c.1)-(c.6) of the task executor's dry-run decision. `env` is
/// recorded in the stored Hash (§4.7) but never compared here: the merged
/// environment includes the whole process environment, which is volatile
/// across invocations and would otherwise force a rerun every time.
pub fn decide_run(
    spec: &TaskSpec<'_>,
    prior: Option<&Hash>,
    command_digest: &str,
    force: bool,
) -> Result<Decision, Diagnostic> {
    if force {
        return Ok(Decision::Run("forced".into()));
    }

    if let Some(prior) = prior {
        if prior.creates != spec.creates {
            return Ok(Decision::Run("creates changed".into()));
        }
        if prior.command != command_digest {
            return Ok(Decision::Run("command changed".into()));
        }
    }

    if spec.command.is_empty() && !spec.creates.is_empty() {
        return Err(Diagnostic::error(
            Category::Planning,
            "command cannot be empty when creates is provided",
        ));
    }

    if spec.sources.is_empty() || spec.creates.is_empty() {
        return Ok(Decision::Run("phony task".into()));
    }

    let target = FsPath::new(spec.creates);
    let target_mtime = match std::fs::metadata(target) {
        Ok(meta) => meta.modified().ok(),
        Err(_) => return Ok(Decision::Run("target missing".into())),
    };

    let mut matched_any = false;
    for pattern in spec.sources {
        let paths = glob::glob(pattern).map_err(|e| {
            Diagnostic::error(Category::Planning, format!("malformed glob pattern {pattern:?}"))
                .with_detail(e.to_string())
        })?;

        for entry in paths {
            let entry = entry.map_err(|e| {
                Diagnostic::error(Category::Planning, "failed to stat a source path").with_detail(e.to_string())
            })?;
            matched_any = true;
            let source_mtime: Option<SystemTime> = std::fs::metadata(&entry).ok().and_then(|m| m.modified().ok());
            if let (Some(source_mtime), Some(target_mtime)) = (source_mtime, target_mtime) {
                if source_mtime > target_mtime {
                    return Ok(Decision::Run("source newer".into()));
                }
            }
        }
    }

    if !matched_any {
        return Ok(Decision::Skip("no sources matched".into()));
    }

    Ok(Decision::Skip("up to date".into()))
}

/// Step (d) of the task executor: the dry-prune decision.
pub fn decide_prune(creates: &str, force: bool) -> Decision {
    if force {
        return Decision::Run("forced".into());
    }
    if creates.is_empty() {
        return Decision::Skip("nothing to prune".into());
    }
    if !FsPath::new(creates).exists() {
        return Decision::Skip(format!("{creates:?} doesn't exist"));
    }
    Decision::Run(format!("will delete {creates}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phony_task_without_creates_always_runs() {
        let spec = TaskSpec {
            command: "echo hi",
            creates: "",
            sources: &[],
        };
        let decision = decide_run(&spec, None, "c1", false).unwrap();
        assert_eq!(decision, Decision::Run("phony task".into()));
    }

    #[test]
    fn empty_command_with_creates_is_a_planning_error() {
        let spec = TaskSpec {
            command: "",
            creates: "out",
            sources: &[],
        };
        let err = decide_run(&spec, None, "c1", false).unwrap_err();
        assert_eq!(err.category, Category::Planning);
    }

    #[test]
    fn force_overrides_any_other_decision() {
        let spec = TaskSpec {
            command: "echo hi",
            creates: "out",
            sources: &["in".into()],
        };
        let decision = decide_run(&spec, None, "c1", true).unwrap();
        assert_eq!(decision, Decision::Run("forced".into()));
    }

    #[test]
    fn missing_target_forces_a_run() {
        let dir = tempfile::tempdir().unwrap();
        let creates = dir.path().join("out").to_string_lossy().to_string();
        let spec = TaskSpec {
            command: "touch out",
            creates: &creates,
            sources: &[],
        };
        let decision = decide_run(&spec, None, "c1", false).unwrap();
        assert_eq!(decision, Decision::Run("target missing".into()));
    }

    #[test]
    fn prune_skips_when_creates_missing() {
        let decision = decide_prune("/no/such/path", false);
        assert!(!decision.should_run());
    }

    #[test]
    fn prune_skips_when_creates_is_empty() {
        assert_eq!(decide_prune("", false), Decision::Skip("nothing to prune".into()));
    }

    #[test]
    fn env_drift_alone_does_not_force_a_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let creates = dir.path().join("out");
        std::fs::write(&creates, "").unwrap();
        let creates = creates.to_string_lossy().to_string();
        let sources = vec![dir.path().join("no-such-source-*.txt").to_string_lossy().to_string()];
        let spec = TaskSpec {
            command: "touch out",
            creates: &creates,
            sources: &sources,
        };
        let prior = Hash {
            creates: creates.clone(),
            command: "c1".into(),
            env: "stale-env-digest".into(),
            dirty: false,
        };
        let decision = decide_run(&spec, Some(&prior), "c1", false).unwrap();
        assert_eq!(decision, Decision::Skip("no sources matched".into()));
    }
}
