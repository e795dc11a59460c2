//! The on-disk fingerprint cache at `<cwd>/.bake/lock.json`.

mod digest;

pub use digest::{digest_command, digest_env};

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path as FsPath, PathBuf};

use bake_diagnostic::{Category, Diagnostic, Diagnostics};
use bake_value::Path;
use serde::{Deserialize, Serialize};

pub const BAKE_DIR: &str = ".bake";
pub const LOCK_FILENAME: &str = "lock.json";

/// Per-task fingerprint, one per completed task instance with a non-empty `creates`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hash {
    pub creates: String,
    pub command: String,
    pub env: String,
    /// True if the task was skipped, never ran, or failed. Never serialized:
    /// a dirty record is never written to disk in the first place.
    #[serde(skip)]
    pub dirty: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Lock {
    pub version: String,
    pub timestamp: String,
    pub tasks: BTreeMap<String, Hash>,
}

impl Lock {
    pub fn new(version: impl Into<String>) -> Self {
        Lock {
            version: version.into(),
            timestamp: now_rfc3339(),
            tasks: BTreeMap::new(),
        }
    }

    fn lock_path(cwd: &FsPath) -> PathBuf {
        cwd.join(BAKE_DIR).join(LOCK_FILENAME)
    }

    /// Load the lock from `<cwd>/.bake/lock.json`. A missing file is not an
    /// error — it means no prior run has happened yet.
    pub fn load(cwd: &FsPath, version: impl Into<String>) -> Result<Self, Diagnostics> {
        let path = Self::lock_path(cwd);
        if !path.exists() {
            return Ok(Lock::new(version));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            Diagnostics::from(
                Diagnostic::error(Category::Io, "failed to read lock file").with_detail(e.to_string()),
            )
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            Diagnostics::from(
                Diagnostic::error(Category::Io, "lock file is corrupt").with_detail(e.to_string()),
            )
        })
    }

    pub fn get(&self, path: &Path) -> Option<&Hash> {
        self.tasks.get(&path.to_string())
    }

    /// Discards entries for tasks that were dirty or produced nothing, then
    /// upserts the remainder by path.
    pub fn update(&mut self, version: impl Into<String>, hashes: impl IntoIterator<Item = (Path, Hash)>) {
        self.version = version.into();
        self.timestamp = now_rfc3339();
        for (path, hash) in hashes {
            if hash.dirty || hash.creates.is_empty() {
                continue;
            }
            self.tasks.insert(path.to_string(), hash);
        }
    }

    /// Write atomically: temp sibling file, fsync, rename over the final path.
    pub fn store(&self, cwd: &FsPath) -> Result<(), Diagnostics> {
        let dir = cwd.join(BAKE_DIR);
        fs::create_dir_all(&dir).map_err(|e| {
            Diagnostics::from(
                Diagnostic::error(Category::Io, "failed to create .bake directory")
                    .with_detail(e.to_string()),
            )
        })?;

        let final_path = dir.join(LOCK_FILENAME);
        let tmp_path = dir.join(format!("{LOCK_FILENAME}.tmp"));

        log::debug!("writing {} task hashes to {}", self.tasks.len(), final_path.display());
        let write_result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            let pretty = serde_json::to_string_pretty(self)
                .expect("Lock always serializes: it contains no non-serializable types");
            file.write_all(pretty.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &final_path)?;
            Ok(())
        })();

        write_result.map_err(|e| {
            Diagnostics::from(
                Diagnostic::error(Category::Io, "failed to write lock file").with_detail(e.to_string()),
            )
        })
    }
}

fn now_rfc3339() -> String {
    // No chrono dependency pulled in for one timestamp: format the
    // seconds-since-epoch ourselves in a sortable, human-legible way.
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", now.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bake_value::Path;

    #[test]
    fn missing_lock_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lock = Lock::load(dir.path(), "0.0.1").unwrap();
        assert!(lock.tasks.is_empty());
    }

    #[test]
    fn round_trip_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = Lock::new("0.0.1");
        lock.update(
            "0.0.1",
            [(
                Path::root("build"),
                Hash {
                    creates: "out".into(),
                    command: "abc".into(),
                    env: "def".into(),
                    dirty: false,
                },
            )],
        );
        lock.store(dir.path()).unwrap();

        let reloaded = Lock::load(dir.path(), "0.0.1").unwrap();
        assert_eq!(reloaded.tasks, lock.tasks);
    }

    #[test]
    fn dirty_and_empty_creates_are_discarded_on_update() {
        let mut lock = Lock::new("0.0.1");
        lock.update(
            "0.0.1",
            [
                (
                    Path::root("dirty"),
                    Hash {
                        creates: "out".into(),
                        command: "c".into(),
                        env: "e".into(),
                        dirty: true,
                    },
                ),
                (
                    Path::root("phony"),
                    Hash {
                        creates: String::new(),
                        command: "c".into(),
                        env: "e".into(),
                        dirty: false,
                    },
                ),
            ],
        );
        assert!(lock.tasks.is_empty());
    }
}
