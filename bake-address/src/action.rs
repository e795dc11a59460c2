use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bake_diagnostic::Diagnostics;
use bake_lock::{Hash, Lock};
use bake_value::{Path, Value};

#[derive(Clone, Copy, Debug, Default)]
pub struct Flags {
    pub dry: bool,
    pub prune: bool,
    pub force: bool,
}

/// Everything an Action's `apply` needs from the run as a whole. Shared by
/// every concurrently-applying instance; the lock snapshot is read-only
/// during a run (the coordinator writes the updated lock once, at the end).
#[derive(Clone)]
pub struct ApplyContext {
    pub cwd: PathBuf,
    pub flags: Flags,
    pub prior_lock: Arc<Lock>,
    cancelled: Arc<AtomicBool>,
}

impl ApplyContext {
    pub fn new(cwd: PathBuf, flags: Flags, prior_lock: Arc<Lock>) -> Self {
        ApplyContext {
            cwd,
            flags,
            prior_lock,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn prior_hash(&self, path: &Path) -> Option<&Hash> {
        self.prior_lock.get(path)
    }
}

/// Which block type a decoded Action came from. The scope builder needs this
/// to know where to file an Action's projection (`task.*`, `data.*`, ...)
/// since a task's own Path carries no prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Task,
    Data,
    Local,
}

/// A decoded node: carries its path, a projection other nodes can reference,
/// and the side effect (if any) that running this node performs.
#[async_trait::async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;
    fn path(&self) -> &Path;
    fn filename(&self) -> &std::path::Path;
    fn kind(&self) -> ActionKind;

    /// What downstream nodes see when they reference this node's path.
    fn cty_value(&self) -> Value;

    /// Runs (or skips, per the dry/prune/force decision) this node's effect.
    /// A Task or Data instance mutates its own Eventual fields in place.
    async fn apply(&self, ctx: &ApplyContext) -> Diagnostics;

    /// Fresh Hash records to fold into the lock, one per task instance. Empty
    /// for Data and Local actions, which are never persisted.
    fn hashes(&self) -> Vec<(Path, Hash)> {
        Vec::new()
    }
}
