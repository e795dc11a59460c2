//! The coordinator: component E. Drives the dependency-ordered decode loop
//! on a single task and fans each node's `apply` out onto a bounded pool.

mod async_latch;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_latch::AsyncLatch;
use bake_address::{Action, ApplyContext, Flags, Partial, RawAddress};
use bake_diagnostic::{Category, Diagnostic, Diagnostics};
use bake_lock::{Hash, Lock};
use bake_value::{Path, PathPrefixSet};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const DEFAULT_JOBS: usize = 4;

pub struct RunResult {
    pub actions: Vec<Arc<dyn Action>>,
    pub diagnostics: Diagnostics,
}

fn default_ignored() -> PathPrefixSet {
    let mut ignored = PathPrefixSet::new();
    ignored.insert(Path::root("path"));
    ignored.insert(Path::root("each"));
    ignored
}

/// Entry point: resolves `goal`'s dependency order among `partials`, decodes
/// and applies each node in turn, and returns every decoded Action plus any
/// diagnostics accumulated along the way.
pub async fn run(
    goal_name: &str,
    partials: Vec<Partial>,
    cwd: PathBuf,
    flags: Flags,
    prior_lock: Arc<Lock>,
    jobs: usize,
) -> RunResult {
    let goal = Path::root(goal_name);
    let ignored = default_ignored();

    let order = match bake_resolver::resolve_order(&goal, &partials, &ignored) {
        Ok(order) => order,
        Err(diagnostics) => {
            return RunResult {
                actions: Vec::new(),
                diagnostics,
            }
        }
    };
    let deps = match bake_resolver::all_dependencies(&goal, &partials, &ignored) {
        Ok(deps) => deps,
        Err(diagnostics) => {
            return RunResult {
                actions: Vec::new(),
                diagnostics,
            }
        }
    };

    let latches: Vec<AsyncLatch> = (0..partials.len()).map(|_| AsyncLatch::new()).collect();
    let decoded_list: Arc<SyncMutex<Vec<Arc<dyn Action>>>> = Arc::new(SyncMutex::new(Vec::new()));
    let ctx = ApplyContext::new(cwd.clone(), flags, prior_lock);
    let diagnostics = Arc::new(SyncMutex::new(Diagnostics::new()));
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut pool: JoinSet<()> = JoinSet::new();

    for index in order {
        if ctx.is_cancelled() {
            break;
        }

        for &prereq in deps.get(&index).into_iter().flatten() {
            if ctx.is_cancelled() {
                break;
            }
            latches[prereq].triggered().await;
        }

        let snapshot: Vec<Arc<dyn Action>> = decoded_list.lock().clone();
        let scope = bake_scope::assemble(&cwd, partials[index].filename(), &snapshot);

        let decoded = match partials[index].decode(&scope) {
            Ok(decoded) => decoded,
            Err(decode_diagnostics) => {
                diagnostics.lock().extend(decode_diagnostics);
                break;
            }
        };

        let action: Arc<dyn Action> = match decoded.into_iter().next() {
            Some(action) => Arc::from(action),
            None => {
                latches[index].trigger();
                continue;
            }
        };
        log::debug!("decoded {}", action.path());
        decoded_list.lock().push(action.clone());

        let latch = latches[index].clone();
        let ctx = ctx.clone();
        let diagnostics = diagnostics.clone();
        let semaphore = semaphore.clone();

        pool.spawn(async move {
            let permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            if !ctx.is_cancelled() {
                let result = action.apply(&ctx).await;
                if result.has_errors() {
                    ctx.cancel();
                }
                diagnostics.lock().extend(result);
            }
            drop(permit);
            latch.trigger();
        });
    }

    while pool.join_next().await.is_some() {}

    let actions = decoded_list.lock().clone();
    let diagnostics = Arc::try_unwrap(diagnostics)
        .map(SyncMutex::into_inner)
        .unwrap_or_else(|arc| arc.lock().clone());

    RunResult { actions, diagnostics }
}

/// Folds the run's Hash records into the prior lock and writes it back out.
pub fn update_lock(version: &str, cwd: &std::path::Path, mut lock: Lock, actions: &[Arc<dyn Action>]) -> Result<(), Diagnostics> {
    let hashes: Vec<(Path, Hash)> = actions.iter().flat_map(|a| a.hashes()).collect();
    lock.update(version, hashes);
    lock.store(cwd)
}

/// Surfaces an internal/unreachable condition the way the top-level panic
/// handler expects: as an Error diagnostic in the Internal category.
pub fn internal_error(detail: impl Into<String>) -> Diagnostics {
    Diagnostic::error(Category::Internal, "internal error: please file a bug")
        .with_detail(detail.into())
        .into()
}
