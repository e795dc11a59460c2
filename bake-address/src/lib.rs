//! The address registry: partial (pre-decode) handles and decoded Actions.

mod action;
mod convert;
mod data;
mod expr;
mod for_each;
mod local;
pub mod loader;
mod partial;
mod task;

pub use action::{Action, ActionKind, ApplyContext, Flags};
pub use for_each::ForEach;
pub use partial::{Partial, RawAddress};

pub use data::Data;
pub use local::Local;
pub use task::Task;

use bake_diagnostic::Diagnostics;
use bake_value::Path;

/// An addressable node before decoding: knows its own name, path, source file,
/// and the set of paths its raw body references.
pub trait Address {
    fn name(&self) -> &str;
    fn path(&self) -> &Path;
    fn filename(&self) -> &std::path::Path;
    fn dependencies(&self) -> Result<Vec<Path>, Diagnostics>;
}

/// Best-effort listing support: `list` has no dependency graph to resolve, so
/// it can only surface descriptions that are plain string literals. A task
/// whose `description` references another node is silently skipped rather
/// than partially evaluated.
pub fn describe_task(partial: &Partial) -> Option<(String, String)> {
    let block = match partial {
        Partial::Block(block) if block.kind == partial::BlockKind::Task => block,
        _ => return None,
    };
    let attribute = block.body.attributes().find(|a| a.key() == "description")?;
    match attribute.expr() {
        hcl::Expression::String(s) => Some((block.name.clone(), s.clone())),
        _ => None,
    }
}
