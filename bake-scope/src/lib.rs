//! The expression scope builder: component C. Assembles an `hcl::eval::Context`
//! from the node currently being decoded and the set of already-decoded
//! Actions, per the names fixed in the design: `path`, `data`, `local`,
//! `task` (plus the top-level task shortcut).

use std::collections::BTreeMap;
use std::path::Path as FsPath;
use std::sync::Arc;

use bake_address::{Action, ActionKind};
use bake_value::Value;

/// Builds the scope visible to the node whose source file is `current_file`.
/// `decoded` is every Action produced so far this run, in the coordinator's
/// append order.
pub fn assemble<'a>(root: &FsPath, current_file: &FsPath, decoded: &[Arc<dyn Action>]) -> hcl::eval::Context<'a> {
    let mut ctx = hcl::eval::Context::new();

    ctx.declare_var("path", path_object(root, current_file));

    let mut task_obj = BTreeMap::new();
    let mut data_obj = BTreeMap::new();
    let mut local_obj = BTreeMap::new();

    for action in decoded {
        let name = action.name().to_string();
        let value = to_hcl_value(action.cty_value());
        match action.kind() {
            ActionKind::Task => {
                task_obj.insert(name, value);
            }
            ActionKind::Data => {
                data_obj.insert(name, value);
            }
            ActionKind::Local => {
                local_obj.insert(name, value);
            }
        }
    }

    // tasks are additionally promoted to the top level so they can be
    // referenced without the `task.` prefix
    for (name, value) in &task_obj {
        ctx.declare_var(name.clone(), value.clone());
    }

    ctx.declare_var("task", hcl::Value::from_iter(task_obj));
    ctx.declare_var("data", hcl::Value::from_iter(data_obj));
    ctx.declare_var("local", hcl::Value::from_iter(local_obj));

    ctx
}

fn path_object(root: &FsPath, current_file: &FsPath) -> hcl::Value {
    let module = current_file
        .parent()
        .map(|p| root.join(p))
        .unwrap_or_else(|| root.to_path_buf());
    let current = root.join(current_file);

    let mut map = BTreeMap::new();
    map.insert("root".to_string(), hcl::Value::String(root.to_string_lossy().to_string()));
    map.insert("module".to_string(), hcl::Value::String(module.to_string_lossy().to_string()));
    map.insert(
        "current".to_string(),
        hcl::Value::String(current.to_string_lossy().to_string()),
    );
    hcl::Value::from_iter(map)
}

fn to_hcl_value(value: Value) -> hcl::Value {
    match value {
        Value::Null => hcl::Value::Null,
        Value::Bool(b) => hcl::Value::Bool(b),
        Value::Number(n) => hcl::Value::from(n),
        Value::String(s) => hcl::Value::String(s),
        Value::List(items) => hcl::Value::Array(items.into_iter().map(to_hcl_value).collect()),
        Value::Map(map) => hcl::Value::from_iter(map.into_iter().map(|(k, v)| (k, to_hcl_value(v)))),
        // an unresolved Eventual surfaces to the frontend as null; expressions
        // referencing it before its producer has applied are a bug in the
        // coordinator's ordering guarantee, not something the scope should
        // paper over with a sentinel value.
        Value::Unknown => hcl::Value::Null,
    }
}
