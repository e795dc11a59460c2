use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use bake_diagnostic::{Category, Diagnostic, Diagnostics};
use bake_exec::{decide_prune, decide_run, remove_creates, run_shell, Decision, TaskSpec as ExecTaskSpec};
use bake_lock::{digest_command, digest_env, Hash};
use bake_value::{Eventual, Path, Value};
use parking_lot::Mutex;

use crate::convert::{eval_string, eval_string_list, eval_string_map, evaluate};
use crate::for_each::ForEach;
use crate::partial::PartialBlock;
use crate::{Action, ApplyContext};

const KNOWN_ATTRS: &[&str] = &[
    "description",
    "command",
    "creates",
    "sources",
    "env",
    "depends_on",
    "for_each",
];

fn validate_attributes(body: &hcl::Body) -> Result<(), Diagnostics> {
    for attribute in body.attributes() {
        if !KNOWN_ATTRS.contains(&attribute.key()) {
            return Err(Diagnostic::error(
                Category::Decode,
                format!("unsupported attribute {:?} on a task block", attribute.key()),
            )
            .into());
        }
    }
    Ok(())
}

struct TaskInstance {
    path: Path,
    description: String,
    command: String,
    creates: String,
    sources: Vec<String>,
    env: BTreeMap<String, String>,
    exit_code: Mutex<Eventual<i64>>,
}

impl TaskInstance {
    fn decode(path: Path, body: &hcl::Body, ctx: &hcl::eval::Context<'_>) -> Result<Self, Diagnostics> {
        let description = optional_string(body, "description", ctx)?.unwrap_or_default();
        let mut command = optional_string(body, "command", ctx)?.unwrap_or_default();
        let mut creates = optional_string(body, "creates", ctx)?.unwrap_or_default();
        if !creates.is_empty() {
            creates = normalize_path(&creates);
        }
        let sources = optional_string_list(body, "sources", ctx)?.unwrap_or_default();
        let mut env = optional_string_map(body, "env", ctx)?.unwrap_or_default();

        // overlay the process environment as the base, task overrides win
        let mut merged: BTreeMap<String, String> = std::env::vars().collect();
        merged.append(&mut env);
        command = command.trim().to_string();

        Ok(TaskInstance {
            path,
            description,
            command,
            creates,
            sources,
            env: merged,
            exit_code: Mutex::new(Eventual::Unknown),
        })
    }

    fn cty_value(&self) -> Value {
        let mut map = std::collections::BTreeMap::new();
        map.insert("description".to_string(), Value::String(self.description.clone()));
        map.insert("creates".to_string(), Value::String(self.creates.clone()));
        map.insert("exit_code".to_string(), self.exit_code.lock().as_value());
        Value::Map(map)
    }

    fn hash(&self) -> Hash {
        let exit_code = self.exit_code.lock().clone();
        Hash {
            creates: self.creates.clone(),
            command: digest_command(&self.command),
            env: digest_env(&self.env),
            dirty: !matches!(exit_code, Eventual::Known(0)),
        }
    }

    async fn apply(&self, ctx: &ApplyContext) -> Diagnostics {
        if self.exit_code.lock().is_known() || self.command.is_empty() {
            return Diagnostics::new();
        }

        let prior = ctx.prior_hash(&self.path).cloned();
        let command_digest = digest_command(&self.command);

        if ctx.flags.prune {
            let decision = decide_prune(&self.creates, ctx.flags.force);
            log::info!("{}: {}", self.path, decision.reason());
            if ctx.flags.dry {
                return Diagnostics::new();
            }
            if !decision.should_run() {
                return Diagnostics::new();
            }
            return match remove_creates(&self.creates) {
                Ok(()) => Diagnostics::new(),
                Err(diag) => diag.into(),
            };
        }

        let spec = ExecTaskSpec {
            command: &self.command,
            creates: &self.creates,
            sources: &self.sources,
        };
        let decision = match decide_run(&spec, prior.as_ref(), &command_digest, ctx.flags.force) {
            Ok(decision) => decision,
            Err(diag) => return diag.into(),
        };
        log::info!("{}: {}", self.path, decision.reason());

        if ctx.flags.dry {
            return Diagnostics::new();
        }
        if !matches!(decision, Decision::Run(_)) {
            return Diagnostics::new();
        }

        if ctx.is_cancelled() {
            return Diagnostics::new();
        }

        let outcome = match run_shell(&self.command, &self.env).await {
            Ok(outcome) => outcome,
            Err(diag) => return diag.into(),
        };
        *self.exit_code.lock() = Eventual::Known(outcome.exit_code);

        if outcome.exit_code != 0 {
            let detail = if !outcome.stderr.is_empty() {
                outcome.stderr
            } else {
                outcome.stdout
            };
            return Diagnostic::error(Category::Execution, format!("{} exited with status {}", self.path, outcome.exit_code))
                .with_detail(detail)
                .into();
        }

        if !self.creates.is_empty() && !std::path::Path::new(&self.creates).exists() {
            return Diagnostic::error(
                Category::Execution,
                format!("{} did not create the expected file {:?}", self.path, self.creates),
            )
            .into();
        }

        if let Some(prior) = prior {
            if prior.creates != self.creates {
                if let Err(diag) = remove_creates(&prior.creates) {
                    return diag.into();
                }
            }
        }

        Diagnostics::new()
    }
}

fn normalize_path(raw: &str) -> String {
    // mirrors filepath.Clean: collapse "./dir/file" style noise so an
    // irrelevant rewrite doesn't taint the lock.
    let path = std::path::PathBuf::from(raw);
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        cleaned.push(component);
    }
    cleaned.to_string_lossy().to_string()
}

fn optional_string(body: &hcl::Body, name: &str, ctx: &hcl::eval::Context<'_>) -> Result<Option<String>, Diagnostics> {
    match body.attributes().find(|a| a.key() == name) {
        Some(attribute) => eval_string(attribute.expr(), ctx).map(Some).map_err(Diagnostics::from),
        None => Ok(None),
    }
}

fn optional_string_list(
    body: &hcl::Body,
    name: &str,
    ctx: &hcl::eval::Context<'_>,
) -> Result<Option<Vec<String>>, Diagnostics> {
    match body.attributes().find(|a| a.key() == name) {
        Some(attribute) => eval_string_list(attribute.expr(), ctx).map(Some).map_err(Diagnostics::from),
        None => Ok(None),
    }
}

fn optional_string_map(
    body: &hcl::Body,
    name: &str,
    ctx: &hcl::eval::Context<'_>,
) -> Result<Option<BTreeMap<String, String>>, Diagnostics> {
    match body.attributes().find(|a| a.key() == name) {
        Some(attribute) => eval_string_map(attribute.expr(), ctx).map(Some).map_err(Diagnostics::from),
        None => Ok(None),
    }
}

/// A task block, possibly expanded by `for_each` into N keyed instances.
pub struct Task {
    path: Path,
    filename: PathBuf,
    instances: Vec<TaskInstance>,
    keyed: Vec<String>,
}

#[async_trait]
impl Action for Task {
    fn name(&self) -> &str {
        self.path.root_name().unwrap_or_default()
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn filename(&self) -> &std::path::Path {
        &self.filename
    }

    fn kind(&self) -> crate::ActionKind {
        crate::ActionKind::Task
    }

    fn cty_value(&self) -> Value {
        match (self.keyed.is_empty(), self.instances.is_empty()) {
            (true, true) => Value::Map(std::collections::BTreeMap::new()),
            (true, false) => self.instances[0].cty_value(),
            (false, _) => {
                let mut map = std::collections::BTreeMap::new();
                for (key, instance) in self.keyed.iter().zip(&self.instances) {
                    map.insert(key.clone(), instance.cty_value());
                }
                Value::Map(map)
            }
        }
    }

    async fn apply(&self, ctx: &ApplyContext) -> Diagnostics {
        let mut diags = Diagnostics::new();
        for instance in &self.instances {
            diags.extend(instance.apply(ctx).await);
            if diags.has_errors() {
                ctx.cancel();
                return diags;
            }
        }
        diags
    }

    fn hashes(&self) -> Vec<(Path, Hash)> {
        self.instances.iter().map(|i| (i.path.clone(), i.hash())).collect()
    }
}

pub fn decode(block: &PartialBlock, ctx: &hcl::eval::Context<'_>) -> Result<Vec<Box<dyn Action>>, Diagnostics> {
    validate_attributes(&block.body)?;

    let for_each_attr = block.body.attributes().find(|a| a.key() == "for_each");

    match for_each_attr {
        None => {
            let instance = TaskInstance::decode(block.path.clone(), &block.body, ctx)?;
            Ok(vec![Box::new(Task {
                path: block.path.clone(),
                filename: block.filename.clone(),
                instances: vec![instance],
                keyed: Vec::new(),
            })])
        }
        Some(attribute) => {
            let value = evaluate(attribute.expr(), ctx).map_err(Diagnostics::from)?;
            let entries = ForEach::entries(&value).map_err(Diagnostics::from)?;

            if entries.is_empty() {
                return Ok(vec![Box::new(Task {
                    path: block.path.clone(),
                    filename: block.filename.clone(),
                    instances: Vec::new(),
                    keyed: Vec::new(),
                })]);
            }

            let mut instances = Vec::with_capacity(entries.len());
            let mut keyed = Vec::with_capacity(entries.len());
            let mut creates_seen = std::collections::HashSet::new();

            for entry in &entries {
                let mut child_ctx = ctx.clone();
                let mut each = std::collections::BTreeMap::new();
                each.insert("key".to_string(), hcl::Value::String(entry.key.clone()));
                each.insert("value".to_string(), hcl::Value::String(entry.value.clone()));
                child_ctx.declare_var("each", hcl::Value::from_iter(each));

                let instance_path = block.path.index_str(&entry.key);
                let instance = TaskInstance::decode(instance_path, &block.body, &child_ctx)?;

                if !instance.creates.is_empty() && !creates_seen.insert(instance.creates.clone()) {
                    return Err(Diagnostic::error(
                        Category::Planning,
                        format!("{} for_each task instances collide on creates {:?}", block.path, instance.creates),
                    )
                    .with_detail("require creates to reference each.key or each.value")
                    .into());
                }

                keyed.push(entry.key.clone());
                instances.push(instance);
            }

            Ok(vec![Box::new(Task {
                path: block.path.clone(),
                filename: block.filename.clone(),
                instances,
                keyed,
            })])
        }
    }
}
