use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use bake_diagnostic::{Category, Diagnostic, Diagnostics};
use bake_exec::run_shell;
use bake_value::{Eventual, Path, Value};
use parking_lot::Mutex;

use crate::convert::{eval_string, eval_string_map, evaluate};
use crate::for_each::ForEach;
use crate::partial::PartialBlock;
use crate::{Action, ApplyContext};

const KNOWN_ATTRS: &[&str] = &["description", "command", "env", "depends_on", "for_each"];

fn validate_attributes(body: &hcl::Body) -> Result<(), Diagnostics> {
    for attribute in body.attributes() {
        if !KNOWN_ATTRS.contains(&attribute.key()) {
            return Err(Diagnostic::error(
                Category::Decode,
                format!("unsupported attribute {:?} on a data block", attribute.key()),
            )
            .into());
        }
    }
    Ok(())
}

struct DataInstance {
    path: Path,
    description: String,
    command: String,
    env: BTreeMap<String, String>,
    std_out: Mutex<Eventual<String>>,
    std_err: Mutex<Eventual<String>>,
    exit_code: Mutex<Eventual<i64>>,
}

impl DataInstance {
    fn decode(path: Path, body: &hcl::Body, ctx: &hcl::eval::Context<'_>) -> Result<Self, Diagnostics> {
        let description = opt_string(body, "description", ctx)?.unwrap_or_default();
        let command = opt_string(body, "command", ctx)?.unwrap_or_default();
        let mut env = opt_string_map(body, "env", ctx)?.unwrap_or_default();

        let mut merged: BTreeMap<String, String> = std::env::vars().collect();
        merged.append(&mut env);

        Ok(DataInstance {
            path,
            description,
            command: command.trim().to_string(),
            env: merged,
            std_out: Mutex::new(Eventual::Unknown),
            std_err: Mutex::new(Eventual::Unknown),
            exit_code: Mutex::new(Eventual::Unknown),
        })
    }

    fn cty_value(&self) -> Value {
        let mut map = std::collections::BTreeMap::new();
        map.insert("description".to_string(), Value::String(self.description.clone()));
        map.insert("std_out".to_string(), self.std_out.lock().as_value());
        map.insert("std_err".to_string(), self.std_err.lock().as_value());
        map.insert("exit_code".to_string(), self.exit_code.lock().as_value());
        Value::Map(map)
    }

    /// Data instances refresh on every run, dry or not — downstream
    /// expressions depend on their stdout being known.
    async fn apply(&self, _ctx: &ApplyContext) -> Diagnostics {
        if self.exit_code.lock().is_known() || self.command.is_empty() {
            return Diagnostics::new();
        }

        log::info!("{}: refreshing", self.path);
        let outcome = match run_shell(&self.command, &self.env).await {
            Ok(outcome) => outcome,
            Err(diag) => return diag.into(),
        };

        *self.std_out.lock() = Eventual::Known(outcome.stdout.clone());
        *self.std_err.lock() = Eventual::Known(outcome.stderr.clone());
        *self.exit_code.lock() = Eventual::Known(outcome.exit_code);

        if outcome.exit_code != 0 {
            let detail = if !outcome.stderr.is_empty() { outcome.stderr } else { outcome.stdout };
            return Diagnostic::error(Category::Execution, format!("{} exited with status {}", self.path, outcome.exit_code))
                .with_detail(detail)
                .into();
        }

        Diagnostics::new()
    }
}

fn opt_string(body: &hcl::Body, name: &str, ctx: &hcl::eval::Context<'_>) -> Result<Option<String>, Diagnostics> {
    match body.attributes().find(|a| a.key() == name) {
        Some(attribute) => eval_string(attribute.expr(), ctx).map(Some).map_err(Diagnostics::from),
        None => Ok(None),
    }
}

fn opt_string_map(
    body: &hcl::Body,
    name: &str,
    ctx: &hcl::eval::Context<'_>,
) -> Result<Option<BTreeMap<String, String>>, Diagnostics> {
    match body.attributes().find(|a| a.key() == name) {
        Some(attribute) => eval_string_map(attribute.expr(), ctx).map(Some).map_err(Diagnostics::from),
        None => Ok(None),
    }
}

pub struct Data {
    name: String,
    path: Path,
    filename: PathBuf,
    instances: Vec<DataInstance>,
    keyed: Vec<String>,
}

#[async_trait]
impl Action for Data {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn filename(&self) -> &std::path::Path {
        &self.filename
    }

    fn kind(&self) -> crate::ActionKind {
        crate::ActionKind::Data
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
        }
        diags
    }
}

pub fn decode(block: &PartialBlock, ctx: &hcl::eval::Context<'_>) -> Result<Vec<Box<dyn Action>>, Diagnostics> {
    validate_attributes(&block.body)?;

    let for_each_attr = block.body.attributes().find(|a| a.key() == "for_each");

    match for_each_attr {
        None => {
            let instance = DataInstance::decode(block.path.clone(), &block.body, ctx)?;
            Ok(vec![Box::new(Data {
                name: block.name.clone(),
                path: block.path.clone(),
                filename: block.filename.clone(),
                instances: vec![instance],
                keyed: Vec::new(),
            })])
        }
        Some(attribute) => {
            let value = evaluate(attribute.expr(), ctx).map_err(Diagnostics::from)?;
            let entries = ForEach::entries(&value).map_err(Diagnostics::from)?;

            let mut instances = Vec::with_capacity(entries.len());
            let mut keyed = Vec::with_capacity(entries.len());
            for entry in &entries {
                let mut child_ctx = ctx.clone();
                let mut each = std::collections::BTreeMap::new();
                each.insert("key".to_string(), hcl::Value::String(entry.key.clone()));
                each.insert("value".to_string(), hcl::Value::String(entry.value.clone()));
                child_ctx.declare_var("each", hcl::Value::from_iter(each));

                let instance_path = block.path.index_str(&entry.key);
                instances.push(DataInstance::decode(instance_path, &block.body, &child_ctx)?);
                keyed.push(entry.key.clone());
            }

            Ok(vec![Box::new(Data {
                name: block.name.clone(),
                path: block.path.clone(),
                filename: block.filename.clone(),
                instances,
                keyed,
            })])
        }
    }
}
