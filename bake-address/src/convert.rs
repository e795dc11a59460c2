use std::collections::BTreeMap;

use bake_diagnostic::{Category, Diagnostic};
use bake_value::Value;
use hcl::eval::{Context, Evaluate};
use hcl::Expression;

pub fn from_hcl_value(value: hcl::Value) -> Value {
    match value {
        hcl::Value::Null => Value::Null,
        hcl::Value::Bool(b) => Value::Bool(b),
        hcl::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        hcl::Value::String(s) => Value::String(s),
        hcl::Value::Array(items) => Value::List(items.into_iter().map(from_hcl_value).collect()),
        hcl::Value::Object(map) => {
            Value::Map(map.into_iter().map(|(k, v)| (k, from_hcl_value(v))).collect())
        }
    }
}

pub fn evaluate(expr: &Expression, ctx: &Context<'_>) -> Result<Value, Diagnostic> {
    expr.evaluate(ctx)
        .map(from_hcl_value)
        .map_err(|e| Diagnostic::error(Category::Decode, "failed to evaluate expression").with_detail(e.to_string()))
}

pub fn eval_string(expr: &Expression, ctx: &Context<'_>) -> Result<String, Diagnostic> {
    evaluate(expr, ctx)?
        .as_str()
        .map(str::to_string)
        .map_err(|_| Diagnostic::error(Category::Decode, "expected a string"))
}

pub fn eval_string_list(expr: &Expression, ctx: &Context<'_>) -> Result<Vec<String>, Diagnostic> {
    let value = evaluate(expr, ctx)?;
    let items = value
        .as_list()
        .map_err(|_| Diagnostic::error(Category::Decode, "expected a list of strings"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .map_err(|_| Diagnostic::error(Category::Decode, "expected a list of strings"))
        })
        .collect()
}

pub fn eval_string_map(expr: &Expression, ctx: &Context<'_>) -> Result<BTreeMap<String, String>, Diagnostic> {
    let value = evaluate(expr, ctx)?;
    let map = value
        .as_map()
        .map_err(|_| Diagnostic::error(Category::Decode, "expected a map of strings"))?;
    map.iter()
        .map(|(k, v)| {
            v.as_str()
                .map(|s| (k.clone(), s.to_string()))
                .map_err(|_| Diagnostic::error(Category::Decode, "expected a map of strings"))
        })
        .collect()
}
