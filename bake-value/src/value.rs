use std::collections::BTreeMap;
use std::fmt;

use bake_diagnostic::{Category, Diagnostic};

/// The unit of data flowing between decoded nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A placeholder for a field whose producer has not applied yet.
    Unknown,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Unknown => "unknown",
        }
    }

    pub fn as_str(&self) -> Result<&str, Diagnostic> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(type_mismatch("string", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, Diagnostic> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(type_mismatch("bool", other)),
        }
    }

    pub fn as_map(&self) -> Result<&BTreeMap<String, Value>, Diagnostic> {
        match self {
            Value::Map(m) => Ok(m),
            other => Err(type_mismatch("map", other)),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], Diagnostic> {
        match self {
            Value::List(l) => Ok(l),
            other => Err(type_mismatch("list", other)),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn from_string_list(items: impl IntoIterator<Item = impl Into<String>>) -> Value {
        Value::List(items.into_iter().map(|s| Value::String(s.into())).collect())
    }
}

fn type_mismatch(expected: &str, found: &Value) -> Diagnostic {
    Diagnostic::error(
        Category::Decode,
        format!("expected a {expected}, found a {}", found.type_name()),
    )
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                write!(f, "}}")
            }
            Value::Unknown => write!(f, "(unknown)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_is_a_decode_diagnostic() {
        let value = Value::Bool(true);
        let err = value.as_str().unwrap_err();
        assert_eq!(err.category, Category::Decode);
    }

    #[test]
    fn unknown_reports_unknown_type() {
        assert_eq!(Value::Unknown.type_name(), "unknown");
        assert!(Value::Unknown.is_unknown());
    }
}
