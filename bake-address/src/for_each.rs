use bake_diagnostic::{Category, Diagnostic};
use bake_value::Value;

/// One `key`/`value` pair injected as `each` inside a `for_each`-expanded
/// instance. For a set of strings, key and value are the same string,
/// matching how a list-shaped `for_each` behaves upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForEach {
    pub key: String,
    pub value: String,
}

impl ForEach {
    /// Evaluates a `for_each` Value (list of strings, or string→string map)
    /// into its ordered entries. Ordered by key so instance application order
    /// is deterministic across runs.
    pub fn entries(value: &Value) -> Result<Vec<ForEach>, Diagnostic> {
        match value {
            Value::List(items) => {
                let mut entries = Vec::with_capacity(items.len());
                for item in items {
                    let s = item.as_str().map_err(|_| {
                        Diagnostic::error(Category::Decode, "for_each set entries must be strings")
                    })?;
                    entries.push(ForEach {
                        key: s.to_string(),
                        value: s.to_string(),
                    });
                }
                entries.sort_by(|a, b| a.key.cmp(&b.key));
                Ok(entries)
            }
            Value::Map(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, value) in map {
                    let value = value
                        .as_str()
                        .map_err(|_| Diagnostic::error(Category::Decode, "for_each map values must be strings"))?;
                    entries.push(ForEach {
                        key: key.clone(),
                        value: value.to_string(),
                    });
                }
                Ok(entries)
            }
            other => Err(Diagnostic::error(
                Category::Decode,
                format!("for_each must be a set of strings or a string map, found a {}", other.type_name()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn set_entries_use_value_as_key() {
        let value = Value::from_string_list(["en", "de"]);
        let entries = ForEach::entries(&value).unwrap();
        assert_eq!(entries[0], ForEach { key: "de".into(), value: "de".into() });
        assert_eq!(entries[1], ForEach { key: "en".into(), value: "en".into() });
    }

    #[test]
    fn map_entries_keep_distinct_key_and_value() {
        let mut map = BTreeMap::new();
        map.insert("en".to_string(), Value::String("Hello".into()));
        map.insert("de".to_string(), Value::String("Hallo".into()));
        let entries = ForEach::entries(&Value::Map(map)).unwrap();
        assert_eq!(entries[0], ForEach { key: "de".into(), value: "Hallo".into() });
        assert_eq!(entries[1], ForEach { key: "en".into(), value: "Hello".into() });
    }

    #[test]
    fn non_map_non_list_is_a_decode_error() {
        let err = ForEach::entries(&Value::Bool(true)).unwrap_err();
        assert_eq!(err.category, Category::Decode);
    }
}
