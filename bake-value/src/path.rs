use std::fmt;

/// One step in a `Path`: either an attribute traversal (`.name`) or an index
/// traversal (`["key"]` / `[0]`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathStep {
    Attr(String),
    Index(IndexKey),
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    Str(String),
    Int(i64),
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Str(s) => write!(f, "{s:?}"),
            IndexKey::Int(i) => write!(f, "{i}"),
        }
    }
}

/// A canonical identifier for every addressable entity, e.g. `task.greet["en"]`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    pub fn root(name: impl Into<String>) -> Self {
        Path {
            steps: vec![PathStep::Attr(name.into())],
        }
    }

    pub fn attr(&self, name: impl Into<String>) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Attr(name.into()));
        Path { steps }
    }

    pub fn index_str(&self, key: impl Into<String>) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Index(IndexKey::Str(key.into())));
        Path { steps }
    }

    pub fn index_int(&self, key: i64) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Index(IndexKey::Int(key)));
        Path { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// The first step's attribute name, if any — the traversal's root.
    pub fn root_name(&self) -> Option<&str> {
        match self.steps.first() {
            Some(PathStep::Attr(name)) => Some(name),
            _ => None,
        }
    }

    /// True if `self` is `other`, or `other` extends `self` by one or more steps.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        if self.steps.len() > other.steps.len() {
            return false;
        }
        self.steps.iter().zip(other.steps.iter()).all(|(a, b)| a == b)
    }
}

impl FromIterator<PathStep> for Path {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        Path {
            steps: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Attr(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                PathStep::Index(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

/// A small set of paths answering "does any known prefix match this path?"
#[derive(Clone, Debug, Default)]
pub struct PathPrefixSet {
    prefixes: Vec<Path>,
}

impl PathPrefixSet {
    pub fn new() -> Self {
        PathPrefixSet { prefixes: Vec::new() }
    }

    pub fn insert(&mut self, prefix: Path) {
        self.prefixes.push(prefix);
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.prefixes.iter().any(|prefix| prefix.is_prefix_of(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_attribute_and_index_steps() {
        let path = Path::root("task").attr("greet").index_str("en");
        assert_eq!(path.to_string(), "task.greet[\"en\"]");
    }

    #[test]
    fn prefix_test_matches_ancestor_and_self() {
        let group = Path::root("task").attr("greet");
        let instance = group.index_str("en");
        assert!(group.is_prefix_of(&instance));
        assert!(group.is_prefix_of(&group));
        assert!(!instance.is_prefix_of(&group));
    }

    #[test]
    fn prefix_set_matches_ignored_roots() {
        let mut set = PathPrefixSet::new();
        set.insert(Path::root("path"));
        set.insert(Path::root("each"));
        assert!(set.matches(&Path::root("path").attr("root")));
        assert!(set.matches(&Path::root("each").attr("key")));
        assert!(!set.matches(&Path::root("task").attr("build")));
    }
}
