//! Structured diagnostics: the error currency passed between every bake component.
//!
//! A `Diagnostic` never gets wrapped by the component that produces it; it is
//! collected into a `Diagnostics` list and returned up the call stack as-is, the
//! way the upstream `hcl.Diagnostics` convention works.

use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single position in a recipe file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
    pub byte: usize,
}

/// A span of source text, used to point at the offending attribute or block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRange {
    pub filename: PathBuf,
    pub start: SourcePos,
    pub end: SourcePos,
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.filename.display(),
            self.start.line,
            self.start.column
        )
    }
}

/// The kind of problem a diagnostic reports. Not load-bearing for control flow,
/// only for presentation and for tests asserting a particular failure mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Decode,
    Reference,
    Planning,
    Execution,
    Io,
    Internal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub summary: String,
    pub detail: String,
    pub subject: Option<SourceRange>,
    pub context: Option<SourceRange>,
}

impl Diagnostic {
    pub fn error(category: Category, summary: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            category,
            summary: summary.into(),
            detail: String::new(),
            subject: None,
            context: None,
        }
    }

    pub fn warning(category: Category, summary: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            category,
            summary: summary.into(),
            detail: String::new(),
            subject: None,
            context: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_subject(mut self, range: SourceRange) -> Self {
        self.subject = Some(range);
        self
    }

    pub fn with_context(mut self, range: SourceRange) -> Self {
        self.context = Some(range);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.summary)?;
        if let Some(subject) = &self.subject {
            write!(f, " ({subject})")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// An accumulating list of diagnostics. Composes with `?` the same way a single
/// error would: `From<Diagnostic>` lifts one diagnostic into a one-element list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Diagnostics(vec![diagnostic])
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Diagnostics(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_diagnostic_has_errors() {
        let diags: Diagnostics = Diagnostic::error(Category::Reference, "unknown reference").into();
        assert!(diags.has_errors());
    }

    #[test]
    fn warnings_alone_do_not_count_as_errors() {
        let diags: Diagnostics = Diagnostic::warning(Category::Planning, "heads up").into();
        assert!(!diags.has_errors());
    }

    #[test]
    fn display_joins_multiple_diagnostics() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::error(Category::Decode, "bad attribute"));
        diags.push(Diagnostic::error(Category::Execution, "non-zero exit"));
        let rendered = diags.to_string();
        assert!(rendered.contains("bad attribute"));
        assert!(rendered.contains("non-zero exit"));
    }
}
