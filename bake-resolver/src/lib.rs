//! The topological resolver: component D. Depth-first search with
//! three-color marking over a goal partial and the full set of partials.

use std::collections::HashMap;

use bake_address::{Address, Partial};
use bake_diagnostic::{Category, Diagnostic, Diagnostics};
use bake_value::{Path, PathPrefixSet};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Unmarked,
    InProgress,
    Done,
}

/// Resolves the dependency-ordered sequence of partials ending at `goal`'s
/// own partial, such that every prerequisite precedes every dependent. The
/// sequence is deduplicated.
pub fn resolve_order(goal: &Path, partials: &[Partial], ignored: &PathPrefixSet) -> Result<Vec<usize>, Diagnostics> {
    let goal_index = find_partial(goal, partials).ok_or_else(|| unknown_reference(goal, partials))?;

    let mut color = vec![Color::Unmarked; partials.len()];
    let mut order = Vec::new();
    visit(goal_index, partials, ignored, &mut color, &mut order, &mut Vec::new())?;
    log::debug!("resolved {} to a {}-node order", goal, order.len());
    Ok(order)
}

/// For every partial reachable from `goal`, its own ordered (deduplicated)
/// list of prerequisite partial indices. Used by the coordinator to compute
/// each node's wait-set cheaply.
pub fn all_dependencies(
    goal: &Path,
    partials: &[Partial],
    ignored: &PathPrefixSet,
) -> Result<HashMap<usize, Vec<usize>>, Diagnostics> {
    let order = resolve_order(goal, partials, ignored)?;
    let mut map = HashMap::new();
    for &index in &order {
        let deps = partials[index]
            .dependencies()?
            .into_iter()
            .filter(|p| !ignored.matches(p))
            .filter_map(|p| find_partial(&p, partials))
            .filter(|&d| d != index)
            .collect::<Vec<_>>();
        map.insert(index, dedup(deps));
    }
    Ok(map)
}

fn visit(
    index: usize,
    partials: &[Partial],
    ignored: &PathPrefixSet,
    color: &mut [Color],
    order: &mut Vec<usize>,
    stack: &mut Vec<usize>,
) -> Result<(), Diagnostics> {
    match color[index] {
        Color::Done => return Ok(()),
        Color::InProgress => {
            let chain: Vec<String> = stack
                .iter()
                .skip_while(|&&i| i != index)
                .map(|&i| partials[i].path().to_string())
                .chain(std::iter::once(partials[index].path().to_string()))
                .collect();
            return Err(Diagnostic::error(Category::Reference, "cyclical dependency detected")
                .with_detail(chain.join(" -> "))
                .into());
        }
        Color::Unmarked => {}
    }

    color[index] = Color::InProgress;
    stack.push(index);

    let deps = partials[index].dependencies()?;
    for dep in deps {
        if ignored.matches(&dep) {
            continue;
        }
        let dep_index = find_partial(&dep, partials).ok_or_else(|| unknown_reference(&dep, partials))?;
        if dep_index == index {
            continue;
        }
        visit(dep_index, partials, ignored, color, order, stack)?;
    }

    stack.pop();
    color[index] = Color::Done;
    order.push(index);
    Ok(())
}

/// Resolves a dependency path to the unique partial whose own path is a
/// prefix of it, preferring the most specific (longest) match.
fn find_partial(path: &Path, partials: &[Partial]) -> Option<usize> {
    partials
        .iter()
        .enumerate()
        .filter(|(_, partial)| partial.path().is_prefix_of(path))
        .max_by_key(|(_, partial)| partial.path().steps().len())
        .map(|(index, _)| index)
}

fn unknown_reference(path: &Path, partials: &[Partial]) -> Diagnostics {
    let candidates: Vec<String> = partials.iter().map(|p| p.path().to_string()).collect();
    let target = path.to_string();
    let suggestion = candidates
        .iter()
        .max_by(|a, b| {
            strsim::jaro_winkler(&target, a)
                .partial_cmp(&strsim::jaro_winkler(&target, b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned();

    let mut diagnostic = Diagnostic::error(Category::Reference, format!("unknown reference {target:?}"));
    if let Some(suggestion) = suggestion {
        diagnostic = diagnostic.with_detail(format!("did you mean {suggestion:?}?"));
    }
    diagnostic.into()
}

fn dedup(mut items: Vec<usize>) -> Vec<usize> {
    let mut seen = std::collections::HashSet::new();
    items.retain(|i| seen.insert(*i));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use bake_address::loader;
    use std::io::Write;

    fn write_recipe(dir: &std::path::Path, name: &str, contents: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    fn default_ignored() -> PathPrefixSet {
        let mut ignored = PathPrefixSet::new();
        ignored.insert(Path::root("path"));
        ignored.insert(Path::root("each"));
        ignored
    }

    #[test]
    fn phony_chain_orders_prerequisite_before_dependent() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            "a.hcl",
            r#"
            task "a" { command = "echo A" }
            task "b" { command = "cat", depends_on = [a] }
            "#,
        );
        let partials = loader::load_recipes(dir.path()).unwrap();
        let order = resolve_order(&Path::root("b"), &partials, &default_ignored()).unwrap();
        let rendered: Vec<String> = order.iter().map(|&i| partials[i].path().to_string()).collect();
        let a_index = rendered.iter().position(|p| p == "a").unwrap();
        let b_index = rendered.iter().position(|p| p == "b").unwrap();
        assert!(a_index < b_index);
    }

    #[test]
    fn cycle_is_reported_with_full_chain() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            "a.hcl",
            r#"
            task "a" { command = "true", depends_on = [b] }
            task "b" { command = "true", depends_on = [a] }
            "#,
        );
        let partials = loader::load_recipes(dir.path()).unwrap();
        let err = resolve_order(&Path::root("a"), &partials, &default_ignored()).unwrap_err();
        assert!(err.to_string().contains("a -> b -> a") || err.to_string().contains("b -> a -> b"));
    }
}
