use std::path::{Path as FsPath, PathBuf};

use bake_diagnostic::Diagnostics;
use bake_value::Path;

use crate::expr::variables_in;
use crate::{data, task, Action, Address};

pub const TASK_LABEL: &str = "task";
pub const DATA_LABEL: &str = "data";
pub const LOCALS_LABEL: &str = "locals";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Task,
    Data,
}

/// A pre-decode handle: carries the raw block/expression body and a cheap
/// `dependencies()` over it, but nothing evaluated yet.
pub enum Partial {
    Block(PartialBlock),
    Attribute(PartialAttribute),
}

pub struct PartialBlock {
    pub kind: BlockKind,
    pub name: String,
    pub path: Path,
    pub filename: PathBuf,
    pub body: hcl::Body,
}

pub struct PartialAttribute {
    pub name: String,
    pub path: Path,
    pub filename: PathBuf,
    pub expr: hcl::Expression,
}

/// Splits a top-level block into one or more partials: `locals` blocks split
/// into one partial per attribute (each independently addressable as
/// `local.<name>`); every other block type becomes a single partial.
pub fn from_block(block: &hcl::Block, filename: &FsPath) -> Result<Vec<Partial>, Diagnostics> {
    let identifier = block.identifier();

    if identifier == LOCALS_LABEL {
        let mut partials = Vec::new();
        for attribute in block.body().attributes() {
            let name = attribute.key().to_string();
            partials.push(Partial::Attribute(PartialAttribute {
                path: Path::root("local").attr(&name),
                name,
                filename: filename.to_path_buf(),
                expr: attribute.expr().clone(),
            }));
        }
        return Ok(partials);
    }

    let kind = match identifier {
        TASK_LABEL => BlockKind::Task,
        DATA_LABEL => BlockKind::Data,
        other => {
            return Err(bake_diagnostic::Diagnostic::error(
                bake_diagnostic::Category::Decode,
                format!("unrecognized block type {other:?}"),
            )
            .into())
        }
    };

    let name = block
        .labels()
        .first()
        .map(|label| label.as_str().to_string())
        .unwrap_or_default();

    // Tasks are bare (`build`, no `task.` prefix); data is prefixed by its
    // block type, matching `addressBlock.GetPath` upstream.
    let path = match kind {
        BlockKind::Task => Path::root(&name),
        BlockKind::Data => Path::root(DATA_LABEL).attr(&name),
    };

    Ok(vec![Partial::Block(PartialBlock {
        kind,
        name,
        path,
        filename: filename.to_path_buf(),
        body: block.body().clone(),
    })])
}

impl Address for Partial {
    fn name(&self) -> &str {
        match self {
            Partial::Block(b) => &b.name,
            Partial::Attribute(a) => &a.name,
        }
    }

    fn path(&self) -> &Path {
        match self {
            Partial::Block(b) => &b.path,
            Partial::Attribute(a) => &a.path,
        }
    }

    fn filename(&self) -> &FsPath {
        match self {
            Partial::Block(b) => &b.filename,
            Partial::Attribute(a) => &a.filename,
        }
    }

    fn dependencies(&self) -> Result<Vec<Path>, Diagnostics> {
        match self {
            Partial::Block(b) => {
                let mut deps = Vec::new();
                for attribute in b.body.attributes() {
                    deps.extend(variables_in(attribute.expr()));
                }
                Ok(deps)
            }
            Partial::Attribute(a) => Ok(variables_in(&a.expr)),
        }
    }
}

/// A partial that can be decoded into one or more Actions given an
/// already-assembled evaluation context.
pub trait RawAddress {
    fn decode(&self, ctx: &hcl::eval::Context<'_>) -> Result<Vec<Box<dyn Action>>, Diagnostics>;
}

impl RawAddress for Partial {
    fn decode(&self, ctx: &hcl::eval::Context<'_>) -> Result<Vec<Box<dyn Action>>, Diagnostics> {
        match self {
            Partial::Block(block) => match block.kind {
                BlockKind::Task => task::decode(block, ctx),
                BlockKind::Data => data::decode(block, ctx),
            },
            Partial::Attribute(attribute) => crate::local::decode(attribute, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_block_path_has_no_prefix() {
        let body = hcl::Body::builder().build();
        let block = hcl::Block::builder(TASK_LABEL).add_label("build").build_with_body(body);
        let partials = from_block(&block, FsPath::new("x.hcl")).unwrap();
        assert_eq!(partials.len(), 1);
        assert_eq!(partials[0].path().to_string(), "build");
    }

    #[test]
    fn data_block_path_is_prefixed() {
        let body = hcl::Body::builder().build();
        let block = hcl::Block::builder(DATA_LABEL).add_label("tag").build_with_body(body);
        let partials = from_block(&block, FsPath::new("x.hcl")).unwrap();
        assert_eq!(partials[0].path().to_string(), "data.tag");
    }

    #[test]
    fn locals_block_splits_into_one_partial_per_attribute() {
        let body = hcl::Body::builder()
            .add_attribute(("a", hcl::Expression::String("1".into())))
            .add_attribute(("b", hcl::Expression::String("2".into())))
            .build();
        let block = hcl::Block::builder(LOCALS_LABEL).build_with_body(body);
        let partials = from_block(&block, FsPath::new("x.hcl")).unwrap();
        assert_eq!(partials.len(), 2);
    }
}
