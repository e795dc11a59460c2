//! The recipe loader: component H. Enumerates `.hcl` files in a directory
//! and turns every top-level block into one or more partials.

use std::fs;
use std::path::Path as FsPath;

use bake_diagnostic::{Category, Diagnostic, Diagnostics};

use crate::partial::{from_block, Partial};

const RECIPE_EXTENSION: &str = "hcl";

/// Loads every recipe file directly inside `dir`, in filename order (so that
/// diagnostics and partial ordering are deterministic across runs).
pub fn load_recipes(dir: &FsPath) -> Result<Vec<Partial>, Diagnostics> {
    let mut filenames: Vec<_> = fs::read_dir(dir)
        .map_err(|e| {
            Diagnostics::from(Diagnostic::error(Category::Io, "failed to read recipe directory").with_detail(e.to_string()))
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(RECIPE_EXTENSION))
        .collect();
    filenames.sort();

    let mut partials = Vec::new();
    for filename in filenames {
        let contents = fs::read_to_string(&filename).map_err(|e| {
            Diagnostics::from(
                Diagnostic::error(Category::Io, format!("failed to read {}", filename.display()))
                    .with_detail(e.to_string()),
            )
        })?;

        let body: hcl::Body = hcl::from_str(&contents).map_err(|e| {
            Diagnostics::from(
                Diagnostic::error(Category::Decode, format!("failed to parse {}", filename.display()))
                    .with_detail(e.to_string()),
            )
        })?;

        for block in body.blocks() {
            partials.extend(from_block(block, &filename)?);
        }
    }

    Ok(partials)
}
