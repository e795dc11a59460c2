use async_trait::async_trait;
use bake_diagnostic::Diagnostics;
use bake_value::{Path, Value};

use crate::convert::evaluate;
use crate::partial::PartialAttribute;
use crate::{Action, ApplyContext};

/// A named expression bound once to an immutable Value. Never executes and
/// is never persisted to the lock.
pub struct Local {
    name: String,
    path: Path,
    filename: std::path::PathBuf,
    value: Value,
}

#[async_trait]
impl Action for Local {
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
        crate::ActionKind::Local
    }

    fn cty_value(&self) -> Value {
        self.value.clone()
    }

    async fn apply(&self, _ctx: &ApplyContext) -> Diagnostics {
        Diagnostics::new()
    }
}

pub fn decode(
    attribute: &PartialAttribute,
    ctx: &hcl::eval::Context<'_>,
) -> Result<Vec<Box<dyn Action>>, Diagnostics> {
    let value = evaluate(&attribute.expr, ctx).map_err(Diagnostics::from)?;
    Ok(vec![Box::new(Local {
        name: attribute.name.clone(),
        path: attribute.path.clone(),
        filename: attribute.filename.clone(),
        value,
    })])
}
