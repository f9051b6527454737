use std::path::Path;

use anyhow::{Context, Result};

use move_stamp_core::token::TokenParams;
use move_stamp_core::Module;

use crate::output;

/// Write the token edit plan for `params`.
///
/// Expected values come from the token preset, or from `template_path` when
/// one is given so a recompiled template with other placeholders still works.
pub fn run(params: &TokenParams, template_path: Option<&Path>, output_path: &Path) -> Result<()> {
    output::print_header("plan");

    let plan = match template_path {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            let module = Module::decode(&bytes)
                .with_context(|| format!("{} is not a valid module", path.display()))?;
            output::print_key_value("Defaults from", &module.to_string());
            params.edit_plan_for(&module)?
        }
        None => params.edit_plan()?,
    };

    plan.save(output_path)?;

    output::print_success("Edit plan written");
    output::print_key_value("Plan", &output_path.display().to_string());
    output::print_key_value("Constant edits", &plan.constants.len().to_string());
    for (from, to) in plan.renames.iter() {
        output::print_key_value("Rename", &format!("{from} -> {to}"));
    }

    Ok(())
}
