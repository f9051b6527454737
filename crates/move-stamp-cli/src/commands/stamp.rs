use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use move_stamp_core::bundle::{PublishBundle, DEFAULT_DEPENDENCIES};
use move_stamp_core::{EditPlan, Module};

use crate::output;

/// Stamp a template module with an edit plan.
///
/// Writes the patched module to `output_path` and, when `bundle_path` is
/// given, a publish bundle holding the patched module followed by the
/// untouched `dependency_path` module.
pub fn run(
    template_path: &Path,
    plan_path: &Path,
    output_path: &Path,
    dependency_path: Option<&Path>,
    bundle_path: Option<&Path>,
) -> Result<()> {
    output::print_header("stamp");

    let total = if bundle_path.is_some() { 4 } else { 3 };

    output::print_step(1, total, "Decoding template...");
    let template = std::fs::read(template_path)
        .with_context(|| format!("failed to read {}", template_path.display()))?;
    let module = Module::decode(&template)
        .with_context(|| format!("{} is not a valid module", template_path.display()))?;
    output::print_key_value("Template", &module.to_string());

    output::print_step(2, total, "Applying edit plan...");
    let plan = EditPlan::load(plan_path)?;
    if plan.is_empty() {
        output::print_warning("Edit plan is empty; output will equal the template");
    }
    let stamped = plan.apply(module)?;
    output::print_key_value("Stamped", &stamped.to_string());
    let bytes = stamped.encode()?;

    output::print_step(3, total, "Writing module...");
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, &bytes)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    if let Some(bundle_path) = bundle_path {
        output::print_step(4, total, "Writing publish bundle...");
        let dependency = dependency_path
            .map(|p| {
                std::fs::read(p).with_context(|| format!("failed to read {}", p.display()))
            })
            .transpose()?;
        let companions: Vec<&[u8]> = dependency.iter().map(Vec::as_slice).collect();
        let bundle = PublishBundle::new(&bytes, &companions, &DEFAULT_DEPENDENCIES)?;
        bundle.save(bundle_path)?;
        output::print_key_value("Bundle", &bundle_path.display().to_string());
    } else if dependency_path.is_some() {
        output::print_warning("--dependency is only used together with --bundle");
    }

    output::print_success("Module stamped");
    output::print_key_value("Output", &output_path.display().to_string());
    output::print_key_value(
        "Size",
        &format!(
            "{} bytes ({})",
            bytes.len(),
            output::size_delta(template.len(), bytes.len())
        ),
    );
    output::print_key_value("SHA-256", &fingerprint(&bytes));

    Ok(())
}

/// Hex SHA-256 of the stamped module.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
