use std::path::Path;

use anyhow::{Context, Result};

use move_stamp_core::Module;

use crate::output;

/// Print what a plan author needs to know about a compiled module.
///
/// Constants are shown decoded, in pool order, so expected values can be
/// copied straight into an edit plan.
pub fn run(module_path: &Path) -> Result<()> {
    output::print_header("inspect");

    let bytes = std::fs::read(module_path)
        .with_context(|| format!("failed to read {}", module_path.display()))?;
    let module = Module::decode(&bytes)
        .with_context(|| format!("{} is not a valid module", module_path.display()))?;

    output::print_key_value("File", &module_path.display().to_string());
    output::print_key_value("Size", &format!("{} bytes", bytes.len()));
    output::print_key_value("Version", &module.version().to_string());
    if module.flavor() != 0 {
        output::print_key_value("Flavor", &format!("0x{:02x}", module.flavor()));
    }
    output::print_key_value("Name", module.name().unwrap_or("<unnamed>"));

    println!("\nIdentifiers ({})", module.identifiers().len());
    for (i, ident) in module.identifiers().iter().enumerate() {
        output::print_entry(i, ident);
    }

    println!("\nConstants ({})", module.constants().len());
    for (i, constant) in module.constants().iter().enumerate() {
        match module.constant_value(i) {
            Ok(value) => output::print_entry(i, &format!("{} = {}", value.ty(), value)),
            Err(_) => output::print_entry(
                i,
                &format!("{} ({} bytes, not editable)", constant.ty, constant.data.len()),
            ),
        }
    }

    Ok(())
}
