//! Terminal output for the move-stamp CLI, styled with [`console`].

use console::{style, StyledObject};

/// Width of the key column in [`print_key_value`].
const KEY_WIDTH: usize = 16;

fn tagged(tag: StyledObject<&str>, text: &str) {
    println!("{} {}", tag.bold(), text);
}

/// Banner for a subcommand, `move-stamp <command>` over a dim rule.
pub fn print_header(command: &str) {
    let title = format!("move-stamp {command}");
    println!("\n{}", style(&title).bold().cyan());
    println!("{}", style("-".repeat(title.len())).dim());
}

pub fn print_success(text: &str) {
    tagged(style("done").green(), text);
}

pub fn print_warning(text: &str) {
    tagged(style("warning:").yellow(), text);
}

/// `(2/3) Applying edit plan...`
pub fn print_step(step: u32, total: u32, text: &str) {
    println!("{} {}", style(format!("({step}/{total})")).dim(), text);
}

/// Indented `key: value` line with the keys aligned in one column.
pub fn print_key_value(key: &str, value: &str) {
    let key = format!("{key:<width$}", key = format!("{key}:"), width = KEY_WIDTH);
    println!("  {} {}", style(key).dim(), value);
}

/// One pool entry, `  [3] value`.
pub fn print_entry(index: usize, text: &str) {
    println!("  {} {}", style(format!("[{index}]")).dim(), text);
}

/// Signed size change, e.g. `+12 bytes`.
pub fn size_delta(before: usize, after: usize) -> String {
    if after >= before {
        format!("+{} bytes", after - before)
    } else {
        format!("-{} bytes", before - after)
    }
}
