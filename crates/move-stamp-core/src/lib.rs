//! Core library for the move-stamp toolkit.
//!
//! Turns one compiled, generic Move module (the template) into a specialized
//! module by rewriting constants and renaming identifiers, without going back
//! to source:
//!
//! ```text
//! template bytes --Module::decode--> Module --EditPlan::apply--> Module --encode--> bytes
//! ```
//!
//! - [`module`] decodes and re-encodes the binary format; `encode(decode(b)) == b`.
//! - [`patcher`] adds [`Module::update_constant`] and [`Module::rename_identifiers`].
//! - [`plan`] groups edits into an [`EditPlan`] that can be stored as JSON.
//! - [`token`] is the preset for the fungible-token template.
//! - [`bundle`] packages the result for whoever publishes it.

pub mod bundle;
pub mod constant;
pub mod cursor;
pub mod error;
pub mod module;
pub mod patcher;
pub mod plan;
pub mod signature;
pub mod token;

#[cfg(test)]
mod fixture;

pub use constant::{ConstantType, ConstantValue};
pub use error::{Result, StampError};
pub use module::Module;
pub use plan::{stamp, ConstantEdit, EditPlan, RenameMap};
