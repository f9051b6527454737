//! In-place constant and identifier edits on a decoded [`Module`].
//!
//! Both operations check everything they need before writing, so a call that
//! returns an error leaves the module exactly as it was.

use crate::constant::ConstantValue;
use crate::error::{Result, StampError};
use crate::module::{Module, MAX_IDENTIFIER_LENGTH};
use crate::plan::{ConstantEdit, RenameMap};

impl Module {
    /// Overwrite one constant, after asserting its current value.
    ///
    /// The constant's declared type must be the edit's type and its decoded
    /// payload must equal `edit.expected()`; otherwise the template has drifted
    /// from what the caller believes and nothing is written.
    pub fn update_constant(&mut self, edit: &ConstantEdit) -> Result<()> {
        let index = edit.index();
        let ty = edit.ty();
        let constant = self.constant(index)?;

        if constant.ty != ty.signature() {
            return Err(StampError::TypeMismatch {
                index,
                expected: ty.to_string(),
                found: constant.ty.to_string(),
            });
        }

        let current = ConstantValue::from_bcs(ty, &constant.data).map_err(|_| {
            StampError::Mismatch {
                index,
                expected: edit.expected().to_string(),
                found: format!("<undecodable 0x{}>", hex::encode(&constant.data)),
            }
        })?;
        if &current != edit.expected() {
            return Err(StampError::Mismatch {
                index,
                expected: edit.expected().to_string(),
                found: current.to_string(),
            });
        }

        let data = edit.value().to_bcs();
        tracing::debug!(index, %ty, old = %current, new = %edit.value(), "patched constant");
        self.constants_mut()[index].data = data;
        Ok(())
    }

    /// Replace every identifier that exactly matches a key of `renames`.
    ///
    /// Entries keep their pool index. Keys that match nothing are ignored,
    /// whatever they map to.
    /// Handle references are checked before and after the rewrite, so a
    /// module with dangling handles is rejected untouched.
    /// Returns the number of identifiers rewritten.
    pub fn rename_identifiers(&mut self, renames: &RenameMap) -> Result<usize> {
        self.check_references()?;

        let updates: Vec<(usize, String)> = self
            .identifiers()
            .iter()
            .enumerate()
            .filter_map(|(i, ident)| match renames.get(ident) {
                Some(to) if to != ident.as_str() => Some((i, to.to_string())),
                _ => None,
            })
            .collect();

        for (_, to) in &updates {
            if !is_valid_identifier(to) || to.len() > MAX_IDENTIFIER_LENGTH {
                return Err(StampError::InvalidIdentifier(to.clone()));
            }
        }

        let mut next: Vec<&str> = self.identifiers().iter().map(String::as_str).collect();
        for (i, to) in &updates {
            next[*i] = to.as_str();
        }
        for (_, to) in &updates {
            if next.iter().filter(|name| **name == to.as_str()).count() > 1 {
                return Err(StampError::DuplicateIdentifier(to.clone()));
            }
        }

        let pool = self.identifiers_mut();
        for (i, to) in &updates {
            let from = std::mem::replace(&mut pool[*i], to.clone());
            tracing::debug!(index = i, %from, %to, "renamed identifier");
        }

        self.check_references()?;
        Ok(updates.len())
    }
}

/// Whether `s` is a legal Move identifier.
///
/// `[A-Za-z][A-Za-z0-9_]*`, or `_` followed by at least one `[A-Za-z0-9_]`.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let rest_ok = |rest: &str| rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => rest_ok(chars.as_str()),
        Some('_') => !chars.as_str().is_empty() && rest_ok(chars.as_str()),
        _ => false,
    }
}
