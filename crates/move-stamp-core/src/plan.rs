//! Edit plans: the full set of constant edits and identifier renames applied
//! to one template, plus JSON persistence.
//!
//! A plan file looks like:
//!
//! ```json
//! {
//!   "constants": [
//!     { "index": 0, "type": "u64", "expected": "100", "value": "10000000000000000" },
//!     { "index": 2, "type": "string", "expected": "Symbol", "value": "JOKE" }
//!   ],
//!   "renames": { "template": "joke_papa", "TEMPLATE": "JOKE_PAPA" }
//! }
//! ```
//!
//! Literals are validated against their type while the plan is loaded, so a
//! plan that deserializes is a plan whose values all fit their constants.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constant::{ConstantType, ConstantValue};
use crate::error::{Result, StampError};
use crate::module::Module;

/// One constant edit: at `index`, replace `expected` with `value`.
///
/// Both values always have the same type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConstantEditRecord", into = "ConstantEditRecord")]
pub struct ConstantEdit {
    index: usize,
    expected: ConstantValue,
    value: ConstantValue,
}

impl ConstantEdit {
    pub fn new(index: usize, expected: ConstantValue, value: ConstantValue) -> Result<Self> {
        if expected.ty() != value.ty() {
            return Err(StampError::TypeMismatch {
                index,
                expected: expected.ty().to_string(),
                found: value.ty().to_string(),
            });
        }
        Ok(Self {
            index,
            expected,
            value,
        })
    }

    /// Build an edit from literals, rejecting either one if it does not fit `ty`.
    pub fn parse(index: usize, ty: ConstantType, expected: &str, value: &str) -> Result<Self> {
        Ok(Self {
            index,
            expected: ConstantValue::parse(ty, expected)?,
            value: ConstantValue::parse(ty, value)?,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn ty(&self) -> ConstantType {
        self.value.ty()
    }

    pub fn expected(&self) -> &ConstantValue {
        &self.expected
    }

    pub fn value(&self) -> &ConstantValue {
        &self.value
    }
}

#[derive(Serialize, Deserialize)]
struct ConstantEditRecord {
    index: usize,
    #[serde(rename = "type")]
    ty: ConstantType,
    expected: String,
    value: String,
}

impl TryFrom<ConstantEditRecord> for ConstantEdit {
    type Error = StampError;

    fn try_from(record: ConstantEditRecord) -> Result<Self> {
        Self::parse(record.index, record.ty, &record.expected, &record.value)
    }
}

impl From<ConstantEdit> for ConstantEditRecord {
    fn from(edit: ConstantEdit) -> Self {
        Self {
            index: edit.index,
            ty: edit.ty(),
            expected: edit.expected.to_string(),
            value: edit.value.to_string(),
        }
    }
}

/// Exact-match identifier renames, `old -> new`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenameMap(BTreeMap<String, String>);

impl RenameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename a module and its one-time witness.
    ///
    /// Produces both `from -> to` and the all-uppercase `FROM -> TO`, so the
    /// companion entry is visible in the map rather than derived on the fly.
    /// When `from` is already uppercase there is no companion to add.
    pub fn module_rename(from: &str, to: &str) -> Self {
        let mut map = Self::new();
        map.insert(from, to);
        let upper = from.to_uppercase();
        if upper != from {
            map.insert(upper, to.to_uppercase());
        }
        map
    }

    /// Add or replace a rename, returning the previous target for `from`.
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) -> Option<String> {
        self.0.insert(from.into(), to.into())
    }

    pub fn get(&self, from: &str) -> Option<&str> {
        self.0.get(from).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything needed to turn a template into one specialized module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPlan {
    /// Applied in order, before any renames.
    #[serde(default)]
    pub constants: Vec<ConstantEdit>,
    #[serde(default)]
    pub renames: RenameMap,
}

impl EditPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constant(mut self, edit: ConstantEdit) -> Self {
        self.constants.push(edit);
        self
    }

    pub fn with_renames(mut self, renames: RenameMap) -> Self {
        for (from, to) in renames.iter() {
            self.renames.insert(from, to);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty() && self.renames.is_empty()
    }

    /// Apply constant edits in order, then renames.
    ///
    /// Takes the module by value: on error it is dropped, so a half-patched
    /// module never reaches the caller. Decode the template again to retry.
    pub fn apply(&self, mut module: Module) -> Result<Module> {
        for edit in &self.constants {
            module.update_constant(edit)?;
        }
        let renamed = module.rename_identifiers(&self.renames)?;
        tracing::info!(
            constants = self.constants.len(),
            renamed,
            "applied edit plan"
        );
        Ok(module)
    }

    /// Load a plan from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StampError::ConfigNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| StampError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save the plan as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| StampError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Decode `template`, apply `plan` and encode the result.
pub fn stamp(template: &[u8], plan: &EditPlan) -> Result<Vec<u8>> {
    let module = Module::decode(template)?;
    plan.apply(module)?.encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    #[test]
    fn test_empty_plan_is_identity() {
        let bytes = fixture::template_bytes();
        assert_eq!(stamp(&bytes, &EditPlan::new()).unwrap(), bytes);
    }

    #[test]
    fn test_module_rename_adds_uppercase_companion() {
        let renames = RenameMap::module_rename("template", "joke_papa");
        assert_eq!(renames.len(), 2);
        assert_eq!(renames.get("template"), Some("joke_papa"));
        assert_eq!(renames.get("TEMPLATE"), Some("JOKE_PAPA"));
    }

    #[test]
    fn test_module_rename_uppercase_source_keeps_target() {
        let renames = RenameMap::module_rename("TOKEN", "joke");
        assert_eq!(renames.len(), 1);
        assert_eq!(renames.get("TOKEN"), Some("joke"));
    }

    #[test]
    fn test_edit_new_rejects_mixed_types() {
        let err = ConstantEdit::new(0, ConstantValue::U64(1), ConstantValue::U8(1)).unwrap_err();
        assert!(matches!(err, StampError::TypeMismatch { .. }));
    }

    #[test]
    fn test_edit_parse_rejects_bad_literals_before_touching_module() {
        assert!(matches!(
            ConstantEdit::parse(1, ConstantType::U8, "9", "300").unwrap_err(),
            StampError::EncodingRange { .. }
        ));
        assert!(matches!(
            ConstantEdit::parse(0, ConstantType::U64, "one hundred", "5").unwrap_err(),
            StampError::InvalidLiteral { .. }
        ));
    }

    #[test]
    fn test_apply_stops_at_first_mismatch() {
        let module = Module::decode(&fixture::template_bytes()).unwrap();
        let plan = EditPlan::new()
            .with_constant(ConstantEdit::parse(0, ConstantType::U64, "100", "1").unwrap())
            .with_constant(ConstantEdit::parse(1, ConstantType::U8, "8", "3").unwrap());
        assert!(matches!(
            plan.apply(module).unwrap_err(),
            StampError::Mismatch { index: 1, .. }
        ));
    }

    #[test]
    fn test_plan_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        let plan = EditPlan::new()
            .with_constant(ConstantEdit::parse(0, ConstantType::U64, "100", "5").unwrap())
            .with_constant(
                ConstantEdit::parse(2, ConstantType::String, "Symbol", "JOKE").unwrap(),
            )
            .with_renames(RenameMap::module_rename("template", "joke_papa"));
        plan.save(&path).unwrap();
        let loaded = EditPlan::load(&path).unwrap();
        assert_eq!(loaded, plan);
    }

    #[test]
    fn test_plan_json_format() {
        let json = r#"{
            "constants": [
                { "index": 1, "type": "u8", "expected": "9", "value": "3" }
            ],
            "renames": { "template": "joke_papa" }
        }"#;
        let plan: EditPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.constants[0].index(), 1);
        assert_eq!(plan.constants[0].value(), &ConstantValue::U8(3));
        assert_eq!(plan.renames.get("template"), Some("joke_papa"));
    }

    #[test]
    fn test_plan_json_rejects_out_of_range_value() {
        let json = r#"{ "constants": [
            { "index": 1, "type": "u8", "expected": "9", "value": "256" }
        ] }"#;
        let err = serde_json::from_str::<EditPlan>(json).unwrap_err();
        assert!(err.to_string().contains("does not fit in u8"));
    }

    #[test]
    fn test_plan_defaults_when_fields_missing() {
        let plan: EditPlan = serde_json::from_str("{}").unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let result = EditPlan::load(Path::new("/tmp/nonexistent_move_stamp_plan.json"));
        assert!(matches!(result, Err(StampError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EditPlan::load(&path),
            Err(StampError::ConfigParse { .. })
        ));
    }
}
