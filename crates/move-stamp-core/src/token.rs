//! Preset for the fungible-token template.
//!
//! The template module is `template` with one-time witness `TEMPLATE` and
//! eight constants in a fixed order. [`TokenParams::edit_plan`] turns the
//! user-facing token settings into an [`EditPlan`] against those defaults.

use serde::{Deserialize, Serialize};

use crate::constant::ConstantType;
use crate::error::Result;
use crate::module::Module;
use crate::plan::{ConstantEdit, EditPlan, RenameMap};

/// Module name compiled into the token template.
pub const TEMPLATE_MODULE_NAME: &str = "template";

/// `(index, type, compiled default)` for every constant in the token template.
pub const TEMPLATE_CONSTANTS: [(usize, ConstantType, &str); 8] = [
    (0, ConstantType::U64, "100"),
    (1, ConstantType::U8, "9"),
    (2, ConstantType::String, "Symbol"),
    (3, ConstantType::String, "Name"),
    (4, ConstantType::String, "Description"),
    (5, ConstantType::String, "icon_url"),
    (6, ConstantType::U64, "1000"),
    (7, ConstantType::U64, "10000"),
];

/// Settings for one stamped token, as literals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenParams {
    pub module_name: String,
    pub total_supply: String,
    pub decimals: String,
    pub symbol: String,
    pub name: String,
    pub description: String,
    pub icon_url: String,
    pub mint_price: String,
    pub owner_allocation: String,
}

impl TokenParams {
    fn values(&self) -> [&str; 8] {
        [
            self.total_supply.as_str(),
            self.decimals.as_str(),
            self.symbol.as_str(),
            self.name.as_str(),
            self.description.as_str(),
            self.icon_url.as_str(),
            self.mint_price.as_str(),
            self.owner_allocation.as_str(),
        ]
    }

    /// Plan against the template's compiled defaults.
    pub fn edit_plan(&self) -> Result<EditPlan> {
        let defaults = TEMPLATE_CONSTANTS.map(|(_, _, default)| default.to_string());
        self.plan_with_defaults(&defaults, TEMPLATE_MODULE_NAME)
    }

    /// Plan against the values actually decoded from `template`.
    ///
    /// Use this when the template may have been recompiled with different
    /// placeholders; types and indices still come from the preset.
    pub fn edit_plan_for(&self, template: &Module) -> Result<EditPlan> {
        let mut defaults: [String; 8] = Default::default();
        for (slot, (index, _, _)) in defaults.iter_mut().zip(TEMPLATE_CONSTANTS) {
            *slot = template.constant_value(index)?.to_string();
        }
        let module_name = template.name().unwrap_or(TEMPLATE_MODULE_NAME);
        self.plan_with_defaults(&defaults, module_name)
    }

    fn plan_with_defaults(&self, defaults: &[String; 8], module_name: &str) -> Result<EditPlan> {
        let mut plan = EditPlan::new();
        for ((index, ty, _), (expected, value)) in TEMPLATE_CONSTANTS
            .into_iter()
            .zip(defaults.iter().zip(self.values()))
        {
            plan = plan.with_constant(ConstantEdit::parse(index, ty, expected, value)?);
        }
        Ok(plan.with_renames(RenameMap::module_rename(module_name, &self.module_name)))
    }
}
