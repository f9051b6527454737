//! Publish bundles: what gets handed to whoever submits the package.
//!
//! A bundle lists the module binaries in publish order (the stamped module
//! first, then its untouched dependency module) and the on-chain packages the
//! package links against. Saved as `publish_bundle.json` by the CLI.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constant::{parse_address, ConstantValue};
use crate::error::{Result, StampError};

/// Framework packages every stamped token links against.
pub const DEFAULT_DEPENDENCIES: [&str; 2] = ["0x1", "0x2"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishBundle {
    /// Hex-encoded module binaries, in publish order.
    pub modules: Vec<String>,
    /// Dependency package ids, normalized to `0x` + 64 hex digits.
    pub dependencies: Vec<String>,
}

impl PublishBundle {
    /// Bundle the stamped module, followed by any companion modules.
    pub fn new<S: AsRef<str>>(
        stamped: &[u8],
        companions: &[&[u8]],
        dependencies: &[S],
    ) -> Result<Self> {
        let modules = std::iter::once(stamped)
            .chain(companions.iter().copied())
            .map(hex::encode)
            .collect();
        let dependencies = dependencies
            .iter()
            .map(|d| normalize_object_id(d.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            modules,
            dependencies,
        })
    }

    /// Decode the module binaries back to bytes.
    pub fn module_bytes(&self) -> Result<Vec<Vec<u8>>> {
        self.modules
            .iter()
            .enumerate()
            .map(|(i, m)| {
                hex::decode(m).map_err(|e| StampError::InvalidLiteral {
                    ty: format!("hex module #{i}"),
                    value: e.to_string(),
                })
            })
            .collect()
    }

    /// Save the bundle to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| StampError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a bundle from `path`.
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
}

/// `0x2` -> `0x000...002`, lowercase, 64 hex digits.
pub fn normalize_object_id(id: &str) -> Result<String> {
    parse_address(id).map(|addr| ConstantValue::Address(addr).to_string())
}
