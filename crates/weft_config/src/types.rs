//! Configuration types deserialized from `weft.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level configuration parsed from `weft.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct IrConfig {
    /// Settings applied to every scope.
    #[serde(default)]
    pub ir: IrSettings,
    /// Per-scope overrides keyed by scope name.
    #[serde(default)]
    pub scopes: BTreeMap<String, ScopeOverride>,
}

/// Global construction settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IrSettings {
    /// Record host-program locations on nodes and statements.
    #[serde(default)]
    pub debug: bool,
    /// Reject SystemVerilog keywords as variable names.
    #[serde(default = "default_true")]
    pub check_keywords: bool,
    /// Extra names to reject in addition to the keyword list.
    #[serde(default)]
    pub reserved_names: Vec<String>,
}

impl Default for IrSettings {
    fn default() -> Self {
        Self {
            debug: false,
            check_keywords: true,
            reserved_names: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Settings for one named scope; unset fields fall back to [`IrSettings`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ScopeOverride {
    /// Overrides [`IrSettings::debug`] for this scope.
    pub debug: Option<bool>,
}
