//! Scope resolution: merging global settings with per-scope overrides.

use crate::types::IrConfig;

/// The effective settings for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeSettings {
    /// Whether nodes created in the scope record host-program locations.
    pub debug: bool,
}

/// Resolves the settings for the scope called `name`.
///
/// Global `[ir]` settings form the base; a matching `[scopes.<name>]` table
/// overrides any field it sets.
pub fn resolve_scope(config: &IrConfig, name: &str) -> ScopeSettings {
    let mut settings = ScopeSettings {
        debug: config.ir.debug,
    };
    if let Some(over) = config.scopes.get(name) {
        if let Some(debug) = over.debug {
            settings.debug = debug;
        }
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn global_setting_applies_without_override() {
        let config = load_config_from_str("[ir]\ndebug = true").unwrap();
        assert!(resolve_scope(&config, "top").debug);
    }

    #[test]
    fn override_wins() {
        let config =
            load_config_from_str("[ir]\ndebug = true\n[scopes.top]\ndebug = false").unwrap();
        assert!(!resolve_scope(&config, "top").debug);
        assert!(resolve_scope(&config, "child").debug);
    }

    #[test]
    fn override_without_field_falls_back() {
        let config = load_config_from_str("[ir]\ndebug = true\n[scopes.top]\n").unwrap();
        assert!(resolve_scope(&config, "top").debug);
    }
}
