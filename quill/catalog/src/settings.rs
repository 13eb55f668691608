//! Configuration-parameter names: the compile-time set of built-in options
//! plus names registered by loaded extensions. Both feed the candidate list
//! of the unrecognized-parameter diagnostic.

use std::collections::BTreeSet;
use std::sync::RwLock;

use quill_common::string::{candidates_message, top_n_levenshtein};

use crate::entry_set::distance_threshold;
use crate::error::CatalogError;
use crate::extension::find_extension_for_setting;

/// Options known at compile time.
pub const BUILTIN_SETTINGS: &[&str] = &[
    "access_mode",
    "default_collation",
    "default_null_order",
    "default_order",
    "enable_progress_bar",
    "max_expression_depth",
    "memory_limit",
    "search_path",
    "temp_directory",
    "threads",
];

/// Name-keyed registry for options contributed by loaded extensions.
#[derive(Debug)]
pub struct SettingRegistry {
    extension_parameters: RwLock<BTreeSet<String>>,
}

impl SettingRegistry {
    pub fn new() -> Self {
        Self {
            extension_parameters: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn register_extension_parameter(&self, name: impl Into<String>) {
        self.extension_parameters
            .write()
            .expect("poisoned settings registry")
            .insert(name.into());
    }

    pub fn is_known(&self, name: &str) -> bool {
        BUILTIN_SETTINGS.contains(&name)
            || self
                .extension_parameters
                .read()
                .expect("poisoned settings registry")
                .contains(name)
    }

    /// Built-in and extension-registered names, built-ins first.
    pub fn known_names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_SETTINGS.iter().map(|s| s.to_string()).collect();
        names.extend(
            self.extension_parameters
                .read()
                .expect("poisoned settings registry")
                .iter()
                .cloned(),
        );
        names
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Diagnostic for a configuration parameter that resolved nowhere: an
/// extension hint when the static registry knows the name, otherwise a
/// candidate list over every known option.
pub fn unrecognized_configuration_error(registry: &SettingRegistry, name: &str) -> CatalogError {
    let extension = find_extension_for_setting(name);
    if !extension.is_empty() {
        return CatalogError::NotInCatalogButInExtension {
            what: "Setting".to_string(),
            name: name.to_string(),
            extension: extension.to_string(),
        };
    }
    let known = registry.known_names();
    let closest = top_n_levenshtein(
        known.iter().map(String::as_str),
        name,
        5,
        distance_threshold(name),
    );
    CatalogError::UnrecognizedConfigurationParameter {
        name: name.to_string(),
        candidates: candidates_message(&closest, "Did you mean"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_settings_are_sorted() {
        for pair in BUILTIN_SETTINGS.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn extension_setting_hint() {
        let registry = SettingRegistry::new();
        let err = unrecognized_configuration_error(&registry, "s3_region");
        assert_eq!(
            err.to_string(),
            "Setting with name \"s3_region\" is not in the catalog, but it exists in the httpfs extension.\n\nTo install and load the extension, run:\nINSTALL httpfs;\nLOAD httpfs;"
        );
    }

    #[test]
    fn misspelled_setting_gets_candidates() {
        let registry = SettingRegistry::new();
        let err = unrecognized_configuration_error(&registry, "treads");
        let message = err.to_string();
        assert!(message.starts_with("unrecognized configuration parameter \"treads\""));
        assert!(message.contains("\"threads\""));
    }

    #[test]
    fn extension_parameters_join_candidates() {
        let registry = SettingRegistry::new();
        registry.register_extension_parameter("azure_storage_connection_string");
        assert!(registry.is_known("azure_storage_connection_string"));
        assert!(registry.known_names().len() > BUILTIN_SETTINGS.len());
    }
}
