//! Reflection configuration
//!
//! Read from the `[reflect]` table of a TOML file:
//!
//! ```toml
//! [reflect]
//! class_cache_enabled = true
//!
//! [reflect.permissions]
//! global = "ALL"
//!
//! [reflect.permissions.classes]
//! "Secret" = "PUBLIC_ONLY"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::ReflectError;
use crate::permissions::ReflectionPermission;
use crate::registry::ClassRegistry;

/// Reflection settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReflectConfig {
    /// Whether the metadata cache memoizes built metadata
    pub class_cache_enabled: bool,

    /// Permission settings
    pub permissions: PermissionsConfig,
}

impl Default for ReflectConfig {
    fn default() -> Self {
        Self {
            class_cache_enabled: true,
            permissions: PermissionsConfig::default(),
        }
    }
}

/// `[reflect.permissions]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Default for every class without its own entry
    pub global: String,

    /// Class name -> permission flags (`"READ_ALL|INVOKE_PUBLIC"`)
    pub classes: BTreeMap<String, String>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            global: "ALL".to_string(),
            classes: BTreeMap::new(),
        }
    }
}

/// Whole configuration file; only the `[reflect]` table is read
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    reflect: ReflectConfig,
}

impl ReflectConfig {
    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ReflectError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.reflect.validate()?;
        Ok(file.reflect)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReflectError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded reflection config");
        Ok(config)
    }

    /// Push the configured permissions into the registry's permission store
    pub fn apply_permissions(&self, registry: &ClassRegistry) -> Result<(), ReflectError> {
        let global = parse_permission(&self.permissions.global)?;
        let mut resolved = Vec::with_capacity(self.permissions.classes.len());
        for (class_name, value) in &self.permissions.classes {
            let class = registry
                .find_class(class_name)
                .ok_or_else(|| ReflectError::UnknownClass(class_name.clone()))?;
            resolved.push((class, parse_permission(value)?));
        }

        let mut store = registry.permissions().write();
        let sealed = resolved.iter().find(|(class, _)| store.is_class_sealed(*class));
        if let Some((class, _)) = sealed {
            return Err(ReflectError::PermissionsSealed(class.to_string()));
        }
        store.set_global(global);
        for (class, permission) in resolved {
            store.set_class(class, permission)?;
        }
        debug!(
            classes = self.permissions.classes.len(),
            restricted = store.has_any_restrictions(),
            "applied reflection permissions"
        );
        Ok(())
    }

    fn validate(&self) -> Result<(), ReflectError> {
        parse_permission(&self.permissions.global)?;
        for value in self.permissions.classes.values() {
            parse_permission(value)?;
        }
        Ok(())
    }
}

fn parse_permission(value: &str) -> Result<ReflectionPermission, ReflectError> {
    ReflectionPermission::from_combined_str(value)
        .ok_or_else(|| ReflectError::Config(format!("invalid permission value '{}'", value)))
}
