use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};

use crate::categories::{
    default_attribute_categories, default_option_categories, Categories, CategoryRule,
    OTHER_CATEGORY,
};
use crate::registry::CollisionPolicy;

pub const CONFIG_ENV: &str = "SCENE_INSPECTOR_CONFIG";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectorConfig {
    pub attribute_categories: Vec<CategoryRule>,
    pub option_categories: Vec<CategoryRule>,
    pub fallback_category: String,
    pub per_location_namespaces: Vec<String>,
    pub collision_policy: CollisionPolicy,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            attribute_categories: default_attribute_categories(),
            option_categories: default_option_categories(),
            fallback_category: OTHER_CATEGORY.to_string(),
            per_location_namespaces: vec!["Selection".to_string()],
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl InspectorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("unable to read config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config: {}", path.display()))
    }

    /// `$SCENE_INSPECTOR_CONFIG`, then `<config dir>/scene-inspector/config.toml`,
    /// then the built-in defaults.
    pub fn load_default() -> Result<Self> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn attribute_categories(&self) -> Categories {
        Categories::new(&self.attribute_categories, self.fallback_category.clone())
    }

    pub fn option_categories(&self) -> Categories {
        Categories::new(&self.option_categories, self.fallback_category.clone())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("scene-inspector").join("config.toml"))
}
