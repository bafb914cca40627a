//! Catalog configuration
//!
//! Styles, shooting styles, room add-ons, materials, model names and prices
//! are user-editable. The stored copy lives in an opaque key-value store
//! and is merged over the bundled defaults on load.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::design::MaterialOption;
use crate::error::{RestyleError, Result};
use log::{debug, warn};

/// Store key of the saved configuration
pub const CONFIG_KEY: &str = "room_restyle_config_v1";

/// Suggested file name for exports
pub const EXPORT_FILE_NAME: &str = "room_restyle_config.json";

const BUNDLED_PRESETS: &str = include_str!("../assets/presets.json");

/// Estimated USD cost per call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub analysis_cost: f64,
    pub image_gen_pro: f64,
    pub image_gen_flash: f64,
}

/// Remote model identifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelNames {
    pub primary: String,
    pub fallback: String,
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleEntry {
    pub id: String,
    pub label: String,
    pub code: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShootingStyleEntry {
    pub id: String,
    pub label: String,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomTypeEntry {
    pub id: String,
    pub label: String,
    pub icon: String,
}

/// Full editable configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub pricing: Pricing,
    pub models: ModelNames,
    pub base_context: String,
    pub styles: Vec<StyleEntry>,
    pub shooting_styles: Vec<ShootingStyleEntry>,
    pub room_types: Vec<RoomTypeEntry>,
    pub room_addons: BTreeMap<String, Vec<String>>,
    pub materials: Vec<MaterialOption>,
}

impl AppConfig {
    /// Defaults shipped with the crate
    pub fn bundled() -> Result<Self> {
        Ok(serde_json::from_str(BUNDLED_PRESETS)?)
    }

    pub fn find_style(&self, id: &str) -> Option<&StyleEntry> {
        self.styles.iter().find(|s| s.id == id)
    }

    pub fn find_shooting_style(&self, id: &str) -> Option<&ShootingStyleEntry> {
        self.shooting_styles.iter().find(|s| s.id == id)
    }

    pub fn addons_for(&self, room_type: &str) -> &[String] {
        self.room_addons
            .get(room_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Opaque key-value persistence
pub trait ConfigStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store, one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl ConfigStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Loads, saves, imports and exports the configuration
pub struct ConfigManager<S: ConfigStore> {
    store: S,
    defaults: AppConfig,
}

impl<S: ConfigStore> ConfigManager<S> {
    pub fn new(store: S) -> Result<Self> {
        Ok(Self {
            store,
            defaults: AppConfig::bundled()?,
        })
    }

    pub fn defaults(&self) -> &AppConfig {
        &self.defaults
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored configuration merged over the defaults, or the defaults when
    /// nothing usable is stored
    pub fn load(&self) -> AppConfig {
        let stored = match self.store.get(CONFIG_KEY) {
            Ok(Some(stored)) => stored,
            Ok(None) => return self.defaults.clone(),
            Err(e) => {
                warn!("failed to read stored configuration: {}", e);
                return self.defaults.clone();
            }
        };

        match self.merge_over_defaults(&stored) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring stored configuration: {}", e);
                self.defaults.clone()
            }
        }
    }

    pub fn save(&mut self, config: &AppConfig) -> Result<()> {
        let json = serde_json::to_string(config)?;
        self.store.set(CONFIG_KEY, &json)
    }

    /// Drop the stored copy and return the defaults
    pub fn reset(&mut self) -> Result<AppConfig> {
        self.store.remove(CONFIG_KEY)?;
        Ok(self.defaults.clone())
    }

    /// Write `config` as pretty JSON
    pub fn export_to_file(&self, config: &AppConfig, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(config)?)?;
        debug!("configuration exported to {}", path.display());
        Ok(())
    }

    /// Read a configuration file, validate it and save it
    pub fn import_from_file(&mut self, path: &Path) -> Result<AppConfig> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        for key in ["styles", "materials"] {
            if !value.get(key).is_some_and(Value::is_array) {
                return Err(RestyleError::InvalidConfig(format!(
                    "missing '{}' list",
                    key
                )));
            }
        }

        let config = self.merge_over_defaults(&content)?;
        self.save(&config)?;
        Ok(config)
    }

    /// Top-level keys of `stored` replace those of the defaults
    fn merge_over_defaults(&self, stored: &str) -> Result<AppConfig> {
        let stored: Value = serde_json::from_str(stored)?;
        let Value::Object(stored) = stored else {
            return Err(RestyleError::InvalidConfig(
                "configuration must be a JSON object".to_string(),
            ));
        };
        if !stored.get("styles").is_some_and(Value::is_array) {
            return Err(RestyleError::InvalidConfig(
                "missing 'styles' list".to_string(),
            ));
        }

        let mut merged = serde_json::to_value(&self.defaults)?;
        if let Value::Object(base) = &mut merged {
            base.extend(stored);
        }
        Ok(serde_json::from_value(merged)?)
    }
}
