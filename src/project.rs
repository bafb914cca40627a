//! Saved projects (`.gphm` files)
//!
//! A project is one JSON document holding the source photo, the latest
//! generated image, the generation settings and the detail-shot history.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::DataUri;
use crate::design::{AddedItem, DetailPoint, DetectedItem, GenerationConfig};
use crate::error::{RestyleError, Result};

pub const PROJECT_EXTENSION: &str = "gphm";
pub const PROJECT_VERSION: &str = "2.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub version: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub original_file_name: String,
    /// Source photo as a data URI
    #[serde(rename = "originalImageBase64", default)]
    pub original_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<String>,
    #[serde(default)]
    pub config: GenerationConfig,
    #[serde(default)]
    pub detected_items: Vec<DetectedItem>,
    #[serde(default)]
    pub added_items: Vec<AddedItem>,
    #[serde(default)]
    pub detail_points: Vec<DetailPoint>,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl ProjectFile {
    pub fn new(original_file_name: impl Into<String>, original_image: &DataUri) -> Self {
        Self {
            version: PROJECT_VERSION.to_string(),
            timestamp: now_millis(),
            original_file_name: original_file_name.into(),
            original_image: original_image.to_string(),
            generated_image: None,
            config: GenerationConfig::default(),
            detected_items: Vec::new(),
            added_items: Vec::new(),
            detail_points: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a project document; it must carry the original image
    pub fn from_json(json: &str) -> Result<Self> {
        let project: ProjectFile = serde_json::from_str(json)?;
        if project.original_image.trim().is_empty() {
            return Err(RestyleError::InvalidProject(
                "project has no original image".to_string(),
            ));
        }
        Ok(project)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// `Project_{name}_{timestamp}.gphm`
    pub fn default_file_name(&self) -> String {
        format!(
            "Project_{}_{}.{}",
            self.original_file_name, self.timestamp, PROJECT_EXTENSION
        )
    }

    pub fn original_image(&self) -> Result<DataUri> {
        DataUri::parse(&self.original_image)
    }

    pub fn generated_image(&self) -> Result<Option<DataUri>> {
        self.generated_image
            .as_deref()
            .map(DataUri::parse)
            .transpose()
    }
}

/// Whether `path` names a project file rather than an image
pub fn is_project_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PROJECT_EXTENSION))
}
