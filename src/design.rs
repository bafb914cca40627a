//! Generation parameters chosen by the user
//!
//! These types are shared by prompt assembly, the orchestrator and the
//! project file, and serialize as camelCase JSON.

use serde::{Deserialize, Serialize};

use crate::crop::CropRect;

/// What kind of generation is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppMode {
    /// Full restyle of the room around locked furniture
    #[default]
    Restyling,
    /// Targeted edit, optionally restricted by a mask
    Editing,
    /// Place product photos into the room
    VirtualStaging,
}

/// Output aspect ratio supported by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "9:16")]
    Story,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Landscape,
        AspectRatio::Standard,
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Story,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Standard => "4:3",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Story => "9:16",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1 Square",
            AspectRatio::Landscape => "16:9 Landscape",
            AspectRatio::Standard => "4:3 Standard",
            AspectRatio::Portrait => "3:4 Portrait",
            AspectRatio::Story => "9:16 Story",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == value)
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Camera angle for a detail shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetailShotAngle {
    MacroStraight,
    #[default]
    ThreeQuarter,
    TopDown,
    LowAngle,
}

/// Furniture found in the source photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedItem {
    pub id: String,
    pub label: String,
    /// Selected items are kept; unselected ones are removed
    pub selected: bool,
    /// Requested change for a kept item; empty means keep it untouched
    #[serde(default)]
    pub notes: String,
}

impl DetectedItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            selected: true,
            notes: String::new(),
        }
    }
}

/// Element the user wants added to the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddedItem {
    pub id: String,
    pub label: String,
    /// Colour, material or other description
    #[serde(default)]
    pub detail: String,
}

/// Product photo for virtual staging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAsset {
    pub id: String,
    pub label: String,
    /// Image as a data URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialCategory {
    Fabric,
    Wood,
    Stone,
    Metal,
    Paint,
}

/// Catalog material with its prompt fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialOption {
    pub id: String,
    pub label: String,
    pub category: MaterialCategory,
    pub prompt: String,
}

/// Everything a generation request depends on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub mode: AppMode,
    /// Architectural style id from the catalog
    pub style: String,
    /// Shooting style id from the catalog
    pub shooting_style: String,
    pub ratio: AspectRatio,
    #[serde(default)]
    pub items_to_lock: Vec<DetectedItem>,
    #[serde(default)]
    pub added_items: Vec<AddedItem>,
    #[serde(default)]
    pub product_assets: Vec<ProductAsset>,
    #[serde(default)]
    pub selected_materials: Vec<MaterialOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            mode: AppMode::Restyling,
            style: "warm-brutalism".to_string(),
            shooting_style: "frontal-master-shot".to_string(),
            ratio: AspectRatio::Landscape,
            items_to_lock: Vec::new(),
            added_items: Vec::new(),
            product_assets: Vec::new(),
            selected_materials: Vec::new(),
            custom_prompt: None,
            seed: None,
        }
    }
}

impl GenerationConfig {
    /// Custom prompt, if it holds anything besides whitespace
    pub fn custom_request(&self) -> Option<&str> {
        self.custom_prompt
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A requested detail shot and, once generated, its result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailPoint {
    pub id: String,
    pub crop_rect: CropRect,
    pub shot_angle: DetailShotAngle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Material reference as a data URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_reference: Option<String>,
    #[serde(default = "default_tiling")]
    pub texture_tiling: u32,
    /// Generated detail shot as a data URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

fn default_tiling() -> u32 {
    1
}

/// Download name for a generated image: `GP{name}{style}{shot}[_{ratio}].png`
pub fn download_file_name(
    original_name: &str,
    style_code: &str,
    shot_code: &str,
    ratio: Option<AspectRatio>,
) -> String {
    let suffix = ratio
        .map(|r| format!("_{}", r.as_str().replace(':', "-")))
        .unwrap_or_default();
    format!("GP{original_name}{style_code}{shot_code}{suffix}.png")
}
