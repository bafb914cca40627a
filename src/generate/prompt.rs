//! Prompt assembly and parsing of text answers

use serde_json::Value;

use crate::config::AppConfig;
use crate::design::{AppMode, DetailShotAngle, DetectedItem, GenerationConfig};

/// Asks the analysis model for a flat JSON list of furniture labels
pub const DETECTION_PROMPT: &str = "Analyse this interior photo. List every distinct piece of \
furniture, large appliance and main decorative element that is visible (e.g. 'Sofa', 'Coffee \
table', 'Chandelier', 'Bed', 'Wardrobe', 'Rug'). Return ONLY a JSON array of plain strings, \
for example [\"Sofa\", \"Table\"]. Do not return objects, only strings.";

/// Returned when detection fails outright
pub const FALLBACK_DETECTED_LABELS: [&str; 2] = ["Main furniture", "Lighting & decor"];

const UNPARSEABLE_LABELS: [&str; 2] = ["Furniture", "Structures"];
const UNEXPECTED_SHAPE_LABEL: &str = "Detected elements";

/// Prompt for `config.mode`.
///
/// Virtual staging without any product asset is treated as a restyle.
pub fn design_prompt(config: &GenerationConfig, catalog: &AppConfig, masked: bool) -> String {
    match config.mode {
        AppMode::Editing => edit_prompt(config, masked),
        AppMode::VirtualStaging if !config.product_assets.is_empty() => staging_prompt(config),
        _ => restyle_prompt(config, catalog),
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

pub fn restyle_prompt(config: &GenerationConfig, catalog: &AppConfig) -> String {
    let (style_name, style_description) = match catalog.find_style(&config.style) {
        Some(style) => (
            style.label.as_str(),
            format!("{} {}", catalog.base_context, style.description),
        ),
        None => (config.style.as_str(), config.style.clone()),
    };
    let shooting = catalog
        .find_shooting_style(&config.shooting_style)
        .map(|s| s.description.as_str())
        .unwrap_or(&config.shooting_style);

    let (kept, removed): (Vec<&DetectedItem>, Vec<&DetectedItem>) =
        config.items_to_lock.iter().partition(|i| i.selected);
    let strict: Vec<String> = kept
        .iter()
        .filter(|i| i.notes.trim().is_empty())
        .map(|i| i.label.clone())
        .collect();
    let modified: Vec<String> = kept
        .iter()
        .filter(|i| !i.notes.trim().is_empty())
        .map(|i| {
            format!(
                "- For the \"{}\": keep the exact shape and position, but change its appearance to: {}",
                i.label,
                i.notes.trim()
            )
        })
        .collect();
    let removed: Vec<String> = removed.iter().map(|i| i.label.clone()).collect();
    let additions: Vec<String> = config
        .added_items
        .iter()
        .map(|item| match item.detail.trim() {
            "" => item.label.clone(),
            detail => format!("{} (style/colour: {})", item.label, detail),
        })
        .collect();

    let mut prompt = format!(
        "You are an expert interior design photo editor. RESTYLE the room environment while \
PRESERVING specific furniture.\n\
\n\
TARGET STYLE: \"{style_name}\"\n\
STYLE DESCRIPTION: {style_description}\n\
\n\
MASTER SHOOTING STYLE:\n\
{shooting}\n\
(Apply this photographic aesthetic strictly.)\n\
\n\
=== PRIORITY 1: STRICT PRESERVATION ===\n\
Objects to keep pixel-perfect: [{strict}]\n\
Do not change their colour, material, texture or shape.\n\
\n\
=== PRIORITY 2: MODIFIED OBJECTS ===\n\
{modified}\n\
\n\
=== PRIORITY 3: ENVIRONMENT & REMOVALS ===\n\
REMOVE: [{removed}].\n\
Redesign walls, floors, ceiling, windows and rugs to match \"{style_name}\".\n\
\n\
=== PRIORITY 4: ADDITIONS ===\n\
Add these elements naturally: [{additions}]\n",
        strict = join_or_none(&strict),
        modified = if modified.is_empty() {
            "No modified objects.".to_string()
        } else {
            modified.join("\n")
        },
        removed = join_or_none(&removed),
        additions = join_or_none(&additions),
    );

    if !config.selected_materials.is_empty() {
        prompt.push_str("\n=== MATERIAL PALETTE ===\n");
        for material in &config.selected_materials {
            prompt.push_str(&format!("- {}: {}\n", material.label, material.prompt));
        }
    }

    prompt.push_str(
        "\nOUTPUT REQUIREMENTS:\n\
- Photorealistic 4K render.\n\
- Seamless blending.\n\
- Keep the exact camera angle.\n",
    );
    if let Some(request) = config.custom_request() {
        prompt.push_str(&format!("ADDITIONAL USER REQUESTS: {}\n", request));
    }
    prompt
}

pub fn edit_prompt(config: &GenerationConfig, masked: bool) -> String {
    let mut prompt = format!(
        "You are an expert interior design editor and product retoucher.\n\
TASK: modify ONLY the elements named in the user's request and keep the rest of the room \
pixel-perfect identical.\n\
\n\
USER REQUEST: \"{}\"\n\
\n\
STRICT RULES:\n\
1. Object identity: when asked to change part of an object, keep the rest of that object \
exactly as it is. Never replace the whole object to change a detail.\n\
2. Change only what the request describes.\n\
3. Do not change the camera angle, the lighting or other furniture unless asked.\n\
4. The result must be photorealistic and blend with the existing environment.\n\
5. Added objects must cast correct shadows.\n",
        config.custom_request().unwrap_or_default()
    );
    if masked {
        prompt.push_str(
            "6. The second image is a mask. Apply changes ONLY inside its white area; every \
pixel under the black area must stay untouched.\n",
        );
    }
    prompt
}

pub fn staging_prompt(config: &GenerationConfig) -> String {
    let assets: Vec<String> = config
        .product_assets
        .iter()
        .enumerate()
        .map(|(i, asset)| format!("{}. {}", i + 1, asset.label))
        .collect();

    format!(
        "You are a world-class interior stylist and virtual stager.\n\
\n\
INPUTS:\n\
- Main image: an empty or partly furnished room (the environment).\n\
- Additional images: product shots (the assets).\n\
\n\
TASK: compose a photorealistic room by placing the ASSETS into the ENVIRONMENT.\n\
\n\
ASSETS TO PLACE:\n\
{}\n\
\n\
INSTRUCTIONS:\n\
1. Perspective: infer the vanishing point of the room and rotate and scale the assets to fit.\n\
2. Composition: beds against a suitable wall, nightstands beside the bed, wardrobes against \
the larger walls.\n\
3. Lighting: assets cast shadows consistent with the room's light sources.\n\
4. Style harmony: generate any rug or lamp the room needs, matching the assets.\n\
\n\
OUTPUT: a finished, fully furnished interior photo.\n",
        assets.join("\n")
    )
}

/// Lighting and mood for each detail angle
pub fn lighting_for(angle: DetailShotAngle) -> &'static str {
    match angle {
        DetailShotAngle::MacroStraight => {
            "LIGHTING: direct grazing light to reveal material relief. STYLE: clinical precision."
        }
        DetailShotAngle::ThreeQuarter => {
            "LIGHTING: studio chiaroscuro with strong diagonal shadows. STYLE: dynamic editorial."
        }
        DetailShotAngle::TopDown => {
            "LIGHTING: soft diffused skylight, no hard shadows. STYLE: clean graphic."
        }
        DetailShotAngle::LowAngle => "LIGHTING: hero backlight (rim light). STYLE: monumental.",
    }
}

/// Detail-shot prompt. With a texture the model gets the crop as image 1 and
/// the material as image 2.
pub fn detail_prompt(angle: DetailShotAngle, description: Option<&str>, with_texture: bool) -> String {
    let lighting = lighting_for(angle);

    if with_texture {
        return format!(
            "ROLE: expert product photographer and high-end retoucher.\n\
\n\
INPUTS:\n\
1. REFERENCE (image 1): the true geometry of the object.\n\
2. MATERIAL (image 2): the exact texture to apply.\n\
\n\
TASK: apply the material from image 2 to the object in image 1, then photograph it with \
studio quality.\n\
\n\
GEOMETRY LOCK:\n\
- Do not change the object's shape, folds, design or proportions.\n\
- The object in the output must overlap the object in image 1 exactly.\n\
\n\
PHOTOGRAPHY:\n\
- {lighting}\n\
- Sharpen and raise the resolution.\n\
- Render realistic material physics (specularity, roughness) from image 2.\n\
- Shallow depth of field: blurred background, sharp subject.\n\
\n\
OUTPUT: a hyper-realistic detail shot.\n"
        );
    }

    let subject = match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => format!("SUBJECT: \"{}\"", d),
        None => "SUBJECT: the main object in the centre.".to_string(),
    };

    format!(
        "ROLE: expert documentary interior photographer.\n\
\n\
INPUT: a crop of a real physical object.\n\
{subject}\n\
\n\
TASK: take a high-resolution photograph of this EXACT object.\n\
\n\
REALISM RULES:\n\
1. Do not invent new shapes. The output shows the same object as the input.\n\
2. Do not change the style of the object.\n\
3. The job is upscaling and lighting, not redesigning.\n\
\n\
PHOTOGRAPHY:\n\
- {lighting}\n\
- Resolve the fine detail (texture, dust, imperfections) blurred in the input.\n\
- Professional studio quality, 100mm macro lens.\n\
\n\
OUTPUT: a true-to-life, high-fidelity photograph of the subject.\n"
    )
}

/// Labels from the analysis model's answer.
///
/// Accepts a JSON array (of strings or objects with a label-like field), an
/// object wrapping such an array, or, failing JSON, any quoted strings in the
/// text. Markdown code fences are ignored.
pub fn parse_detected_labels(text: &str) -> Vec<String> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    let cleaned = if cleaned.is_empty() { "[]" } else { cleaned };

    let labels = match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Array(items)) => items.iter().map(label_of).collect(),
        Ok(Value::Object(map)) => match map.values().find_map(Value::as_array) {
            Some(items) => items.iter().map(label_of).collect(),
            None => vec![UNEXPECTED_SHAPE_LABEL.to_string()],
        },
        Ok(_) => vec![UNEXPECTED_SHAPE_LABEL.to_string()],
        Err(_) => {
            let quoted = quoted_strings(cleaned);
            if quoted.is_empty() {
                UNPARSEABLE_LABELS.iter().map(|s| s.to_string()).collect()
            } else {
                quoted
            }
        }
    };

    labels
        .into_iter()
        .map(|l| strip_quotes(&l).to_string())
        .collect()
}

fn label_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => ["label", "name", "item", "text"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

fn quoted_strings(text: &str) -> Vec<String> {
    text.split('"')
        .skip(1)
        .step_by(2)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_quotes(label: &str) -> &str {
    label
        .strip_prefix('"')
        .and_then(|l| l.strip_suffix('"'))
        .unwrap_or(label)
}

/// Items from parsed labels, all selected, ids `item-{index}`
pub fn detected_items(labels: Vec<String>) -> Vec<DetectedItem> {
    labels
        .into_iter()
        .enumerate()
        .map(|(i, label)| DetectedItem::new(format!("item-{}", i), label))
        .collect()
}

/// Items returned when detection fails
pub fn fallback_detected_items() -> Vec<DetectedItem> {
    FALLBACK_DETECTED_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| DetectedItem::new((i + 1).to_string(), *label))
        .collect()
}
