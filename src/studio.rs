//! Request orchestration
//!
//! [`Studio`] turns user choices into model requests, runs them under the
//! retry plans, enforces masks on the result and keeps a running cost total.

use log::{info, warn};
use std::time::Duration;

use crate::codec::DataUri;
use crate::composite::composite_inline;
use crate::config::AppConfig;
use crate::crop::{CropOptions, CropRect, CropRegion, DETAIL_CONTEXT_EXPANSION, crop_encoded};
use crate::design::{AspectRatio, DetailShotAngle, DetectedItem, GenerationConfig};
use crate::generate::prompt::{self, DETECTION_PROMPT};
use crate::generate::{
    AttemptPlan, BackoffPolicy, GenerationError, GenerationRequest, ImageModel, ImageSize,
    ModelSpec, run_plan,
};
use crate::mask::NormalizedMask;
use crate::tile::{TileOptions, tile_encoded};

/// Attempts per stage for design generation and detail shots
pub const IMAGE_ATTEMPTS: u32 = 3;

/// Attempts for furniture detection
pub const DETECTION_ATTEMPTS: u32 = 4;

/// Running total of what the session has spent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostLedger {
    total: f64,
    calls: u32,
}

impl CostLedger {
    pub fn record(&mut self, cost: f64) {
        self.total += cost;
        self.calls += 1;
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn calls(&self) -> u32 {
        self.calls
    }
}

/// A generated image and what it cost
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub image: DataUri,
    pub model: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub items: Vec<DetectedItem>,
    pub cost: f64,
}

#[derive(Debug)]
pub struct VariationResult {
    pub ratio: AspectRatio,
    pub outcome: Result<Generated, GenerationError>,
}

/// A detail shot to generate from a region of the source image
#[derive(Debug, Clone, PartialEq)]
pub struct DetailShotRequest {
    pub rect: CropRect,
    pub angle: DetailShotAngle,
    pub description: Option<String>,
    /// Material to transfer onto the subject
    pub texture: Option<DataUri>,
    pub texture_tiling: u32,
}

impl DetailShotRequest {
    pub fn new(rect: CropRect, angle: DetailShotAngle) -> Self {
        Self {
            rect,
            angle,
            description: None,
            texture: None,
            texture_tiling: 1,
        }
    }
}

pub struct Studio<M: ImageModel> {
    model: M,
    config: AppConfig,
    backoff: BackoffPolicy,
    sleeper: Box<dyn FnMut(Duration)>,
    ledger: CostLedger,
}

impl<M: ImageModel> Studio<M> {
    pub fn new(model: M, config: AppConfig) -> Self {
        Self {
            model,
            config,
            backoff: BackoffPolicy::default(),
            sleeper: Box::new(std::thread::sleep),
            ledger: CostLedger::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replace the function used to wait between retries
    pub fn with_sleeper(mut self, sleeper: impl FnMut(Duration) + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn ledger(&self) -> &CostLedger {
        &self.ledger
    }

    /// Primary model, then the cheaper fallback
    pub fn design_plan(&self) -> AttemptPlan {
        let models = &self.config.models;
        let pricing = &self.config.pricing;
        AttemptPlan::single(
            ModelSpec::new(&models.primary, pricing.image_gen_pro),
            IMAGE_ATTEMPTS,
        )
        .then(
            ModelSpec::new(&models.fallback, pricing.image_gen_flash),
            IMAGE_ATTEMPTS,
        )
    }

    /// Primary model only
    pub fn detail_plan(&self) -> AttemptPlan {
        AttemptPlan::single(
            ModelSpec::new(&self.config.models.primary, self.config.pricing.image_gen_pro),
            IMAGE_ATTEMPTS,
        )
    }

    pub fn analysis_plan(&self) -> AttemptPlan {
        AttemptPlan::single(
            ModelSpec::new(&self.config.models.analysis, self.config.pricing.analysis_cost),
            DETECTION_ATTEMPTS,
        )
    }

    /// List the furniture in `image`.
    ///
    /// Never fails: when the model cannot answer, two generic items are
    /// returned at zero cost.
    pub fn detect_furniture(&mut self, image: &DataUri) -> Detection {
        let request = GenerationRequest::new(DETECTION_PROMPT).with_image(image.clone());
        let plan = self.analysis_plan();
        let Self {
            model,
            backoff,
            sleeper,
            ..
        } = &mut *self;

        let result = run_plan(&plan, backoff, &mut **sleeper, |attempt| {
            model.describe(&attempt.model.name, &request)
        });

        match result {
            Ok(success) => {
                self.ledger.record(success.model.cost);
                let items = prompt::detected_items(prompt::parse_detected_labels(&success.value));
                info!("detected {} items", items.len());
                Detection {
                    items,
                    cost: success.model.cost,
                }
            }
            Err(e) => {
                warn!("furniture detection failed, using generic items: {}", e);
                Detection {
                    items: prompt::fallback_detected_items(),
                    cost: 0.0,
                }
            }
        }
    }

    /// Generate a design from `original`.
    ///
    /// With a mask, the mask is sent along as PNG and the output is
    /// composited so that nothing outside the white area changes.
    pub fn generate_design(
        &mut self,
        original: &DataUri,
        config: &GenerationConfig,
        mask: Option<&NormalizedMask>,
    ) -> Result<Generated, GenerationError> {
        let mut request = GenerationRequest {
            prompt: prompt::design_prompt(config, &self.config, mask.is_some()),
            images: vec![original.clone()],
            aspect_ratio: Some(config.ratio),
            seed: config.seed,
            image_size: Some(ImageSize::FourK),
        };
        if let Some(mask) = mask {
            request.images.push(DataUri::new("image/png", mask.to_png()?));
        }
        for asset in &config.product_assets {
            let Some(image) = asset.image.as_deref() else {
                continue;
            };
            match DataUri::parse(image) {
                Ok(uri) => request.images.push(uri),
                Err(e) => warn!("skipping product asset '{}': {}", asset.label, e),
            }
        }

        let plan = self.design_plan();
        let mut generated = self.run_image(&plan, &request)?;
        if let Some(mask) = mask {
            generated.image = composite_inline(original, &generated.image, mask);
        }
        Ok(generated)
    }

    /// One independent generation per ratio
    pub fn generate_variations(
        &mut self,
        original: &DataUri,
        config: &GenerationConfig,
        ratios: &[AspectRatio],
    ) -> Vec<VariationResult> {
        ratios
            .iter()
            .map(|&ratio| {
                let config = GenerationConfig {
                    ratio,
                    ..config.clone()
                };
                let outcome = self.generate_design(original, &config, None);
                if let Err(e) = &outcome {
                    warn!("variation {} failed: {}", ratio, e);
                }
                VariationResult { ratio, outcome }
            })
            .collect()
    }

    /// Close-up photograph of a region of `image`
    pub fn generate_detail_shot(
        &mut self,
        image: &DataUri,
        request: &DetailShotRequest,
    ) -> Result<Generated, GenerationError> {
        let region = CropRegion::new(request.rect, DETAIL_CONTEXT_EXPANSION);
        let crop = crop_encoded(&image.bytes, &region, &CropOptions::default())?;

        let mut images = vec![DataUri::new("image/jpeg", crop)];
        if let Some(texture) = &request.texture {
            let texture = if request.texture_tiling > 1 {
                let tiled = tile_encoded(
                    &texture.bytes,
                    request.texture_tiling,
                    &TileOptions::default(),
                )?;
                DataUri::new("image/jpeg", tiled)
            } else {
                texture.clone()
            };
            images.push(texture);
        }

        let generation = GenerationRequest {
            prompt: prompt::detail_prompt(
                request.angle,
                request.description.as_deref(),
                request.texture.is_some(),
            ),
            images,
            aspect_ratio: Some(AspectRatio::Standard),
            seed: None,
            image_size: Some(ImageSize::TwoK),
        };

        let plan = self.detail_plan();
        self.run_image(&plan, &generation)
    }

    fn run_image(
        &mut self,
        plan: &AttemptPlan,
        request: &GenerationRequest,
    ) -> Result<Generated, GenerationError> {
        // The fallback model takes no resolution hint
        let fallback_request = GenerationRequest {
            image_size: None,
            ..request.clone()
        };
        let Self {
            model,
            backoff,
            sleeper,
            ..
        } = &mut *self;

        let success = run_plan(plan, backoff, &mut **sleeper, |attempt| {
            let request = if attempt.stage == 0 {
                request
            } else {
                &fallback_request
            };
            model.generate_image(&attempt.model.name, request)
        })?;

        self.ledger.record(success.model.cost);
        info!(
            "image generated by {} after {} attempts",
            success.model.name, success.attempts
        );
        Ok(Generated {
            image: success.value,
            model: success.model.name,
            cost: success.model.cost,
        })
    }
}
