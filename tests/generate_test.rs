//! Integration tests for orchestration against a scripted model
//!
//! `ScriptedModel` answers from a queue and records every call, and the
//! studio is given a no-op sleeper so backoff never waits.

use image::{DynamicImage, Rgba, RgbaImage};
use room_restyle::codec::{DataUri, decode_image, encode_png};
use room_restyle::config::AppConfig;
use room_restyle::crop::CropRect;
use room_restyle::design::{AppMode, AspectRatio, DetailShotAngle, GenerationConfig};
use room_restyle::generate::{
    AttemptPlan, BackoffPolicy, GenerationError, GenerationRequest, ImageModel, ImageSize,
    ModelSpec, PlanError, RemoteError, run_plan,
};
use room_restyle::mask::NormalizedMask;
use room_restyle::studio::{DetailShotRequest, Studio};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Call {
    model: String,
    images: usize,
    image_size: Option<ImageSize>,
    ratio: Option<AspectRatio>,
    prompt: String,
}

#[derive(Default)]
struct ScriptedModel {
    images: RefCell<VecDeque<Result<DataUri, RemoteError>>>,
    texts: RefCell<VecDeque<Result<String, RemoteError>>>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedModel {
    fn with_images(responses: Vec<Result<DataUri, RemoteError>>) -> Self {
        Self {
            images: RefCell::new(responses.into()),
            ..Default::default()
        }
    }

    fn with_texts(responses: Vec<Result<String, RemoteError>>) -> Self {
        Self {
            texts: RefCell::new(responses.into()),
            ..Default::default()
        }
    }

    fn record(&self, model: &str, request: &GenerationRequest) {
        self.calls.borrow_mut().push(Call {
            model: model.to_string(),
            images: request.images.len(),
            image_size: request.image_size,
            ratio: request.aspect_ratio,
            prompt: request.prompt.clone(),
        });
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn models_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }
}

impl ImageModel for ScriptedModel {
    fn generate_image(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<DataUri, RemoteError> {
        self.record(model, request);
        self.images
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::new(Some(500), "script exhausted")))
    }

    fn describe(&self, model: &str, request: &GenerationRequest) -> Result<String, RemoteError> {
        self.record(model, request);
        self.texts
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::new(Some(500), "script exhausted")))
    }
}

fn png_uri(img: RgbaImage) -> DataUri {
    DataUri::new("image/png", encode_png(&DynamicImage::ImageRgba8(img)).unwrap())
}

fn room(width: u32, height: u32) -> DataUri {
    png_uri(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
    }))
}

fn red(width: u32, height: u32) -> DataUri {
    png_uri(RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255])))
}

fn busy() -> RemoteError {
    RemoteError::new(Some(503), "The model is overloaded. UNAVAILABLE")
}

fn studio(model: ScriptedModel) -> Studio<ScriptedModel> {
    Studio::new(model, AppConfig::bundled().unwrap())
        .with_backoff(BackoffPolicy::none())
        .with_sleeper(|_| {})
}

// ============================================================================
// Retry plan
// ============================================================================

#[test]
fn test_transient_failures_exhaust_primary_then_fallback() {
    let model = ScriptedModel::with_images(vec![Err(busy()); 6]);
    let mut studio = studio(model);

    let result = studio.generate_design(&room(16, 16), &GenerationConfig::default(), None);
    assert!(matches!(
        result,
        Err(GenerationError::ServiceUnavailable { attempts: 6, .. })
    ));

    let calls = studio.model().models_called();
    assert_eq!(calls.len(), 6);
    assert!(calls[..3].iter().all(|m| m == "gemini-3-pro-image-preview"));
    assert!(calls[3..].iter().all(|m| m == "gemini-2.5-flash-image"));
    assert_eq!(studio.ledger().calls(), 0);
}

#[test]
fn test_fallback_success_is_charged_at_fallback_price() {
    let mut responses = vec![Err(busy()); 3];
    responses.push(Err(busy()));
    responses.push(Ok(red(16, 16)));
    let mut studio = studio(ScriptedModel::with_images(responses));

    let generated = studio
        .generate_design(&room(16, 16), &GenerationConfig::default(), None)
        .unwrap();
    assert_eq!(generated.model, "gemini-2.5-flash-image");
    assert_eq!(generated.cost, 0.01);
    assert_eq!(studio.ledger().total(), 0.01);

    let calls = studio.model().calls();
    assert_eq!(calls.len(), 5);
    assert_eq!(calls[0].image_size, Some(ImageSize::FourK));
    assert_eq!(calls[4].image_size, None);
}

#[test]
fn test_authentication_error_aborts_immediately() {
    let model = ScriptedModel::with_images(vec![
        Err(RemoteError::new(Some(403), "API key not valid")),
        Ok(red(4, 4)),
    ]);
    let mut studio = studio(model);

    let err = studio
        .generate_design(&room(8, 8), &GenerationConfig::default(), None)
        .unwrap_err();
    assert!(matches!(err, GenerationError::Authentication(_)));
    assert!(err.user_message().contains("API key"));
    assert_eq!(studio.model().calls().len(), 1);
}

#[test]
fn test_missing_image_skips_to_fallback() {
    let model = ScriptedModel::with_images(vec![Err(RemoteError::missing_image()), Ok(red(4, 4))]);
    let mut studio = studio(model);

    let generated = studio
        .generate_design(&room(4, 4), &GenerationConfig::default(), None)
        .unwrap();
    assert_eq!(studio.model().calls().len(), 2);
    assert_eq!(generated.model, "gemini-2.5-flash-image");
}

#[test]
fn test_run_plan_sleeps_with_growing_backoff() {
    let sleeps = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&sleeps);
    let backoff = BackoffPolicy {
        base: Duration::from_millis(100),
        max_jitter: Duration::ZERO,
    };
    let plan = AttemptPlan::single(ModelSpec::new("a", 0.0), 4);

    let result = run_plan(
        &plan,
        &backoff,
        move |d| recorder.borrow_mut().push(d),
        |_| Err::<(), _>(busy()),
    );
    assert!(matches!(result, Err(PlanError::Exhausted { attempts: 4, .. })));
    assert_eq!(
        *sleeps.borrow(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400)
        ]
    );
}

// ============================================================================
// Design generation
// ============================================================================

#[test]
fn test_masked_edit_is_composited() {
    let model = ScriptedModel::with_images(vec![Ok(red(32, 32))]);
    let mut studio = studio(model);
    let original = room(32, 32);
    let mask = NormalizedMask::from_fn(32, 32, |x, _| x < 16);
    let config = GenerationConfig {
        mode: AppMode::Editing,
        custom_prompt: Some("paint the left wall red".to_string()),
        ..Default::default()
    };

    let generated = studio.generate_design(&original, &config, Some(&mask)).unwrap();

    let call = &studio.model().calls()[0];
    assert_eq!(call.images, 2);
    assert!(call.prompt.contains("paint the left wall red"));

    let out = decode_image(&generated.image.bytes).unwrap().to_rgba8();
    let source = decode_image(&original.bytes).unwrap().to_rgba8();
    assert_eq!(*out.get_pixel(3, 3), Rgba([255, 0, 0, 255]));
    assert_eq!(out.get_pixel(20, 3), source.get_pixel(20, 3));
}

#[test]
fn test_staging_sends_product_images() {
    let model = ScriptedModel::with_images(vec![Ok(red(4, 4))]);
    let mut studio = studio(model);
    let config = GenerationConfig {
        mode: AppMode::VirtualStaging,
        product_assets: vec![
            room_restyle::design::ProductAsset {
                id: "1".into(),
                label: "Armchair".into(),
                image: Some(red(2, 2).to_string()),
            },
            room_restyle::design::ProductAsset {
                id: "2".into(),
                label: "Broken".into(),
                image: Some("not a data uri".into()),
            },
        ],
        ..Default::default()
    };

    studio.generate_design(&room(4, 4), &config, None).unwrap();
    let call = &studio.model().calls()[0];
    assert_eq!(call.images, 2);
    assert!(call.prompt.contains("1. Armchair"));
}

#[test]
fn test_variations_record_each_ratio() {
    let model = ScriptedModel::with_images(vec![
        Ok(red(4, 4)),
        Err(RemoteError::new(Some(401), "unauthorized")),
        Ok(red(4, 4)),
    ]);
    let mut studio = studio(model);
    let ratios = [AspectRatio::Square, AspectRatio::Portrait, AspectRatio::Story];

    let results = studio.generate_variations(&room(4, 4), &GenerationConfig::default(), &ratios);
    assert_eq!(results.len(), 3);
    assert!(results[0].outcome.is_ok());
    assert!(results[1].outcome.is_err());
    assert!(results[2].outcome.is_ok());

    let sent: Vec<_> = studio.model().calls().iter().map(|c| c.ratio).collect();
    assert_eq!(sent, ratios.map(Some).to_vec());
    assert_eq!(studio.ledger().calls(), 2);
}

// ============================================================================
// Detail shots
// ============================================================================

#[test]
fn test_detail_shot_uses_primary_only() {
    let model = ScriptedModel::with_images(vec![Err(busy()); 4]);
    let mut studio = studio(model);
    let request = DetailShotRequest::new(CropRect::new(10.0, 10.0, 20.0, 20.0), DetailShotAngle::TopDown);

    let err = studio.generate_detail_shot(&room(200, 100), &request).unwrap_err();
    assert!(matches!(err, GenerationError::ServiceUnavailable { attempts: 3, .. }));
    assert!(studio
        .model()
        .models_called()
        .iter()
        .all(|m| m == "gemini-3-pro-image-preview"));
}

#[test]
fn test_detail_shot_with_tiled_texture() {
    let model = ScriptedModel::with_images(vec![Ok(red(8, 6))]);
    let mut studio = studio(model);
    let mut request = DetailShotRequest::new(CropRect::new(0.0, 0.0, 10.0, 10.0), DetailShotAngle::MacroStraight);
    request.texture = Some(room(16, 16));
    request.texture_tiling = 3;

    let generated = studio.generate_detail_shot(&room(300, 200), &request).unwrap();
    assert_eq!(generated.cost, 0.04);

    let call = &studio.model().calls()[0];
    assert_eq!(call.images, 2);
    assert_eq!(call.ratio, Some(AspectRatio::Standard));
    assert_eq!(call.image_size, Some(ImageSize::TwoK));
    assert!(call.prompt.contains("image 2"));
}

#[test]
fn test_detail_shot_of_undecodable_image_fails() {
    let mut studio = studio(ScriptedModel::default());
    let request = DetailShotRequest::new(CropRect::new(0.0, 0.0, 10.0, 10.0), DetailShotAngle::LowAngle);
    let err = studio
        .generate_detail_shot(&DataUri::new("image/jpeg", b"nope".to_vec()), &request)
        .unwrap_err();
    assert!(matches!(err, GenerationError::Image(_)));
    assert!(studio.model().calls().is_empty());
}

// ============================================================================
// Furniture detection
// ============================================================================

#[test]
fn test_detection_parses_labels() {
    let model = ScriptedModel::with_texts(vec![Ok("```json\n[\"Sofa\", \"Rug\"]\n```".to_string())]);
    let mut studio = studio(model);

    let detection = studio.detect_furniture(&room(4, 4));
    let labels: Vec<_> = detection.items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["Sofa", "Rug"]);
    assert_eq!(detection.items[1].id, "item-1");
    assert!(detection.items.iter().all(|i| i.selected));
    assert_eq!(detection.cost, 0.001);
    assert_eq!(studio.model().models_called(), vec!["gemini-2.5-flash"]);
}

#[test]
fn test_detection_failure_returns_generic_items() {
    let model = ScriptedModel::with_texts(vec![Err(busy()); 4]);
    let mut studio = studio(model);

    let detection = studio.detect_furniture(&room(4, 4));
    assert_eq!(detection.items.len(), 2);
    assert_eq!(detection.cost, 0.0);
    assert_eq!(studio.model().calls().len(), 4);
    assert_eq!(studio.ledger().total(), 0.0);
}
