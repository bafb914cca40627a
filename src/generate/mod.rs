//! Remote model seam
//!
//! The generative model is an opaque collaborator: a request made of a text
//! prompt and inline images goes in, one image (or text, for analysis) comes
//! back, or a [`RemoteError`]. Transport is left to the [`ImageModel`]
//! implementation; this module only classifies failures and drives retries.

pub mod credential;
pub mod prompt;
pub mod retry;

use thiserror::Error;

use crate::codec::DataUri;
use crate::design::AspectRatio;
use crate::error::RestyleError;

pub use credential::{
    Credential, CredentialError, CredentialSource, EnvSource, FileSource, ValueSource,
    default_sources, resolve_credential,
};
pub use retry::{
    Attempt, AttemptPlan, AttemptStage, BackoffPolicy, Classify, Disposition, ModelSpec,
    PlanError, PlanSuccess, run_plan,
};

/// Resolution hint for image generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    TwoK,
    FourK,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

/// One call to the remote model
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Inline images, in the order the prompt refers to them
    pub images: Vec<DataUri>,
    pub aspect_ratio: Option<AspectRatio>,
    pub seed: Option<u32>,
    pub image_size: Option<ImageSize>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: DataUri) -> Self {
        self.images.push(image);
        self
    }
}

/// The remote generative model
pub trait ImageModel {
    /// Produce an image with the named model
    fn generate_image(&self, model: &str, request: &GenerationRequest)
    -> Result<DataUri, RemoteError>;

    /// Produce a text answer (used for furniture detection)
    fn describe(&self, model: &str, request: &GenerationRequest) -> Result<String, RemoteError>;
}

/// How a remote failure should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rate limiting, temporary unavailability, dropped connection
    Transient,
    /// Missing or rejected credential
    Authentication,
    /// The response carried no image
    MalformedResponse,
    /// Anything else
    Fatal,
}

const TRANSIENT_STATUS: [u16; 2] = [429, 503];
const AUTH_STATUS: [u16; 2] = [401, 403];

const TRANSIENT_PATTERNS: [&str; 8] = [
    "503",
    "429",
    "unavailable",
    "resource_exhausted",
    "cancelled",
    "fetch failed",
    "connection reset",
    "deadline exceeded",
];

const AUTH_PATTERNS: [&str; 4] = [
    "api key",
    "api_key_invalid",
    "permission_denied",
    "requested entity was not found",
];

const MISSING_IMAGE: &str = "no image data found in response";

/// Failure reported by the remote model
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}{message}", .status.map(|s| format!("[{s}] ")).unwrap_or_default())]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The response parsed but held no image payload
    pub fn missing_image() -> Self {
        Self::new(None, "No image data found in response")
    }

    /// Classify by status code first, then by message pattern
    pub fn classify(&self) -> ErrorClass {
        if let Some(status) = self.status {
            if TRANSIENT_STATUS.contains(&status) {
                return ErrorClass::Transient;
            }
            if AUTH_STATUS.contains(&status) {
                return ErrorClass::Authentication;
            }
        }

        let message = self.message.to_lowercase();
        if AUTH_PATTERNS.iter().any(|p| message.contains(p)) {
            ErrorClass::Authentication
        } else if TRANSIENT_PATTERNS.iter().any(|p| message.contains(p)) {
            ErrorClass::Transient
        } else if message.contains(MISSING_IMAGE) {
            ErrorClass::MalformedResponse
        } else {
            ErrorClass::Fatal
        }
    }
}

/// Terminal outcome of an orchestrated request
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("credential missing or rejected: {0}")]
    Authentication(String),

    #[error("service unavailable after {attempts} attempts: {last}")]
    ServiceUnavailable { attempts: u32, last: String },

    #[error(transparent)]
    Image(#[from] RestyleError),
}

impl GenerationError {
    /// Short, non-technical message for the end user
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::Authentication(_) => {
                "API key error. Please select or configure your key again."
            }
            GenerationError::ServiceUnavailable { .. } => {
                "Generation failed. The service may be overloaded, please try again shortly."
            }
            GenerationError::Image(_) => "The image could not be processed. Please try another file.",
        }
    }
}

impl From<PlanError<RemoteError>> for GenerationError {
    fn from(err: PlanError<RemoteError>) -> Self {
        match err {
            PlanError::Aborted { error, .. } => GenerationError::Authentication(error.to_string()),
            PlanError::Exhausted { last, attempts } => GenerationError::ServiceUnavailable {
                attempts,
                last: last.map(|e| e.to_string()).unwrap_or_default(),
            },
        }
    }
}

impl From<CredentialError> for GenerationError {
    fn from(err: CredentialError) -> Self {
        GenerationError::Authentication(err.to_string())
    }
}
