//! Staged retry with fallback
//!
//! An [`AttemptPlan`] is an ordered list of stages, each naming a model and an
//! attempt budget. [`run_plan`] walks the stages, asking each error how it
//! should be handled:
//!
//! - [`Disposition::Retry`]: back off and try the same stage again, until its
//!   budget is spent, then move on
//! - [`Disposition::NextStage`]: skip straight to the next stage
//! - [`Disposition::Abort`]: stop, no later stage is tried

use log::{debug, info, warn};
use rand::Rng;
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

use super::{ErrorClass, RemoteError};

/// A remote model and the price of one successful call to it
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    pub cost: f64,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, cost: f64) -> Self {
        Self {
            name: name.into(),
            cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptStage {
    pub model: ModelSpec,
    pub max_attempts: u32,
}

/// Ordered stages tried by [`run_plan`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptPlan {
    stages: Vec<AttemptStage>,
}

impl AttemptPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// A plan with one stage
    pub fn single(model: ModelSpec, max_attempts: u32) -> Self {
        Self::new().then(model, max_attempts)
    }

    /// Append a stage tried after the previous ones are exhausted
    pub fn then(mut self, model: ModelSpec, max_attempts: u32) -> Self {
        self.stages.push(AttemptStage {
            model,
            max_attempts,
        });
        self
    }

    pub fn stages(&self) -> &[AttemptStage] {
        &self.stages
    }
}

/// Exponential backoff with uniform jitter: `base · 2^i + U(0, max_jitter)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(2000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl BackoffPolicy {
    /// No waiting at all
    pub fn none() -> Self {
        Self {
            base: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Delay after the failed attempt with zero-based index `attempt`
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let base = self.base.saturating_mul(factor);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return base;
        }
        let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
        base.saturating_add(Duration::from_millis(jitter))
    }
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retry,
    NextStage,
    Abort,
}

/// Errors that know how [`run_plan`] should react to them
pub trait Classify {
    fn disposition(&self) -> Disposition;
}

impl Classify for RemoteError {
    fn disposition(&self) -> Disposition {
        match self.classify() {
            ErrorClass::Transient => Disposition::Retry,
            ErrorClass::Authentication => Disposition::Abort,
            ErrorClass::MalformedResponse | ErrorClass::Fatal => Disposition::NextStage,
        }
    }
}

/// The attempt being made, handed to the operation
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    pub stage: usize,
    /// One-based attempt number within the stage
    pub number: u32,
    pub model: &'a ModelSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanSuccess<T> {
    pub value: T,
    /// Model that produced `value`
    pub model: ModelSpec,
    /// Attempts made across all stages, the successful one included
    pub attempts: u32,
}

#[derive(Debug, Error)]
pub enum PlanError<E: Display> {
    #[error("aborted after {attempts} attempts: {error}")]
    Aborted { error: E, attempts: u32 },

    #[error("all stages exhausted after {attempts} attempts")]
    Exhausted { last: Option<E>, attempts: u32 },
}

impl<E: Display> PlanError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            PlanError::Aborted { attempts, .. } | PlanError::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Run `op` under `plan`.
///
/// `sleep` is called with the backoff delay between retries of one stage; it
/// is never called after the last attempt of a stage.
pub fn run_plan<T, E, S, F>(
    plan: &AttemptPlan,
    backoff: &BackoffPolicy,
    mut sleep: S,
    mut op: F,
) -> Result<PlanSuccess<T>, PlanError<E>>
where
    E: Classify + Display,
    S: FnMut(Duration),
    F: FnMut(&Attempt<'_>) -> Result<T, E>,
{
    let mut attempts = 0;
    let mut last = None;

    for (index, stage) in plan.stages().iter().enumerate() {
        if index > 0 {
            info!("falling back to {}", stage.model.name);
        }

        for number in 1..=stage.max_attempts {
            let attempt = Attempt {
                stage: index,
                number,
                model: &stage.model,
            };
            attempts += 1;
            debug!(
                "attempt {}/{} with {}",
                number, stage.max_attempts, stage.model.name
            );

            let error = match op(&attempt) {
                Ok(value) => {
                    return Ok(PlanSuccess {
                        value,
                        model: stage.model.clone(),
                        attempts,
                    });
                }
                Err(e) => e,
            };

            match error.disposition() {
                Disposition::Abort => return Err(PlanError::Aborted { error, attempts }),
                Disposition::NextStage => {
                    warn!("{} failed: {}", stage.model.name, error);
                    last = Some(error);
                    break;
                }
                Disposition::Retry => {
                    if number < stage.max_attempts {
                        let delay = backoff.delay(number - 1);
                        warn!(
                            "attempt {} with {} failed with transient error, retrying in {}ms: {}",
                            number,
                            stage.model.name,
                            delay.as_millis(),
                            error
                        );
                        sleep(delay);
                    } else {
                        warn!("{} exhausted its attempts: {}", stage.model.name, error);
                    }
                    last = Some(error);
                }
            }
        }
    }

    Err(PlanError::Exhausted { last, attempts })
}
