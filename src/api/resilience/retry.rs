//! Fixed-interval retry for uploads
//!
//! Every upload is attempted up to five times with a flat sleep between
//! attempts. Configured sleeps shorter than the minimum are raised to it.
//! There is no backoff and no jitter. Which statuses end the loop early is
//! decided by a [`StatusPredicate`].

use crate::api::constants::env_keys;
use crate::api::models::ApiResponse;
use crate::environment::Environment;
use crate::error::{JamfError, Result};
use log::{debug, info, warn};
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const MIN_SLEEP: Duration = Duration::from_secs(30);

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub sleep: Duration,
    pub min_sleep: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sleep: MIN_SLEEP,
            min_sleep: MIN_SLEEP,
        }
    }
}

impl RetryConfig {
    pub fn with_sleep(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn with_min_sleep(mut self, min_sleep: Duration) -> Self {
        self.min_sleep = min_sleep;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Read the `sleep` key (seconds); unparseable values keep the default
    pub fn from_env(env: &Environment) -> Self {
        let config = Self::default();
        match env.integer(env_keys::SLEEP, 0) {
            Ok(secs) if secs > 0 => config.with_sleep(Duration::from_secs(secs as u64)),
            Ok(_) => config,
            Err(e) => {
                warn!("Ignoring sleep setting: {}", e);
                config
            }
        }
    }

    /// Time slept between attempts
    pub fn effective_sleep(&self) -> Duration {
        self.sleep.max(self.min_sleep)
    }
}

/// What to do with one response
#[derive(Debug)]
pub enum Verdict {
    Done,
    Fail(JamfError),
    Retry,
}

pub type StatusPredicate = fn(&ApiResponse) -> Verdict;

/// 2xx succeeds, 401 and 409 are terminal errors, anything else is retried
pub fn standard(response: &ApiResponse) -> Verdict {
    match response.status_code {
        200..=299 => Verdict::Done,
        401 => Verdict::Fail(JamfError::PermissionDenied {
            url: response.url.clone(),
        }),
        409 => Verdict::Fail(JamfError::Conflict {
            message: response.text(),
        }),
        _ => Verdict::Retry,
    }
}

/// Like [`standard`], but a 409 conflict ends the loop without an error
pub fn conflict_is_done(response: &ApiResponse) -> Verdict {
    if response.status_code == 409 {
        warn!("Server reported a conflict; treating the object as already present");
        return Verdict::Done;
    }
    standard(response)
}

/// Only 2xx ends the loop; used for third-party webhooks
pub fn success_only(response: &ApiResponse) -> Verdict {
    if response.is_success() {
        Verdict::Done
    } else {
        Verdict::Retry
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    predicate: StatusPredicate,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            predicate: standard,
        }
    }

    pub fn with_predicate(mut self, predicate: StatusPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until the predicate accepts or rejects a response, or
    /// the attempt ceiling is reached
    pub async fn execute<F, Fut>(&self, mut operation: F) -> Result<ApiResponse>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ApiResponse>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            info!("Upload attempt {}/{}", attempt, max_attempts);

            let last_status = match operation().await {
                Ok(response) => match (self.predicate)(&response) {
                    Verdict::Done => {
                        if attempt > 1 {
                            info!("Upload succeeded after {} attempts", attempt);
                        }
                        return Ok(response);
                    }
                    Verdict::Fail(error) => {
                        warn!("Upload failed permanently on attempt {}: {}", attempt, error);
                        return Err(error);
                    }
                    Verdict::Retry => {
                        warn!(
                            "Upload attempt {} returned HTTP {}",
                            attempt, response.status_code
                        );
                        Some(response.status_code)
                    }
                },
                Err(error) if error.is_transient() => {
                    warn!("Upload attempt {} failed: {}", attempt, error);
                    None
                }
                Err(error) => return Err(error),
            };

            if attempt >= max_attempts {
                warn!("Upload did not succeed after {} attempts", attempt);
                return Err(JamfError::Upload {
                    attempts: attempt,
                    status: last_status,
                });
            }

            let delay = self.config.effective_sleep();
            debug!("Waiting {:?} before retry", delay);
            tokio::time::sleep(delay).await;
        }
    }
}
