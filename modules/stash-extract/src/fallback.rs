// Ordered fallback chains: a list of independent, individually timed-out
// attempts for one data need. The first attempt that yields something wins;
// failures and timeouts are logged and the chain moves on. Nothing is retried.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use stash_common::PlatformKind;
use tracing::{debug, warn};

use crate::error::FetchError;

/// `Ok(None)` means the source answered but had nothing usable for us
/// (login wall, empty payload, missing fields).
pub type AttemptResult<T> = Result<Option<T>, FetchError>;

struct Attempt<'a, T> {
    label: &'static str,
    timeout: Duration,
    future: BoxFuture<'a, AttemptResult<T>>,
}

pub struct FallbackChain<'a, T> {
    platform: PlatformKind,
    need: &'static str,
    attempts: Vec<Attempt<'a, T>>,
}

impl<'a, T: Send + 'a> FallbackChain<'a, T> {
    pub fn new(platform: PlatformKind, need: &'static str) -> Self {
        Self {
            platform,
            need,
            attempts: Vec::new(),
        }
    }

    /// Append an attempt. The future is not polled until every earlier
    /// attempt has failed.
    pub fn attempt<F>(mut self, label: &'static str, timeout: Duration, future: F) -> Self
    where
        F: Future<Output = AttemptResult<T>> + Send + 'a,
    {
        self.attempts.push(Attempt {
            label,
            timeout,
            future: future.boxed(),
        });
        self
    }

    /// Run attempts in order, returning the first non-empty payload.
    pub async fn run(self) -> Option<T> {
        let platform = self.platform;
        let need = self.need;

        for (index, attempt) in self.attempts.into_iter().enumerate() {
            let step = index + 1;
            match tokio::time::timeout(attempt.timeout, attempt.future).await {
                Ok(Ok(Some(value))) => {
                    debug!(%platform, need, step, attempt = attempt.label, "fallback: attempt succeeded");
                    return Some(value);
                }
                Ok(Ok(None)) => {
                    debug!(%platform, need, step, attempt = attempt.label, "fallback: attempt yielded nothing");
                }
                Ok(Err(e)) => {
                    warn!(%platform, need, step, attempt = attempt.label, error = %e, "fallback: attempt failed");
                }
                Err(_) => {
                    warn!(
                        %platform,
                        need,
                        step,
                        attempt = attempt.label,
                        timeout_ms = attempt.timeout.as_millis() as u64,
                        "fallback: attempt timed out"
                    );
                }
            }
        }

        warn!(%platform, need, "fallback: all attempts exhausted");
        None
    }
}
