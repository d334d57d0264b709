//! Write-path helpers for entity adapters.
//!
//! Adapters read through [`SpaCache::data`] and write by calling
//! [`SpaClient`](crate::SpaClient) commands directly. A write pauses the
//! poller, tries the command, retries once if the returned state does not
//! show the target, forces a refresh and resumes the poller no matter what.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::SpaCache;
use crate::types::SpaState;
use crate::Result;

/// First try plus one retry.
pub const MAX_COMMAND_ATTEMPTS: u32 = 2;

/// Pauses the cache's poller for its lifetime.
///
/// Only resumes on drop if this guard did the pausing, so guards nest.
#[must_use = "updates resume as soon as the guard is dropped"]
pub struct PauseGuard {
    cache: SpaCache,
    paused: bool,
}

impl PauseGuard {
    pub fn new(cache: &SpaCache) -> Self {
        let paused = cache.pause_updates();
        Self {
            cache: cache.clone(),
            paused,
        }
    }

    pub fn paused(&self) -> bool {
        self.paused
    }
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        if self.paused {
            self.cache.resume_updates();
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// The target was observed, either in a command's result or after the final refresh.
    pub achieved: bool,
    pub attempts: u32,
    /// Cache contents after the final forced refresh.
    pub state: Option<Arc<SpaState>>,
}

/// Run `attempt` up to [`MAX_COMMAND_ATTEMPTS`] times with polling paused,
/// stopping as soon as `verify` accepts the returned state, then force a refresh.
pub async fn command_with_retry<F, Fut, V>(cache: &SpaCache, mut attempt: F, verify: V) -> CommandOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<SpaState>>,
    V: Fn(&SpaState) -> bool,
{
    let _guard = PauseGuard::new(cache);
    let mut achieved = false;
    let mut attempts = 0;

    while attempts < MAX_COMMAND_ATTEMPTS {
        attempts += 1;
        match attempt().await {
            Ok(state) if verify(&state) => {
                achieved = true;
                break;
            }
            Ok(_) => warn!(attempt = attempts, "target state not reached"),
            Err(e) => warn!(attempt = attempts, "command failed: {e}"),
        }
        if attempts < MAX_COMMAND_ATTEMPTS {
            info!("retrying command");
        }
    }

    let state = cache.force_refresh().await;
    if !achieved && state.as_deref().is_some_and(&verify) {
        debug!("target state confirmed by refresh");
        achieved = true;
    }

    CommandOutcome {
        achieved,
        attempts,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RefreshFailurePolicy;
    use crate::client::SpaClient;
    use std::time::Duration;

    fn cache() -> SpaCache {
        let client = SpaClient::builder("a", "b")
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        SpaCache::new(Arc::new(client), RefreshFailurePolicy::Discard)
    }

    #[tokio::test]
    async fn guard_pauses_and_resumes() {
        let cache = cache();
        cache.start_periodic_refresh(Duration::from_secs(3600));
        {
            let guard = PauseGuard::new(&cache);
            assert!(guard.paused());
            assert!(!cache.is_updating());
        }
        assert!(cache.is_updating());
        cache.shutdown();
    }

    #[tokio::test]
    async fn nested_guard_leaves_outer_pause() {
        let cache = cache();
        cache.start_periodic_refresh(Duration::from_secs(3600));
        let outer = PauseGuard::new(&cache);
        {
            let inner = PauseGuard::new(&cache);
            assert!(!inner.paused());
        }
        assert!(!cache.is_updating());
        drop(outer);
        assert!(cache.is_updating());
        cache.shutdown();
    }

    #[tokio::test]
    async fn failing_command_is_tried_twice() {
        let cache = cache();
        cache.start_periodic_refresh(Duration::from_secs(3600));
        let mut calls = 0;
        let outcome = command_with_retry(
            &cache,
            || {
                calls += 1;
                async { Err::<SpaState, _>(crate::Error::NoSpaSelected) }
            },
            |_| true,
        )
        .await;
        assert_eq!(calls, 2);
        assert_eq!(outcome.attempts, 2);
        assert!(!outcome.achieved);
        assert!(outcome.state.is_none());
        assert!(cache.is_updating());
        cache.shutdown();
    }
}
