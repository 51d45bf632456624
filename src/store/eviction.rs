//! Scope-granular eviction.

use super::{DocStore, ScopeInfo};
use crate::config::ServerConfig;
use crate::types::ScopeKey;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Which scopes to drop: those older than `max_age`, then the oldest
/// remaining ones until the total size fits in `max_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvictionPolicy {
    pub max_age: Option<Duration>,
    pub max_bytes: Option<u64>,
}

impl EvictionPolicy {
    pub const fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_age: Some(config.cache_ttl()),
            max_bytes: Some(config.cache_size_limit),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub removed: Vec<ScopeKey>,
    pub freed_bytes: u64,
    pub remaining_bytes: u64,
}

/// Scopes that `policy` evicts at time `now`.
pub(super) fn select_victims(
    scopes: &[ScopeInfo],
    policy: &EvictionPolicy,
    now: SystemTime,
) -> Vec<ScopeKey> {
    let (expired, mut kept): (Vec<_>, Vec<_>) = scopes.iter().partition(|info| {
        policy.max_age.is_some_and(|max_age| {
            now.duration_since(info.written_at)
                .is_ok_and(|age| age > max_age)
        })
    });

    let mut victims: Vec<ScopeKey> = expired.iter().map(|info| info.scope.clone()).collect();

    if let Some(max_bytes) = policy.max_bytes {
        kept.sort_by(|a, b| a.written_at.cmp(&b.written_at).then_with(|| a.scope.cmp(&b.scope)));
        let mut total: u64 = kept.iter().map(|info| info.size_bytes).sum();
        for info in kept {
            if total <= max_bytes {
                break;
            }
            total -= info.size_bytes;
            victims.push(info.scope.clone());
        }
    }

    victims
}

/// Applies `policy` every `interval` until `cancel` fires.
pub fn spawn_periodic(
    store: Arc<DocStore>,
    policy: EvictionPolicy,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let store = store.clone();
            match tokio::task::spawn_blocking(move || store.evict(&policy)).await {
                Ok(Ok(report)) => {
                    tracing::debug!(removed = report.removed.len(), "Periodic eviction finished");
                }
                Ok(Err(e)) => tracing::warn!(error = %e, "Periodic eviction failed"),
                Err(e) => tracing::error!(error = %e, "Eviction task panicked"),
            }
        }

        tracing::debug!("Eviction task stopped");
    })
}
