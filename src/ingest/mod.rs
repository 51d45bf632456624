//! Ingestion runs: generate → parse → normalize → store, one run per scope.
//!
//! A run is a spawned task whose completion is shared by every caller that
//! asks for the same scope while it is in flight. Generation, parsing and
//! normalization are bounded by the configured timeout and can be cancelled.
//! The store write that follows always runs to completion: a run that ends in
//! `Cancelled` or `GenerationTimeout` has not written anything, and a run whose
//! write has begun reports its result.

pub mod generator;
pub mod project;
pub mod stdlib;

pub use generator::{CargoRustdocGenerator, CrateOrigin, CrateTarget, DocGenerator};
pub use project::{CrateFailure, CrateReport, GenerationSummary};
pub use stdlib::StdlibDocs;

use crate::error::{DocsError, Result};
use crate::normalize::{self, NormalizeStats, NormalizedScope};
use crate::raw;
use crate::store::DocStore;
use crate::types::ScopeKey;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

type SharedRun = Shared<BoxFuture<'static, Result<IngestReport>>>;

/// Result of one successful ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    #[serde(rename = "crate")]
    pub crate_name: String,
    pub version: String,
    pub doc_count: usize,
    pub skipped: usize,
    pub malformed: usize,
}

impl IngestReport {
    fn new(scope: &ScopeKey, doc_count: usize, stats: &NormalizeStats) -> Self {
        Self {
            crate_name: scope.crate_name().to_string(),
            version: scope.version().to_string(),
            doc_count,
            skipped: stats.skipped + stats.shadowed,
            malformed: stats.malformed,
        }
    }
}

struct InFlight {
    run_id: u64,
    future: SharedRun,
    cancel: CancellationToken,
}

/// What a run ingests.
enum Source {
    Generate(CrateTarget),
    Json(Vec<u8>),
}

pub struct Ingestor {
    store: Arc<DocStore>,
    generator: Arc<dyn DocGenerator>,
    timeout: Duration,
    in_flight: Arc<Mutex<HashMap<ScopeKey, InFlight>>>,
    next_run: AtomicU64,
}

impl Ingestor {
    pub fn new(store: Arc<DocStore>, generator: Arc<dyn DocGenerator>, timeout: Duration) -> Self {
        Self {
            store,
            generator,
            timeout,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_run: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<DocStore> {
        &self.store
    }

    /// Generates and stores documentation for `target`, or joins the run
    /// already in flight for the same scope.
    pub async fn ingest_target(&self, target: CrateTarget) -> Result<IngestReport> {
        let scope = target.scope();
        self.run(scope, Source::Generate(target)).await
    }

    /// Stores documentation from rustdoc JSON that is already on hand.
    pub async fn ingest_json(&self, scope: ScopeKey, bytes: Vec<u8>) -> Result<IngestReport> {
        self.run(scope, Source::Json(bytes)).await
    }

    /// Cancels the run in flight for `scope`. Returns whether one was running.
    pub async fn cancel(&self, scope: &ScopeKey) -> bool {
        match self.in_flight.lock().await.get(scope) {
            Some(run) => {
                tracing::info!(scope = %scope, run_id = run.run_id, "Cancelling ingestion run");
                run.cancel.cancel();
                true
            }
            None => false,
        }
    }

    async fn run(&self, scope: ScopeKey, source: Source) -> Result<IngestReport> {
        let future = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(run) = in_flight.get(&scope) {
                tracing::debug!(scope = %scope, run_id = run.run_id, "Awaiting in-flight ingestion");
                run.future.clone()
            } else {
                let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
                let cancel = CancellationToken::new();
                let future = self.spawn_run(run_id, scope.clone(), source, cancel.clone());
                in_flight.insert(
                    scope.clone(),
                    InFlight {
                        run_id,
                        future: future.clone(),
                        cancel,
                    },
                );
                tracing::info!(scope = %scope, run_id, "Starting ingestion run");
                future
            }
        };

        future.await
    }

    fn spawn_run(
        &self,
        run_id: u64,
        scope: ScopeKey,
        source: Source,
        cancel: CancellationToken,
    ) -> SharedRun {
        let store = self.store.clone();
        let generator = self.generator.clone();
        let in_flight = self.in_flight.clone();
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            let prepared = tokio::time::timeout(timeout, prepare(generator.as_ref(), &scope, source, &cancel))
                .await
                .unwrap_or_else(|_| {
                    cancel.cancel();
                    Err(DocsError::GenerationTimeout {
                        scope: scope.to_string(),
                        seconds: timeout.as_secs(),
                    })
                });
            let result = match prepared {
                Ok(normalized) => commit(&store, &scope, normalized, &cancel).await,
                Err(e) => Err(e),
            };

            match &result {
                Ok(report) => tracing::info!(
                    scope = %scope,
                    run_id,
                    doc_count = report.doc_count,
                    "Ingestion run finished"
                ),
                Err(e) => tracing::warn!(
                    scope = %scope,
                    run_id,
                    error_type = e.error_type(),
                    error = %e,
                    "Ingestion run failed"
                ),
            }

            let mut in_flight = in_flight.lock().await;
            if in_flight.get(&scope).is_some_and(|run| run.run_id == run_id) {
                in_flight.remove(&scope);
            }
            result
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(DocsError::generation(format!("ingestion task failed: {}", e))))
        }
        .boxed()
        .shared()
    }
}

fn cancelled(scope: &ScopeKey) -> DocsError {
    DocsError::Cancelled {
        scope: scope.to_string(),
    }
}

/// Generates (when needed), parses and normalizes. Everything here may be
/// abandoned by the timeout or by cancellation.
async fn prepare(
    generator: &dyn DocGenerator,
    scope: &ScopeKey,
    source: Source,
    cancel: &CancellationToken,
) -> Result<NormalizedScope> {
    let bytes = match source {
        Source::Json(bytes) => bytes,
        Source::Generate(target) => {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled(scope)),
                bytes = generator.generate(&target, cancel.clone()) => bytes?,
            }
        }
    };
    if cancel.is_cancelled() {
        return Err(cancelled(scope));
    }

    let normalize_scope = scope.clone();
    tokio::task::spawn_blocking(move || {
        let tree = raw::parse(&bytes)?;
        normalize::normalize(&tree, &normalize_scope)
    })
    .await
    .map_err(|e| DocsError::malformed(format!("normalization task failed: {}", e)))?
}

/// Swaps the normalized items into the store. A cancellation that arrives
/// after this starts no longer applies.
async fn commit(
    store: &Arc<DocStore>,
    scope: &ScopeKey,
    normalized: NormalizedScope,
    cancel: &CancellationToken,
) -> Result<IngestReport> {
    // Partial output is discarded once cancelled.
    if cancel.is_cancelled() {
        return Err(cancelled(scope));
    }

    let store = store.clone();
    let write_scope = scope.clone();
    let stats = normalized.stats;
    let doc_count = tokio::task::spawn_blocking(move || store.replace_scope(&write_scope, normalized.items))
        .await
        .map_err(|e| DocsError::Storage {
            message: format!("store task failed: {}", e),
        })??;

    Ok(IngestReport::new(scope, doc_count, &stats))
}
