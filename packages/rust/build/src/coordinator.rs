//! Single-flight build coordination.
//!
//! At most one pipeline execution runs per coordinate at a time. The
//! in-flight table maps coordinates to a `watch` receiver; the `entry`
//! API makes check-then-install atomic, so exactly one caller installs
//! the entry for a missing coordinate and everyone waits on the receiver
//! without busy-waiting. The pipeline itself runs on a spawned task,
//! detached from the installing request's connection: a client that
//! disconnects mid-build must not abort the run its fellow waiters
//! share. An RAII guard publishes the outcome and removes the entry on
//! every exit path, so a panicking build task reads as failure to its
//! waiters instead of wedging them.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tracing::{debug, warn};

use kiln_shared::Coordinate;
use kiln_store::ArtifactStore;

use crate::pipeline::BuildPipeline;

type OutcomeReceiver = watch::Receiver<Option<bool>>;

/// Deduplicates concurrent build requests per coordinate.
pub struct BuildCoordinator {
    inner: Arc<Inner>,
}

/// Shared state, owned jointly by the coordinator and the spawned build
/// tasks it detaches.
struct Inner {
    pipeline: BuildPipeline,
    in_flight: DashMap<Coordinate, OutcomeReceiver>,
}

impl BuildCoordinator {
    pub fn new(pipeline: BuildPipeline) -> Self {
        Self {
            inner: Arc::new(Inner {
                pipeline,
                in_flight: DashMap::new(),
            }),
        }
    }

    /// The pipeline's artifact store, for pre-flight cache-hit checks.
    pub fn store(&self) -> &ArtifactStore {
        self.inner.pipeline.store()
    }

    /// Ensure the coordinate's artifact is built, returning whether it is
    /// now present and usable.
    ///
    /// If a build for this coordinate is already in flight the caller
    /// blocks until that build's outcome and returns it. Otherwise the
    /// caller installs a new entry and spawns the single pipeline
    /// execution, then waits on it like every other caller — cancelling
    /// the installing request leaves the build running for the rest. All
    /// concurrent callers for one coordinate observe the identical
    /// outcome of the single run.
    pub async fn ensure_built(&self, coordinate: &Coordinate) -> bool {
        let rx = match self.inner.in_flight.entry(coordinate.clone()) {
            Entry::Occupied(occupied) => {
                let rx = occupied.get().clone();
                drop(occupied);
                debug!(%coordinate, "joining in-flight build");
                rx
            }
            Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(None);
                vacant.insert(rx.clone());

                let inner = Arc::clone(&self.inner);
                let coordinate = coordinate.clone();
                tokio::spawn(async move {
                    let guard = FlightGuard {
                        inner,
                        coordinate: coordinate.clone(),
                        tx,
                        outcome: false,
                    };
                    let outcome = match guard.inner.pipeline.execute(&coordinate).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(%coordinate, error = %e, "build failed");
                            false
                        }
                    };
                    guard.finish(outcome);
                });

                rx
            }
        };

        wait_for_outcome(rx).await
    }
}

/// Wait for the build task to publish an outcome. A dropped sender (the
/// build task panicked) counts as failure for this waiter only.
async fn wait_for_outcome(mut rx: OutcomeReceiver) -> bool {
    loop {
        let current = *rx.borrow();
        if let Some(outcome) = current {
            return outcome;
        }
        if rx.changed().await.is_err() {
            return false;
        }
    }
}

/// Publishes the build outcome and clears the in-flight entry on drop.
///
/// Drop runs on the normal path and on panic; a build task that never
/// reached `finish` publishes the default `false`. The outcome is sent
/// before the entry is removed, so a caller arriving in between either
/// reads the published value or misses the entry and starts a fresh
/// build.
struct FlightGuard {
    inner: Arc<Inner>,
    coordinate: Coordinate,
    tx: watch::Sender<Option<bool>>,
    outcome: bool,
}

impl FlightGuard {
    fn finish(mut self, outcome: bool) -> bool {
        self.outcome = outcome;
        outcome
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(Some(self.outcome));
        self.inner.in_flight.remove(&self.coordinate);
    }
}
