//! Scheduled background passes.
//!
//! The scheduler supervises one tokio task per installation. Each task
//! ticks at the installation's interval, re-loads the installation before
//! every pass, and tears itself down when the installation disappears or
//! disables sync. A tick never overlaps a running pass: the pass is awaited
//! inside the tick loop and missed ticks are skipped, so per-installation
//! mutual exclusion holds by construction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use taskbridge_core::{Actor, InstallationStore};

use crate::orchestrator::SyncOrchestrator;
use crate::report::PassDirection;

struct ScheduledSync {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Supervisor for per-installation sync timers.
pub struct SyncScheduler {
    orchestrator: Arc<SyncOrchestrator>,
    installations: Arc<dyn InstallationStore>,
    scheduled: Mutex<HashMap<Uuid, ScheduledSync>>,
}

impl SyncScheduler {
    /// Create a scheduler.
    #[must_use]
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        installations: Arc<dyn InstallationStore>,
    ) -> Self {
        Self {
            orchestrator,
            installations,
            scheduled: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or restart) the timer for an installation.
    ///
    /// The first pass runs one interval after scheduling, not immediately;
    /// an on-demand first pass is the caller's call to make.
    pub async fn schedule(&self, installation_id: Uuid, every: Duration) {
        // tokio's interval panics on a zero period, which would kill the
        // timer task before its first pass.
        let every = every.max(Duration::from_millis(1));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(run_timer(
            self.orchestrator.clone(),
            self.installations.clone(),
            installation_id,
            every,
            cancel_rx,
        ));

        let previous = self.scheduled.lock().await.insert(
            installation_id,
            ScheduledSync {
                cancel: cancel_tx,
                handle,
            },
        );
        if let Some(previous) = previous {
            stop(previous).await;
        }
        info!(installation_id = %installation_id, interval_secs = every.as_secs(), "Scheduled sync");
    }

    /// Cancel the timer for an installation.
    ///
    /// Waits for the task to stop; a pass already in flight finishes first
    /// and its log is persisted.
    pub async fn cancel(&self, installation_id: Uuid) {
        let entry = self.scheduled.lock().await.remove(&installation_id);
        if let Some(entry) = entry {
            stop(entry).await;
            info!(installation_id = %installation_id, "Cancelled scheduled sync");
        }
    }

    /// Cancel every timer and wait for all tasks to stop.
    pub async fn shutdown(&self) {
        let entries: Vec<ScheduledSync> = {
            let mut scheduled = self.scheduled.lock().await;
            scheduled.drain().map(|(_, entry)| entry).collect()
        };
        let count = entries.len();
        for entry in entries {
            stop(entry).await;
        }
        info!(count, "Scheduler shut down");
    }

    /// Installations with an active timer.
    ///
    /// Prunes entries whose task already tore itself down.
    pub async fn active(&self) -> Vec<Uuid> {
        let mut scheduled = self.scheduled.lock().await;
        scheduled.retain(|_, entry| !entry.handle.is_finished());
        scheduled.keys().copied().collect()
    }
}

async fn stop(entry: ScheduledSync) {
    // Receiver may already be gone when the task self-cancelled.
    let _ = entry.cancel.send(true);
    if let Err(e) = entry.handle.await {
        if !e.is_cancelled() {
            warn!(error = %e, "Scheduled sync task failed");
        }
    }
}

/// Timer loop for one installation.
async fn run_timer(
    orchestrator: Arc<SyncOrchestrator>,
    installations: Arc<dyn InstallationStore>,
    installation_id: Uuid,
    every: Duration,
    mut cancel: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // interval() fires immediately; consume that tick so the first pass
    // waits a full interval.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.changed() => {
                debug!(installation_id = %installation_id, "Sync timer cancelled");
                return;
            }
            _ = ticker.tick() => {
                // Re-load each tick; configuration may have changed since.
                match installations.get(installation_id).await {
                    Ok(Some(installation)) if installation.settings.enabled => {
                        orchestrator
                            .run_pass(&installation, PassDirection::Full, Actor::Scheduler)
                            .await;
                    }
                    Ok(Some(_)) => {
                        info!(installation_id = %installation_id, "Sync disabled; stopping timer");
                        return;
                    }
                    Ok(None) => {
                        info!(installation_id = %installation_id, "Installation removed; stopping timer");
                        return;
                    }
                    Err(e) => {
                        // Transient store trouble is not a reason to tear
                        // the timer down.
                        warn!(installation_id = %installation_id, error = %e, "Failed to load installation");
                    }
                }
            }
        }
    }
}
