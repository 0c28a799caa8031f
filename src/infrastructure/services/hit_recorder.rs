//! Best-effort, non-blocking access counting
//!
//! Hits are queued on a bounded channel and applied to the cache store by a
//! background task. When the queue is full the record is dropped and counted
//! instead of slowing down the lookup.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::data_manager::DataManager;
use crate::infrastructure::observability;

#[derive(Debug)]
pub struct HitRecorder {
    sender: mpsc::Sender<String>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl HitRecorder {
    /// Spawn the background worker on the current tokio runtime
    pub fn spawn(data_manager: DataManager, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let worker = tokio::spawn(run_worker(data_manager, receiver, shutdown_rx));

        Self {
            sender,
            shutdown,
            worker: Mutex::new(Some(worker)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue a hit; never waits
    pub fn record(&self, entry_id: &str) {
        if let Err(e) = self.sender.try_send(entry_id.to_string()) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            observability::record_dropped_hit();
            debug!(entry_id = %entry_id, reason = %e, "Dropped hit record");
        }
    }

    /// Records dropped since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop the worker after it has applied everything already queued
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);

        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(e) => {
                warn!("Hit recorder lock poisoned: {}", e);
                None
            }
        };

        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!("Hit recorder worker failed: {}", e);
            }
        }
    }
}

async fn run_worker(
    data_manager: DataManager,
    mut receiver: mpsc::Receiver<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            next = receiver.recv() => match next {
                Some(id) => apply(&data_manager, &id).await,
                None => break,
            },
            _ = shutdown.changed() => {
                receiver.close();
                while let Some(id) = receiver.recv().await {
                    apply(&data_manager, &id).await;
                }
                break;
            }
        }
    }

    debug!("Hit recorder stopped");
}

async fn apply(data_manager: &DataManager, id: &str) {
    match data_manager.record_hit(id).await {
        Ok(true) => {}
        Ok(false) => debug!(entry_id = %id, "Hit for entry that no longer exists"),
        Err(e) => warn!(entry_id = %id, error = %e, "Failed to record hit"),
    }
}
