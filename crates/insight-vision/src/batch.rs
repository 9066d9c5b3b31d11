//! Bounded worker pool for the batch flow
//!
//! Workers pull the next index from a shared counter, so at most `jobs`
//! requests are in flight at once. Each item resolves on its own: a failed call
//! becomes an error record and never stops the remaining items.

use crate::ai::client::InferenceClient;
use crate::analyze_accident_record;
use crate::cancel::CancelToken;
use insight_types::{AccidentRecord, ImageTask};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default number of concurrent requests
pub const DEFAULT_JOBS: usize = 4;

/// An uploaded image together with its current table row
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub task: ImageTask,
    pub record: AccidentRecord,
}

impl BatchItem {
    pub fn new(task: ImageTask) -> Self {
        Self {
            task,
            record: AccidentRecord::pending(),
        }
    }
}

/// Partial-progress notification
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started { index: usize, id: Uuid },
    Finished { index: usize, id: Uuid, record: AccidentRecord },
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum concurrent requests (at least 1)
    pub jobs: usize,
    pub cancel: CancelToken,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            cancel: CancelToken::new(),
        }
    }
}

impl BatchOptions {
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Progress callback invoked from worker threads
pub type BatchProgress<'a> = &'a (dyn Fn(BatchEvent) + Sync);

/// Analyze every pending item and return one record per input, in input order.
///
/// Items already in a terminal state are returned unchanged. If the token is
/// cancelled, items no worker has picked up yet stay pending.
pub fn analyze_batch(
    client: &dyn InferenceClient,
    items: &[BatchItem],
    options: &BatchOptions,
    progress: Option<BatchProgress<'_>>,
) -> Vec<AccidentRecord> {
    let total = items.len();
    let mut records: Vec<AccidentRecord> = items.iter().map(|item| item.record.clone()).collect();
    if total == 0 {
        return records;
    }

    let workers = options.jobs.clamp(1, total);
    let next_index = AtomicUsize::new(0);
    let finished: Mutex<Vec<(usize, AccidentRecord)>> = Mutex::new(Vec::with_capacity(total));

    debug!(total, workers, "Starting batch analysis");

    let notify = |event: BatchEvent| {
        if let Some(cb) = progress {
            cb(event);
        }
    };

    thread::scope(|scope| {
        for worker_id in 0..workers {
            let next_index = &next_index;
            let finished = &finished;
            let notify = &notify;
            let cancel = &options.cancel;

            scope.spawn(move || loop {
                if cancel.is_cancelled() {
                    debug!(worker_id, "Worker stopping: batch cancelled");
                    break;
                }

                let index = next_index.fetch_add(1, Ordering::SeqCst);
                if index >= total {
                    break;
                }

                let item = &items[index];
                let id = item.task.id;

                let record = if item.record.status.is_terminal() {
                    item.record.clone()
                } else {
                    notify(BatchEvent::Started { index, id });
                    debug!(worker_id, index, label = %item.task.label, "Analyzing image");

                    match analyze_accident_record(client, &item.task.bytes) {
                        Ok(record) => record,
                        Err(e) => {
                            warn!(index, label = %item.task.label, error = %e, "Image analysis failed");
                            AccidentRecord::failed()
                        }
                    }
                };

                notify(BatchEvent::Finished {
                    index,
                    id,
                    record: record.clone(),
                });

                finished
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((index, record));
            });
        }
    });

    for (index, record) in finished.into_inner().unwrap_or_else(PoisonError::into_inner) {
        records[index] = record;
    }

    records
}
