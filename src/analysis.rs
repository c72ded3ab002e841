use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::Submission;
use crate::submissions::SubmissionTracker;

/// Source of the simulated AI-usage percentage.
pub trait UsageScorer: Send {
    /// Returns a value in `0..=100`.
    fn score(&mut self) -> u8;
}

struct Slot {
    generation: u64,
    committing: bool,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct InFlight {
    next_generation: u64,
    slots: HashMap<u64, Slot>,
}

impl InFlight {
    /// Marks the slot as committing if it still belongs to `generation`.
    /// A committing slot can no longer be cancelled.
    fn claim(&mut self, submission_id: u64, generation: u64) -> bool {
        match self.slots.get_mut(&submission_id) {
            Some(slot) if slot.generation == generation => {
                slot.committing = true;
                true
            }
            _ => false,
        }
    }

    fn release(&mut self, submission_id: u64, generation: u64) {
        if self
            .slots
            .get(&submission_id)
            .is_some_and(|slot| slot.generation == generation)
        {
            self.slots.remove(&submission_id);
        }
    }
}

/// Runs simulated analyses as timed tasks keyed by submission id.
///
/// Each submission has its own in-flight slot, so analyses of different
/// submissions never block each other. Completed analyses are published
/// through a watch channel as the current result.
pub struct Analyzer {
    tracker: Arc<RwLock<SubmissionTracker>>,
    scorer: Arc<Mutex<Box<dyn UsageScorer>>>,
    latency: Duration,
    in_flight: Arc<Mutex<InFlight>>,
    result_tx: watch::Sender<Option<Submission>>,
}

impl Analyzer {
    pub fn new(
        tracker: Arc<RwLock<SubmissionTracker>>,
        scorer: Box<dyn UsageScorer>,
        latency: Duration,
    ) -> Self {
        let (result_tx, _) = watch::channel(None);
        Self {
            tracker,
            scorer: Arc::new(Mutex::new(scorer)),
            latency,
            in_flight: Arc::new(Mutex::new(InFlight::default())),
            result_tx,
        }
    }

    /// Starts an analysis for `submission_id`. Returns `false` when one is
    /// already running for that id.
    ///
    /// Status is not checked: analyzing an analyzed submission draws a new
    /// score. Callers only offer the action for pending submissions.
    pub fn analyze(&self, submission_id: u64) -> bool {
        let mut in_flight = lock(&self.in_flight);
        if in_flight.slots.contains_key(&submission_id) {
            debug!("analysis for submission {} already running", submission_id);
            return false;
        }
        in_flight.next_generation += 1;
        let generation = in_flight.next_generation;

        let tracker = Arc::clone(&self.tracker);
        let scorer = Arc::clone(&self.scorer);
        let slots = Arc::clone(&self.in_flight);
        let result_tx = self.result_tx.clone();
        let latency = self.latency;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            if !lock(&slots).claim(submission_id, generation) {
                debug!("analysis {} for submission {} was cancelled", generation, submission_id);
                return;
            }

            let ai_usage = lock(&scorer).score().min(100);
            let updated = tracker.write().await.record_analysis(submission_id, ai_usage);
            // Release before publishing so a woken subscriber sees the slot gone.
            lock(&slots).release(submission_id, generation);

            match updated {
                Some(submission) => {
                    debug!(
                        "analysis finished for submission {}: {}",
                        submission_id,
                        submission.feedback.as_deref().unwrap_or_default()
                    );
                    result_tx.send_replace(Some(submission));
                }
                None => warn!("submission {} disappeared before analysis finished", submission_id),
            }
        });
        in_flight.slots.insert(
            submission_id,
            Slot {
                generation,
                committing: false,
                handle,
            },
        );
        true
    }

    /// Aborts a running analysis and leaves the submission as it was.
    /// Returns `false` when nothing is running for the id or the result is
    /// already being recorded.
    pub fn cancel(&self, submission_id: u64) -> bool {
        let mut in_flight = lock(&self.in_flight);
        match in_flight.slots.get(&submission_id) {
            Some(slot) if !slot.committing => {}
            _ => return false,
        }
        if let Some(slot) = in_flight.slots.remove(&submission_id) {
            slot.handle.abort();
            debug!("cancelled analysis for submission {}", submission_id);
        }
        true
    }

    pub fn cancel_all(&self) {
        let mut in_flight = lock(&self.in_flight);
        in_flight.slots.retain(|_, slot| {
            if slot.committing {
                return true;
            }
            slot.handle.abort();
            false
        });
    }

    pub fn is_analyzing(&self, submission_id: u64) -> bool {
        lock(&self.in_flight).slots.contains_key(&submission_id)
    }

    pub fn is_busy(&self) -> bool {
        !lock(&self.in_flight).slots.is_empty()
    }

    pub fn current_result(&self) -> Option<Submission> {
        self.result_tx.borrow().clone()
    }

    /// Subscribe to result-ready notifications.
    pub fn subscribe(&self) -> watch::Receiver<Option<Submission>> {
        self.result_tx.subscribe()
    }

    pub fn dismiss_result(&self) {
        self.result_tx.send_replace(None);
    }
}

impl Drop for Analyzer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
