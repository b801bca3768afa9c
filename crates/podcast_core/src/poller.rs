//! crates/podcast_core/src/poller.rs
//!
//! Bounded-interval status polling.
//!
//! A `Poller` owns its attempt counter and its stop signal. `start` spawns a
//! task that runs the check once per interval, never overlapping two checks,
//! and reports what it sees through a `PollSubscription`. The task ends on the
//! first terminal result, when the attempt budget runs out, or on `stop()`.

use crate::ports::{PortError, PortResult};
use futures::Stream;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How often to check and how many checks to allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    max_attempts: u32,
}

impl PollPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 24;
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    /// A budget of zero attempts is raised to one; polling is always bounded.
    /// Intervals below `MIN_INTERVAL` are raised to it.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval: interval.max(Self::MIN_INTERVAL),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// What a single check found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome<T> {
    /// Not done yet. Carries the server's status label when it sent one.
    Pending(Option<String>),
    Complete(T),
    Failed(String),
}

/// Why polling ended without a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollFailure {
    /// The check reported a failed job.
    Reported(String),
    /// The check itself errored.
    CheckError(PortError),
    TimedOut { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent<T> {
    Pending { attempt: u32, label: Option<String> },
    Complete(T),
    Failed(PollFailure),
}

impl<T> PollEvent<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollEvent::Pending { .. })
    }
}

//=========================================================================================
// Poller
//=========================================================================================

pub struct Poller {
    policy: PollPolicy,
    attempts: Arc<AtomicU32>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            attempts: Arc::new(AtomicU32::new(0)),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Checks made by the current (or most recent) run.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| !task.is_finished() && !self.cancel.is_cancelled())
            .unwrap_or(false)
    }

    /// Begins polling `job_id`, stopping any run already in progress.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<T, F, Fut>(&mut self, job_id: impl Into<String>, check: F) -> PollSubscription<T>
    where
        T: Send + 'static,
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = PortResult<CheckOutcome<T>>> + Send + 'static,
    {
        self.stop();

        let job_id = job_id.into();
        let cancel = CancellationToken::new();
        let attempts = Arc::new(AtomicU32::new(0));
        let (tx, rx) = mpsc::unbounded_channel();

        info!(
            "Polling job {} every {:?} (max {} attempts)",
            job_id,
            self.policy.interval,
            self.policy.max_attempts
        );
        let task = tokio::spawn(poll_loop(
            job_id,
            check,
            self.policy,
            attempts.clone(),
            cancel.clone(),
            tx,
        ));

        self.cancel = cancel.clone();
        self.attempts = attempts;
        self.task = Some(task);

        PollSubscription {
            rx,
            cancel,
            finished: false,
        }
    }

    /// Stops the timer. No event is delivered after this returns.
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        if let Some(task) = &self.task {
            if !task.is_finished() {
                debug!("Poller stopped before reaching a terminal state");
            }
            task.abort();
        }
    }
}

#[cfg(test)]
impl Poller {
    /// Kills the task without cancelling the run, as a panic in a check would.
    pub(crate) fn abort_task(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop<T, F, Fut>(
    job_id: String,
    mut check: F,
    policy: PollPolicy,
    attempts: Arc<AtomicU32>,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<PollEvent<T>>,
) where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = PortResult<CheckOutcome<T>>>,
{
    let mut ticker = tokio::time::interval(policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the first check waits one interval.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Checking job {} (attempt {})", job_id, attempt);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            outcome = check(job_id.clone()) => outcome,
        };

        let event = match outcome {
            Ok(CheckOutcome::Pending(label)) => PollEvent::Pending { attempt, label },
            Ok(CheckOutcome::Complete(payload)) => PollEvent::Complete(payload),
            Ok(CheckOutcome::Failed(reason)) => PollEvent::Failed(PollFailure::Reported(reason)),
            Err(e) => {
                warn!("Status check for job {} failed: {}", job_id, e);
                PollEvent::Failed(PollFailure::CheckError(e))
            }
        };
        let terminal = event.is_terminal();

        if cancel.is_cancelled() || tx.send(event).is_err() {
            return;
        }
        if terminal {
            return;
        }
        if attempt >= policy.max_attempts {
            warn!("Job {} still pending after {} attempts; giving up", job_id, attempt);
            let _ = tx.send(PollEvent::Failed(PollFailure::TimedOut { attempts: attempt }));
            return;
        }
    }
}

//=========================================================================================
// PollSubscription
//=========================================================================================

/// The receiving end of one polling run.
pub struct PollSubscription<T> {
    rx: mpsc::UnboundedReceiver<PollEvent<T>>,
    cancel: CancellationToken,
    finished: bool,
}

impl<T> PollSubscription<T> {
    /// Waits for the next event. Returns `None` once a terminal event has been
    /// delivered or the poller was stopped.
    pub async fn next(&mut self) -> Option<PollEvent<T>> {
        if self.finished || self.cancel.is_cancelled() {
            return None;
        }

        let received = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.rx.recv() => event,
        };

        match received {
            Some(event) => {
                if event.is_terminal() {
                    self.finished = true;
                }
                Some(event)
            }
            // The task ended without a verdict (it panicked or was aborted
            // from outside); report it once so the run still terminates.
            None if !self.cancel.is_cancelled() => {
                self.finished = true;
                warn!("Polling task ended before reporting a result");
                Some(PollEvent::Failed(PollFailure::CheckError(PortError::Unexpected(
                    "Status polling stopped before the job finished.".to_string(),
                ))))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    pub fn into_stream(mut self) -> impl Stream<Item = PollEvent<T>> {
        async_stream::stream! {
            while let Some(event) = self.next().await {
                yield event;
            }
        }
    }
}
