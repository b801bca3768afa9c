//! crates/podcast_core/src/job.rs
//!
//! The lifecycle of one podcast request, from script generation to finished audio.
//!
//! ```text
//! Idle -> ScriptPending -> ScriptReady -> AudioPending -> Complete | Failed
//!                              |
//!                              +-- disapprove --> Idle
//! ```
//!
//! Every transition takes `&mut self`, so a second request cannot be issued
//! while one is outstanding. The Hoot is charged when the audio job is
//! accepted; a job that later fails is not refunded.

use crate::backend::BackendClient;
use crate::domain::{GeneratedPodcast, GenerationRequest, Job, JobStatus};
use crate::error::{FlowError, FlowResult};
use crate::history::HistoryCache;
use crate::ledger::BalanceLedger;
use crate::poller::{CheckOutcome, PollEvent, PollFailure, PollPolicy, PollSubscription, Poller};
use crate::profiles::ProfileBook;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    ScriptPending,
    ScriptReady {
        script: String,
    },
    AudioPending {
        job_id: String,
        /// Last status label reported by the backend.
        status: Option<String>,
    },
    Complete(GeneratedPodcast),
    Failed {
        job_id: String,
        error: FlowError,
    },
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ScriptPending => "generating a script",
            Self::ScriptReady { .. } => "a script is awaiting approval",
            Self::AudioPending { .. } => "audio is being created",
            Self::Complete(_) => "complete",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Failed { .. })
    }
}

/// Progress reported while audio is being created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobUpdate {
    Progress { attempt: u32, status: Option<String> },
    Completed(GeneratedPodcast),
    Failed(FlowError),
}

pub struct JobStateMachine {
    backend: BackendClient,
    ledger: BalanceLedger,
    poller: Poller,
    subscription: Option<PollSubscription<Job>>,
    state: JobState,
    request: Option<GenerationRequest>,
    cancel: CancellationToken,
    profiles: Option<ProfileBook>,
    history: Option<HistoryCache>,
}

impl JobStateMachine {
    pub fn new(backend: BackendClient, ledger: BalanceLedger, policy: PollPolicy) -> Self {
        Self {
            backend,
            ledger,
            poller: Poller::new(policy),
            subscription: None,
            state: JobState::Idle,
            request: None,
            cancel: CancellationToken::new(),
            profiles: None,
            history: None,
        }
    }

    /// Refresh this profile book (and with it the balance) after a job completes.
    pub fn with_profiles(mut self, profiles: ProfileBook) -> Self {
        self.profiles = Some(profiles);
        self
    }

    /// Refresh this history cache after a job completes.
    pub fn with_history(mut self, history: HistoryCache) -> Self {
        self.history = Some(history);
        self
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    /// The script awaiting approval, if any.
    pub fn script(&self) -> Option<&str> {
        match &self.state {
            JobState::ScriptReady { script } => Some(script),
            _ => None,
        }
    }

    pub fn request(&self) -> Option<&GenerationRequest> {
        self.request.as_ref()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// A handle that tears the flow down from elsewhere (e.g. a signal handler).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    //-------------------------------------------------------------------------------------
    // Transitions
    //-------------------------------------------------------------------------------------

    /// Asks the backend for a script. Validation and the balance check happen
    /// before any request is sent.
    pub async fn generate_script(&mut self, request: GenerationRequest) -> FlowResult<String> {
        match &self.state {
            // A stale ScriptPending means a previous call was dropped mid-flight.
            JobState::Idle | JobState::ScriptPending => {}
            state if state.is_terminal() => {}
            state => {
                return Err(FlowError::InvalidState {
                    operation: "generate a script",
                    state: state.name(),
                })
            }
        }
        validate(&request)?;
        self.ledger.require_funds()?;

        self.reset_job();
        self.state = JobState::ScriptPending;
        info!("Generating script for topic '{}'", request.topic.trim());

        let result = self.cancellable(self.backend.generate_script(&request)).await;
        match result {
            Ok(script) => {
                info!("Script ready ({} characters)", script.len());
                self.state = JobState::ScriptReady {
                    script: script.clone(),
                };
                self.request = Some(request);
                Ok(script)
            }
            Err(e) => {
                error!("Failed to generate script: {}", e);
                self.state = JobState::Idle;
                self.request = None;
                Err(e)
            }
        }
    }

    /// Throws the pending script away. No request, no charge.
    pub fn disapprove(&mut self) -> FlowResult<()> {
        if !matches!(self.state, JobState::ScriptReady { .. }) {
            return Err(FlowError::InvalidState {
                operation: "discard the script",
                state: self.state.name(),
            });
        }
        self.state = JobState::Idle;
        self.request = None;
        info!("Script disapproved. No Hoot was used.");
        Ok(())
    }

    /// Submits the (possibly edited) script for audio and starts polling.
    ///
    /// On failure the machine stays in `ScriptReady` with the edited script so
    /// the user can try again.
    pub async fn approve(&mut self, edited_script: &str, voice_id: &str) -> FlowResult<String> {
        if !matches!(self.state, JobState::ScriptReady { .. }) {
            return Err(FlowError::InvalidState {
                operation: "approve a script",
                state: self.state.name(),
            });
        }
        let Some(request) = self.request.clone() else {
            return Err(FlowError::InvalidState {
                operation: "approve a script",
                state: "no request is on record",
            });
        };
        if edited_script.trim().is_empty() {
            return Err(FlowError::Validation("The script cannot be empty.".to_string()));
        }
        let voice_id = if voice_id.trim().is_empty() {
            request.voice_id.clone()
        } else {
            voice_id.trim().to_string()
        };

        self.state = JobState::ScriptReady {
            script: edited_script.to_string(),
        };
        self.ledger.require_funds()?;

        info!("Submitting audio job with voice {}", voice_id);
        let ticket = self
            .cancellable(self.backend.create_audio_job(&request, edited_script, &voice_id))
            .await
            .map_err(|e| {
                error!("Failed to create audio job: {}", e);
                e
            })?;

        // The server already charged; a concurrent spend may have emptied the
        // local copy. The echoed balance or a profile refresh corrects it.
        let echoed = ticket.balance();
        if let Err(e) = self.ledger.decrement() {
            warn!("Local balance could not be decremented: {}", e);
            if echoed.is_none() {
                self.refresh_balance().await;
            }
        }
        if let Some(balance) = echoed {
            self.ledger.reconcile(balance);
        }

        let job_id = ticket.job_id;
        let backend = self.backend.clone();
        let subscription = self.poller.start(job_id.clone(), move |id| {
            let backend = backend.clone();
            async move { backend.check_job_status(&id).await.map(classify) }
        });
        self.subscription = Some(subscription);
        self.state = JobState::AudioPending {
            job_id: job_id.clone(),
            status: None,
        };
        info!("Audio job {} queued", job_id);
        Ok(job_id)
    }

    /// Waits for the next poll result and applies it.
    ///
    /// Returns `None` when nothing is being polled.
    pub async fn next_update(&mut self) -> Option<JobUpdate> {
        let JobState::AudioPending { job_id, .. } = &self.state else {
            return None;
        };
        let job_id = job_id.clone();
        let subscription = self.subscription.as_mut()?;

        let event = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("Job {} abandoned before completion", job_id);
                return Some(self.fail(job_id, FlowError::Cancelled));
            }
            event = subscription.next() => event,
        };

        match event {
            Some(PollEvent::Pending { attempt, label }) => {
                info!(
                    "Creating audio... (Status: {})",
                    label.as_deref().unwrap_or("PENDING")
                );
                self.state = JobState::AudioPending {
                    job_id,
                    status: label.clone(),
                };
                Some(JobUpdate::Progress {
                    attempt,
                    status: label,
                })
            }
            Some(PollEvent::Complete(job)) => {
                let podcast = self.podcast_from(job_id, job);
                info!("Job {} complete", podcast.job_id);
                self.finish_polling();
                self.state = JobState::Complete(podcast.clone());
                self.after_completion().await;
                Some(JobUpdate::Completed(podcast))
            }
            Some(PollEvent::Failed(failure)) => {
                let error = match failure {
                    PollFailure::Reported(reason) => FlowError::GenerationFailed(reason),
                    PollFailure::CheckError(e) => FlowError::from(e),
                    PollFailure::TimedOut { attempts } => FlowError::Timeout { attempts },
                };
                error!("Job {} failed: {}", job_id, error);
                Some(self.fail(job_id, error))
            }
            None => {
                // The subscription ended without a verdict; the job must not
                // stay pending with nothing left to report on it.
                let error = FlowError::Server {
                    status: None,
                    message: "Status polling stopped before the job finished.".to_string(),
                };
                error!("Job {} lost its status updates", job_id);
                Some(self.fail(job_id, error))
            }
        }
    }

    /// Drives polling to the end, reporting each pending status to `on_progress`.
    pub async fn wait_for_completion<F>(&mut self, mut on_progress: F) -> FlowResult<GeneratedPodcast>
    where
        F: FnMut(u32, Option<&str>),
    {
        loop {
            match self.next_update().await {
                Some(JobUpdate::Progress { attempt, status }) => on_progress(attempt, status.as_deref()),
                Some(JobUpdate::Completed(podcast)) => return Ok(podcast),
                Some(JobUpdate::Failed(error)) => return Err(error),
                None => {
                    return Err(FlowError::InvalidState {
                        operation: "wait for audio",
                        state: self.state.name(),
                    })
                }
            }
        }
    }

    /// Stops polling and abandons any outstanding request. Used on teardown.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        self.finish_polling();
        if let JobState::AudioPending { job_id, .. } = &self.state {
            warn!("Job {} abandoned before completion", job_id);
            self.state = JobState::Failed {
                job_id: job_id.clone(),
                error: FlowError::Cancelled,
            };
        }
    }

    //-------------------------------------------------------------------------------------
    // Helpers
    //-------------------------------------------------------------------------------------

    async fn cancellable<T, Fut>(&self, call: Fut) -> FlowResult<T>
    where
        Fut: Future<Output = crate::ports::PortResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FlowError::Cancelled),
            result = call => result.map_err(FlowError::from),
        }
    }

    fn reset_job(&mut self) {
        self.finish_polling();
        self.request = None;
        self.state = JobState::Idle;
    }

    fn finish_polling(&mut self) {
        self.poller.stop();
        self.subscription = None;
    }

    fn fail(&mut self, job_id: String, error: FlowError) -> JobUpdate {
        self.finish_polling();
        self.state = JobState::Failed {
            job_id,
            error: error.clone(),
        };
        JobUpdate::Failed(error)
    }

    fn podcast_from(&self, job_id: String, job: Job) -> GeneratedPodcast {
        let title = if job.title.trim().is_empty() {
            fallback_title(self.request.as_ref())
        } else {
            job.title
        };
        GeneratedPodcast {
            job_id,
            title,
            script: job.script,
            audio_url: job.audio_url.unwrap_or_default(),
        }
    }

    async fn refresh_balance(&self) {
        if let Some(profiles) = &self.profiles {
            if let Err(e) = profiles.refresh().await {
                warn!("Could not refresh the balance from the server: {}", e);
            }
        }
    }

    async fn after_completion(&self) {
        if let Some(profiles) = &self.profiles {
            if let Err(e) = profiles.refresh().await {
                warn!("Could not refresh profile after completion: {}", e);
            }
        }
        if let Some(history) = &self.history {
            if let Err(e) = history.refresh().await {
                warn!("Could not refresh history after completion: {}", e);
            }
        }
    }
}

fn validate(request: &GenerationRequest) -> FlowResult<()> {
    if request.topic.trim().is_empty() {
        return Err(FlowError::Validation("Please enter a topic for the podcast.".to_string()));
    }
    if !request.anonymize && request.subject_profiles.is_empty() {
        return Err(FlowError::Validation(
            "Select at least one child profile or make the podcast anonymous.".to_string(),
        ));
    }
    Ok(())
}

/// Maps a status record onto a poll outcome.
fn classify(job: Job) -> CheckOutcome<Job> {
    match job.status {
        JobStatus::Complete if job.audio_url.as_deref().is_some_and(|u| !u.is_empty()) => {
            CheckOutcome::Complete(job)
        }
        JobStatus::Complete => CheckOutcome::Failed("The job finished without an audio file.".to_string()),
        JobStatus::Failed => CheckOutcome::Failed(
            job.error_message
                .unwrap_or_else(|| "The backend did not say why.".to_string()),
        ),
        status => CheckOutcome::Pending(Some(status.label().to_string())),
    }
}

fn fallback_title(request: Option<&GenerationRequest>) -> String {
    match request.and_then(GenerationRequest::lead_child_name) {
        Some(name) => format!("A Special Podcast for {}", name),
        None => "A Special Podcast".to_string(),
    }
}
