//! crates/podcast_core/src/backend.rs
//!
//! A typed client over the `RemoteCaller` port: one method per backend
//! endpoint, plus the serde wire records that map onto the domain types.

use crate::domain::{GenerationRequest, Job, JobStatus, Profile, UserProfile};
use crate::ports::{PortError, PortResult, RemoteCaller};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod paths {
    pub const GENERATE_SCRIPT: &str = "generate-script";
    pub const CREATE_AUDIO_JOB: &str = "create-audio-job";
    pub const CHECK_JOB_STATUS: &str = "check-job-status";
    pub const GET_HISTORY: &str = "get-history";
    pub const GET_USER_PROFILE: &str = "get-user-profile";
    pub const UPDATE_USER_PROFILE: &str = "update-user-profile";
    pub const DELETE_PODCAST: &str = "delete-podcast";
    pub const CREATE_PAYMENT_SESSION: &str = "create-payment-session";
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_date", skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<NaiveDate>,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// Reads a `YYYY-MM-DD` date (a trailing time part is ignored). Blank or
/// unreadable values become `None` so one bad record does not fail the list.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let date = raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    if date.is_none() {
        warn!("Ignoring unreadable birthdate '{}'", raw);
    }
    Ok(date)
}

impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            id: self.id,
            name: self.name,
            birthdate: self.birthdate,
            interests: self
                .interests
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<BTreeSet<_>>(),
        }
    }
}

impl From<&Profile> for ProfileRecord {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            birthdate: profile.birthdate,
            interests: profile.interests.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateScriptPayload<'a> {
    user_id: &'a str,
    topic: &'a str,
    children: Vec<ProfileRecord>,
    is_anonymous: bool,
    academic_level: &'static str,
    content_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateScriptResponse {
    #[serde(default)]
    script: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAudioJobPayload<'a> {
    user_id: &'a str,
    script: &'a str,
    voice_id: &'a str,
    topic: &'a str,
    children: Vec<ProfileRecord>,
    child_name: Option<&'a str>,
    is_anonymous: bool,
}

/// What the backend says after accepting an audio job.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AudioJobTicket {
    pub job_id: String,
    /// Some backend revisions spelled this `newTokeBalance`.
    #[serde(default, alias = "newTokeBalance", alias = "newTokenBalance")]
    pub new_balance: Option<i64>,
}

impl AudioJobTicket {
    pub fn balance(&self) -> Option<u32> {
        self.new_balance.map(clamp_balance)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobIdPayload<'a> {
    job_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserIdPayload<'a> {
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeletePodcastPayload<'a> {
    user_id: &'a str,
    job_id: &'a str,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl JobRecord {
    /// `fallback_id` covers status responses that do not echo the id back.
    fn to_domain(self, fallback_id: &str) -> Job {
        Job {
            job_id: self.job_id.unwrap_or_else(|| fallback_id.to_string()),
            status: JobStatus::parse(self.status.as_deref().unwrap_or_default()),
            script: self.script,
            audio_url: self.audio_url,
            title: self.title.unwrap_or_default(),
            created_at: self.created_at,
            error_message: self.error_message,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct UserProfileRecord {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default, alias = "tokenBalance", alias = "balance")]
    hoots: Option<i64>,
    #[serde(default)]
    children: Vec<ProfileRecord>,
}

impl UserProfileRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            first_name: self.first_name,
            balance: self.hoots.map(clamp_balance).unwrap_or_default(),
            children: self.children.into_iter().map(ProfileRecord::to_domain).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserProfilePayload<'a> {
    user_id: &'a str,
    first_name: Option<&'a str>,
    children: Vec<ProfileRecord>,
}

/// Some update responses echo the balance; most only acknowledge.
#[derive(Debug, Deserialize)]
struct UpdateUserProfileResponse {
    #[serde(default, alias = "tokenBalance", alias = "balance")]
    hoots: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentSessionPayload<'a> {
    price_id: &'a str,
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct PaymentSessionResponse {
    #[serde(default)]
    url: Option<String>,
}

fn clamp_balance(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

//=========================================================================================
// BackendClient
//=========================================================================================

/// Typed access to the backend on behalf of one signed-in user.
#[derive(Clone)]
pub struct BackendClient {
    caller: Arc<dyn RemoteCaller>,
    user_id: String,
}

impl BackendClient {
    pub fn new(caller: Arc<dyn RemoteCaller>, user_id: impl Into<String>) -> Self {
        Self {
            caller,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn post<P: Serialize, R: DeserializeOwned>(&self, path: &str, payload: &P) -> PortResult<R> {
        let body = serde_json::to_value(payload)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode {} payload: {}", path, e)))?;
        debug!("POST {}", path);
        let response = self.caller.call(path, body).await?;
        serde_json::from_value(response)
            .map_err(|e| PortError::Malformed(format!("Unexpected {} response: {}", path, e)))
    }

    /// Asks the backend to write a script. A response without one is malformed.
    pub async fn generate_script(&self, request: &GenerationRequest) -> PortResult<String> {
        let payload = GenerateScriptPayload {
            user_id: &self.user_id,
            topic: request.topic.trim(),
            children: subject_records(request),
            is_anonymous: request.anonymize,
            academic_level: request.academic_level.label(),
            content_type: request.content_format.as_str(),
        };
        let response: GenerateScriptResponse = self.post(paths::GENERATE_SCRIPT, &payload).await?;
        response
            .script
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PortError::Malformed("The backend didn't return a script.".to_string()))
    }

    pub async fn create_audio_job(
        &self,
        request: &GenerationRequest,
        script: &str,
        voice_id: &str,
    ) -> PortResult<AudioJobTicket> {
        let payload = CreateAudioJobPayload {
            user_id: &self.user_id,
            script,
            voice_id,
            topic: request.topic.trim(),
            children: subject_records(request),
            child_name: request.lead_child_name(),
            is_anonymous: request.anonymize,
        };
        let ticket: AudioJobTicket = self.post(paths::CREATE_AUDIO_JOB, &payload).await?;
        if ticket.job_id.trim().is_empty() {
            return Err(PortError::Malformed("The backend returned an empty job id.".to_string()));
        }
        Ok(ticket)
    }

    pub async fn check_job_status(&self, job_id: &str) -> PortResult<Job> {
        let record: JobRecord = self
            .post(paths::CHECK_JOB_STATUS, &JobIdPayload { job_id })
            .await?;
        Ok(record.to_domain(job_id))
    }

    /// Jobs without an id cannot be replayed or deleted and are skipped.
    pub async fn get_history(&self) -> PortResult<Vec<Job>> {
        let records: Vec<JobRecord> = self
            .post(paths::GET_HISTORY, &UserIdPayload { user_id: &self.user_id })
            .await?;
        Ok(records
            .into_iter()
            .filter(|r| r.job_id.as_deref().is_some_and(|id| !id.is_empty()))
            .map(|r| r.to_domain(""))
            .collect())
    }

    pub async fn get_user_profile(&self) -> PortResult<UserProfile> {
        let record: UserProfileRecord = self
            .post(paths::GET_USER_PROFILE, &UserIdPayload { user_id: &self.user_id })
            .await?;
        Ok(record.to_domain())
    }

    /// Replaces the stored profile. Returns the balance if the backend echoed one.
    pub async fn update_user_profile(
        &self,
        first_name: Option<&str>,
        children: &[Profile],
    ) -> PortResult<Option<u32>> {
        let payload = UpdateUserProfilePayload {
            user_id: &self.user_id,
            first_name,
            children: children.iter().map(ProfileRecord::from).collect(),
        };
        // An empty body is a plain acknowledgement.
        let ack: Option<UpdateUserProfileResponse> = self.post(paths::UPDATE_USER_PROFILE, &payload).await?;
        Ok(ack.and_then(|a| a.hoots).map(clamp_balance))
    }

    pub async fn delete_podcast(&self, job_id: &str) -> PortResult<()> {
        let payload = DeletePodcastPayload {
            user_id: &self.user_id,
            job_id,
        };
        let body = serde_json::to_value(&payload).map_err(|e| {
            PortError::Unexpected(format!("Failed to encode delete-podcast payload: {}", e))
        })?;
        self.caller.call(paths::DELETE_PODCAST, body).await?;
        Ok(())
    }

    /// Returns the external checkout URL for the given price.
    pub async fn create_payment_session(&self, price_id: &str) -> PortResult<String> {
        let payload = PaymentSessionPayload {
            price_id,
            user_id: &self.user_id,
        };
        let response: PaymentSessionResponse = self.post(paths::CREATE_PAYMENT_SESSION, &payload).await?;
        response.url.filter(|u| !u.trim().is_empty()).ok_or_else(|| {
            PortError::Malformed("No checkout URL was returned from the server.".to_string())
        })
    }
}

fn subject_records(request: &GenerationRequest) -> Vec<ProfileRecord> {
    if request.anonymize {
        return Vec::new();
    }
    request.subject_profiles.iter().map(ProfileRecord::from).collect()
}
