//! crates/podcast_core/src/history.rs
//!
//! Cached list of the account's podcasts, newest first.

use crate::backend::BackendClient;
use crate::domain::{GeneratedPodcast, Job, JobStatus};
use crate::error::{FlowError, FlowResult};
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Clone)]
pub struct HistoryCache {
    backend: BackendClient,
    jobs: Arc<RwLock<Vec<Job>>>,
}

impl HistoryCache {
    pub fn new(backend: BackendClient) -> Self {
        Self {
            backend,
            jobs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn refresh(&self) -> FlowResult<Vec<Job>> {
        let mut fresh = self.backend.get_history().await?;
        // Records without a timestamp sort last.
        fresh.sort_by_key(|job| Reverse(job.created_at));
        info!("Loaded {} podcasts from history", fresh.len());
        *self.jobs.write().await = fresh.clone();
        Ok(fresh)
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.jobs.read().await.clone()
    }

    pub async fn find(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().await.iter().find(|j| j.job_id == job_id).cloned()
    }

    /// Deletes the podcast on the backend, then drops it from the cache.
    pub async fn delete(&self, job_id: &str) -> FlowResult<()> {
        self.backend.delete_podcast(job_id).await?;
        self.jobs.write().await.retain(|j| j.job_id != job_id);
        info!("Deleted podcast {}", job_id);
        Ok(())
    }

    /// A finished podcast from the cache, ready for the player.
    pub async fn replay(&self, job_id: &str) -> FlowResult<GeneratedPodcast> {
        let job = self
            .find(job_id)
            .await
            .ok_or_else(|| FlowError::Validation(format!("No podcast with id '{}' in your history.", job_id)))?;
        match (&job.status, job.audio_url) {
            (JobStatus::Complete, Some(audio_url)) => Ok(GeneratedPodcast {
                title: if job.title.trim().is_empty() {
                    "A Podcast".to_string()
                } else {
                    job.title
                },
                job_id: job.job_id,
                script: job.script,
                audio_url,
            }),
            (status, _) => Err(FlowError::Validation(format!(
                "Podcast '{}' is not playable yet (status {}).",
                job_id, status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::paths;
    use crate::testing::FakeCaller;
    use serde_json::json;

    fn history(fake: &Arc<FakeCaller>) -> HistoryCache {
        HistoryCache::new(BackendClient::new(fake.clone(), "user-1"))
    }

    #[tokio::test]
    async fn refresh_orders_newest_first() {
        let fake = FakeCaller::new();
        fake.respond(
            paths::GET_HISTORY,
            Ok(json!([
                { "jobId": "old", "status": "COMPLETE", "createdAt": "2024-01-01T00:00:00Z" },
                { "jobId": "undated", "status": "PENDING" },
                { "jobId": "new", "status": "COMPLETE", "createdAt": "2024-06-01T00:00:00Z" }
            ])),
        );
        let cache = history(&fake);

        let ids: Vec<String> = cache.refresh().await.unwrap().into_iter().map(|j| j.job_id).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }

    #[tokio::test]
    async fn delete_removes_entry_after_backend_ack() {
        let fake = FakeCaller::new();
        fake.respond(
            paths::GET_HISTORY,
            Ok(json!([{ "jobId": "a", "status": "COMPLETE" }, { "jobId": "b", "status": "FAILED" }])),
        );
        fake.respond(paths::DELETE_PODCAST, Ok(json!({ "message": "deleted" })));
        let cache = history(&fake);
        cache.refresh().await.unwrap();

        cache.delete("a").await.unwrap();
        assert!(cache.find("a").await.is_none());
        assert_eq!(cache.jobs().await.len(), 1);
        assert_eq!(fake.calls_to(paths::DELETE_PODCAST)[0]["jobId"], "a");
    }

    #[tokio::test]
    async fn replay_requires_a_completed_job_with_audio() {
        let fake = FakeCaller::new();
        fake.respond(
            paths::GET_HISTORY,
            Ok(json!([
                { "jobId": "done", "status": "COMPLETE", "audioUrl": "https://cdn/done.mp3", "title": "Bees" },
                { "jobId": "busy", "status": "PROCESSING" }
            ])),
        );
        let cache = history(&fake);
        cache.refresh().await.unwrap();

        let podcast = cache.replay("done").await.unwrap();
        assert_eq!(podcast.title, "Bees");
        assert_eq!(podcast.audio_url, "https://cdn/done.mp3");
        assert!(matches!(cache.replay("busy").await, Err(FlowError::Validation(_))));
        assert!(matches!(cache.replay("nope").await, Err(FlowError::Validation(_))));
    }
}
