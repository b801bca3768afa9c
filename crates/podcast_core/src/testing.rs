//! In-memory doubles shared by the unit tests.

use crate::domain::{AcademicLevel, ContentFormat, GenerationRequest, Profile};
use crate::ports::{PortError, PortResult, RemoteCaller};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A `RemoteCaller` that answers from scripted responses and records every call.
#[derive(Default)]
pub struct FakeCaller {
    queued: Mutex<HashMap<String, VecDeque<PortResult<Value>>>>,
    sticky: Mutex<HashMap<String, PortResult<Value>>>,
    stalled: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeCaller {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers every call to `path` with `result` unless a queued answer exists.
    pub fn respond(&self, path: &str, result: PortResult<Value>) {
        self.sticky.lock().unwrap().insert(path.to_string(), result);
    }

    /// Answers the next call to `path` with `result`.
    pub fn respond_once(&self, path: &str, result: PortResult<Value>) {
        self.queued
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(result);
    }

    /// Calls to `path` never resolve.
    pub fn stall(&self, path: &str) {
        self.stalled.lock().unwrap().insert(path.to_string());
    }

    /// Calls to `path` resolve only after `delay`.
    pub fn delay(&self, path: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(path.to_string(), delay);
    }

    pub fn calls_to(&self, path: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteCaller for FakeCaller {
    async fn call(&self, path: &str, payload: Value) -> PortResult<Value> {
        self.calls.lock().unwrap().push((path.to_string(), payload));

        let stalled = self.stalled.lock().unwrap().contains(path);
        if stalled {
            futures::future::pending::<()>().await;
        }
        let delay = self.delays.lock().unwrap().get(path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(|q| q.pop_front());
        if let Some(result) = queued {
            return result;
        }
        self.sticky
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(PortError::Unexpected(format!("no response scripted for {}", path))))
    }
}

pub fn child(id: &str, name: &str) -> Profile {
    Profile {
        id: id.to_string(),
        name: name.to_string(),
        birthdate: NaiveDate::from_ymd_opt(2017, 4, 2),
        interests: BTreeSet::from(["Dragons".to_string()]),
    }
}

pub fn request_for(topic: &str) -> GenerationRequest {
    GenerationRequest {
        topic: topic.to_string(),
        subject_profiles: vec![child("c1", "Ada")],
        anonymize: false,
        academic_level: AcademicLevel::default(),
        voice_id: "voice-default".to_string(),
        content_format: ContentFormat::Podcast,
    }
}
