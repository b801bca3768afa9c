//! crates/podcast_core/src/profiles.rs
//!
//! Local mirror of the account profile and its saved children.
//!
//! The backend stores the profile as a whole, so every edit pushes the full
//! child list with `update-user-profile`. The local copy only changes after
//! the backend accepted the new list.

use crate::backend::BackendClient;
use crate::domain::{Profile, UserProfile};
use crate::error::{FlowError, FlowResult};
use crate::ledger::BalanceLedger;
use chrono::{NaiveDate, Utc};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Fields to change on an existing child. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ChildEdit {
    pub name: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub interests: Option<BTreeSet<String>>,
}

#[derive(Clone)]
pub struct ProfileBook {
    backend: BackendClient,
    ledger: BalanceLedger,
    cache: Arc<RwLock<UserProfile>>,
}

impl ProfileBook {
    pub fn new(backend: BackendClient, ledger: BalanceLedger) -> Self {
        Self {
            backend,
            ledger,
            cache: Arc::new(RwLock::new(UserProfile::default())),
        }
    }

    /// Fetches the profile, replaces the cache and reconciles the balance.
    pub async fn refresh(&self) -> FlowResult<UserProfile> {
        let mut cache = self.cache.write().await;
        let fresh = self.backend.get_user_profile().await?;
        self.ledger.reconcile(fresh.balance);
        *cache = fresh.clone();
        info!(
            "Loaded profile with {} children and {} Hoots",
            fresh.children.len(),
            fresh.balance
        );
        Ok(fresh)
    }

    pub async fn snapshot(&self) -> UserProfile {
        self.cache.read().await.clone()
    }

    pub async fn children(&self) -> Vec<Profile> {
        self.cache.read().await.children.clone()
    }

    pub async fn find(&self, id: &str) -> Option<Profile> {
        self.cache
            .read()
            .await
            .children
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Resolves ids to profiles, keeping the caller's order.
    pub async fn select(&self, ids: &[String]) -> FlowResult<Vec<Profile>> {
        let cache = self.cache.read().await;
        ids.iter()
            .map(|id| {
                cache
                    .children
                    .iter()
                    .find(|c| &c.id == id)
                    .cloned()
                    .ok_or_else(|| FlowError::Validation(format!("No saved child with id '{}'.", id)))
            })
            .collect()
    }

    pub async fn add_child(
        &self,
        name: &str,
        birthdate: NaiveDate,
        interests: BTreeSet<String>,
    ) -> FlowResult<Profile> {
        let name = validate_child(name, Some(birthdate))?;
        let mut cache = self.cache.write().await;

        let profile = Profile {
            id: new_profile_id(&cache.children),
            name,
            birthdate: Some(birthdate),
            interests,
        };
        let mut children = cache.children.clone();
        children.push(profile.clone());

        self.push(&mut cache, children).await?;
        info!("Added child profile {}", profile.id);
        Ok(profile)
    }

    pub async fn edit_child(&self, id: &str, edit: ChildEdit) -> FlowResult<Profile> {
        let mut cache = self.cache.write().await;
        let mut children = cache.children.clone();
        let slot = children
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| FlowError::Validation(format!("No saved child with id '{}'.", id)))?;

        let name = edit.name.unwrap_or_else(|| slot.name.clone());
        let birthdate = edit.birthdate.or(slot.birthdate);
        slot.name = validate_child(&name, birthdate)?;
        slot.birthdate = birthdate;
        if let Some(interests) = edit.interests {
            slot.interests = interests;
        }
        let updated = slot.clone();

        self.push(&mut cache, children).await?;
        info!("Updated child profile {}", id);
        Ok(updated)
    }

    pub async fn remove_child(&self, id: &str) -> FlowResult<()> {
        let mut cache = self.cache.write().await;
        if !cache.children.iter().any(|c| c.id == id) {
            return Err(FlowError::Validation(format!("No saved child with id '{}'.", id)));
        }
        let children: Vec<Profile> = cache.children.iter().filter(|c| c.id != id).cloned().collect();

        self.push(&mut cache, children).await?;
        info!("Removed child profile {}", id);
        Ok(())
    }

    async fn push(&self, cache: &mut UserProfile, children: Vec<Profile>) -> FlowResult<()> {
        let echoed = self
            .backend
            .update_user_profile(cache.first_name.as_deref(), &children)
            .await?;
        if let Some(balance) = echoed {
            self.ledger.reconcile(balance);
            cache.balance = balance;
        }
        cache.children = children;
        Ok(())
    }
}

fn validate_child(name: &str, birthdate: Option<NaiveDate>) -> FlowResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FlowError::Validation("Please enter the child's name.".to_string()));
    }
    if birthdate.is_some_and(|d| d > Utc::now().date_naive()) {
        return Err(FlowError::Validation("Birthdate cannot be in the future.".to_string()));
    }
    Ok(name.to_string())
}

/// Time-ordered id, unique within `existing`.
fn new_profile_id(existing: &[Profile]) -> String {
    loop {
        let id = Uuid::now_v7().to_string();
        if !existing.iter().any(|c| c.id == id) {
            return id;
        }
    }
}

/// Splits free text such as `"Minecraft, Dragons; space"` into a set of interests.
pub fn parse_interests(raw: &str) -> BTreeSet<String> {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    let separator = SEPARATOR.get_or_init(|| Regex::new(r"\s*[,;\n]\s*").expect("static regex"));
    separator
        .split(raw)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::paths;
    use crate::ports::PortError;
    use crate::testing::FakeCaller;
    use serde_json::json;

    fn book(fake: &Arc<FakeCaller>, ledger: &BalanceLedger) -> ProfileBook {
        ProfileBook::new(BackendClient::new(fake.clone(), "user-1"), ledger.clone())
    }

    fn birthdate() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 9, 14).unwrap()
    }

    #[tokio::test]
    async fn refresh_reconciles_balance() {
        let fake = FakeCaller::new();
        fake.respond(
            paths::GET_USER_PROFILE,
            Ok(json!({ "firstName": "Sam", "hoots": 12, "children": [] })),
        );
        let ledger = BalanceLedger::new(2);
        let profiles = book(&fake, &ledger);

        let profile = profiles.refresh().await.unwrap();
        assert_eq!(profile.balance, 12);
        assert_eq!(ledger.get(), 12);
    }

    #[tokio::test]
    async fn add_child_assigns_unique_ids_and_pushes_full_list() {
        let fake = FakeCaller::new();
        fake.respond(paths::UPDATE_USER_PROFILE, Ok(json!({ "message": "ok" })));
        let ledger = BalanceLedger::new(1);
        let profiles = book(&fake, &ledger);

        let a = profiles
            .add_child(" Ada ", birthdate(), parse_interests("Dragons, space"))
            .await
            .unwrap();
        let b = profiles.add_child("Ben", birthdate(), BTreeSet::new()).await.unwrap();

        assert_eq!(a.name, "Ada");
        assert_ne!(a.id, b.id);
        let pushes = fake.calls_to(paths::UPDATE_USER_PROFILE);
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[1]["children"].as_array().unwrap().len(), 2);
        assert_eq!(profiles.children().await.len(), 2);
    }

    #[tokio::test]
    async fn failed_push_leaves_cache_untouched() {
        let fake = FakeCaller::new();
        fake.respond(
            paths::UPDATE_USER_PROFILE,
            Err(PortError::Server {
                status: 500,
                message: "boom".to_string(),
            }),
        );
        let ledger = BalanceLedger::new(1);
        let profiles = book(&fake, &ledger);

        let err = profiles.add_child("Ada", birthdate(), BTreeSet::new()).await.unwrap_err();
        assert_eq!(
            err,
            FlowError::Server {
                status: Some(500),
                message: "boom".to_string()
            }
        );
        assert!(profiles.children().await.is_empty());
    }

    #[tokio::test]
    async fn edit_and_remove_existing_child() {
        let fake = FakeCaller::new();
        fake.respond(paths::UPDATE_USER_PROFILE, Ok(json!({ "hoots": 9 })));
        let ledger = BalanceLedger::new(1);
        let profiles = book(&fake, &ledger);
        let ada = profiles.add_child("Ada", birthdate(), BTreeSet::new()).await.unwrap();
        assert_eq!(ledger.get(), 9);

        let edited = profiles
            .edit_child(
                &ada.id,
                ChildEdit {
                    interests: Some(parse_interests("Bees")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.name, "Ada");
        assert!(edited.interests.contains("Bees"));

        profiles.remove_child(&ada.id).await.unwrap();
        assert!(profiles.find(&ada.id).await.is_none());
    }

    #[tokio::test]
    async fn child_without_a_birthdate_can_still_be_edited() {
        let fake = FakeCaller::new();
        fake.respond(
            paths::GET_USER_PROFILE,
            Ok(json!({ "hoots": 3, "children": [{ "id": "c1", "name": "Ada", "birthdate": "n/a" }] })),
        );
        fake.respond(paths::UPDATE_USER_PROFILE, Ok(json!({ "message": "ok" })));
        let profiles = book(&fake, &BalanceLedger::new(0));
        profiles.refresh().await.unwrap();

        let edited = profiles
            .edit_child(
                "c1",
                ChildEdit {
                    name: Some("Ada Lovelace".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.birthdate, None);

        let pushed = &fake.calls_to(paths::UPDATE_USER_PROFILE)[0]["children"][0];
        assert_eq!(pushed["name"], "Ada Lovelace");
        assert!(pushed.get("birthdate").is_none());
    }

    #[tokio::test]
    async fn validation_happens_before_any_request() {
        let fake = FakeCaller::new();
        let profiles = book(&fake, &BalanceLedger::new(1));

        assert!(matches!(
            profiles.add_child("  ", birthdate(), BTreeSet::new()).await,
            Err(FlowError::Validation(_))
        ));
        let tomorrow = Utc::now().date_naive().succ_opt().unwrap();
        assert!(matches!(
            profiles.add_child("Ada", tomorrow, BTreeSet::new()).await,
            Err(FlowError::Validation(_))
        ));
        assert!(matches!(
            profiles.remove_child("missing").await,
            Err(FlowError::Validation(_))
        ));
        assert!(matches!(
            profiles.select(&["missing".to_string()]).await,
            Err(FlowError::Validation(_))
        ));
        assert_eq!(fake.total_calls(), 0);
    }

    #[test]
    fn interests_are_split_trimmed_and_deduplicated() {
        let parsed = parse_interests("Minecraft, Dragons;space ,, Dragons\nRobots");
        let expected: BTreeSet<String> = ["Dragons", "Minecraft", "Robots", "space"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(parsed, expected);
        assert!(parse_interests("  ").is_empty());
    }
}
