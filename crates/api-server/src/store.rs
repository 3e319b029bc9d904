//! Media plans held in a bounded DashMap, and the `users` table behind the
//! database proxy. Users live in Postgres when `database.url` is set (see
//! [`crate::pg_users`]) and in memory otherwise.

use async_trait::async_trait;
use campaign_core::types::{CampaignData, MediaPlan};
use campaign_core::{CampaignError, CampaignResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

// ─── Media plans ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredPlan {
    plan: MediaPlan,
    campaign: Option<CampaignData>,
}

/// Thread-safe store of media plans keyed by plan id. Holds at most
/// `capacity` plans; inserting past that evicts the least recently updated.
pub struct PlanStore {
    plans: DashMap<Uuid, StoredPlan>,
    capacity: usize,
}

impl PlanStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            plans: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn insert(&self, plan: MediaPlan, campaign: Option<CampaignData>) -> MediaPlan {
        while self.plans.len() >= self.capacity && !self.plans.contains_key(&plan.id) {
            if !self.evict_stalest() {
                break;
            }
        }
        self.plans.insert(
            plan.id,
            StoredPlan {
                plan: plan.clone(),
                campaign,
            },
        );
        plan
    }

    fn evict_stalest(&self) -> bool {
        let stalest = self
            .plans
            .iter()
            .min_by_key(|r| r.value().plan.updated_at)
            .map(|r| *r.key());
        match stalest {
            Some(id) => {
                self.plans.remove(&id);
                debug!(plan_id = %id, "Evicted media plan");
                metrics::counter!("api.media_plans.evicted").increment(1);
                true
            }
            None => false,
        }
    }

    pub fn list(&self) -> Vec<MediaPlan> {
        let mut plans: Vec<MediaPlan> =
            self.plans.iter().map(|r| r.value().plan.clone()).collect();
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        plans
    }

    pub fn get(&self, id: Uuid) -> CampaignResult<MediaPlan> {
        self.plans
            .get(&id)
            .map(|r| r.value().plan.clone())
            .ok_or(CampaignError::PlanNotFound(id))
    }

    pub fn campaign(&self, id: Uuid) -> CampaignResult<Option<CampaignData>> {
        self.plans
            .get(&id)
            .map(|r| r.value().campaign.clone())
            .ok_or(CampaignError::PlanNotFound(id))
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.plans.remove(&id).is_some()
    }

    /// Run `f` against the stored plan while holding its entry lock.
    pub fn update<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut MediaPlan) -> CampaignResult<T>,
    ) -> CampaignResult<T> {
        let mut entry = self
            .plans
            .get_mut(&id)
            .ok_or(CampaignError::PlanNotFound(id))?;
        f(&mut entry.value_mut().plan)
    }

    /// Swap in a regenerated plan under the same id.
    pub fn replace(
        &self,
        id: Uuid,
        mut plan: MediaPlan,
        campaign: CampaignData,
    ) -> CampaignResult<MediaPlan> {
        let mut entry = self
            .plans
            .get_mut(&id)
            .ok_or(CampaignError::PlanNotFound(id))?;
        plan.id = id;
        plan.created_at = entry.value().plan.created_at;
        *entry.value_mut() = StoredPlan {
            plan: plan.clone(),
            campaign: Some(campaign),
        };
        Ok(plan)
    }
}

// ─── Users ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub website_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
}

pub fn normalize_email(raw: &str) -> CampaignResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(CampaignError::Validation(format!(
            "invalid email address: {raw}"
        )))
    }
}

/// The `users` table. Saving upserts by lowercased email; fields left
/// unset in the update keep their stored value.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create the `users` table if needed. Idempotent.
    async fn initialize(&self) -> CampaignResult<()>;

    async fn save_user(&self, user: NewUser) -> CampaignResult<UserRecord>;

    async fn get_user_by_email(&self, email: &str) -> CampaignResult<Option<UserRecord>>;
}

/// `users` table kept in memory for development and tests.
pub struct InMemoryUserStore {
    users: DashMap<String, UserRecord>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn initialize(&self) -> CampaignResult<()> {
        // nothing to create
        Ok(())
    }

    async fn save_user(&self, user: NewUser) -> CampaignResult<UserRecord> {
        let email = normalize_email(&user.email)?;
        let now = Utc::now();

        let record = self
            .users
            .entry(email.clone())
            .and_modify(|existing| {
                if user.name.is_some() {
                    existing.name = user.name.clone();
                }
                if user.company.is_some() {
                    existing.company = user.company.clone();
                }
                if user.industry.is_some() {
                    existing.industry = user.industry.clone();
                }
                if user.website_url.is_some() {
                    existing.website_url = user.website_url.clone();
                }
                existing.updated_at = now;
            })
            .or_insert_with(|| UserRecord {
                id: Uuid::new_v4(),
                email,
                name: user.name.clone(),
                company: user.company.clone(),
                industry: user.industry.clone(),
                website_url: user.website_url.clone(),
                created_at: now,
                updated_at: now,
            })
            .value()
            .clone();

        Ok(record)
    }

    async fn get_user_by_email(&self, email: &str) -> CampaignResult<Option<UserRecord>> {
        let email = normalize_email(email)?;
        Ok(self.users.get(&email).map(|r| r.value().clone()))
    }
}
