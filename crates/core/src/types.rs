use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the planning wizard collects about a campaign before a media
/// plan is generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignData {
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub audience_persona: AudiencePersona,
    pub budget: BudgetDescriptor,
    #[serde(default)]
    pub creative: CreativeDescriptor,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudiencePersona {
    #[serde(default)]
    pub name: String,
    /// Free-form range such as `"25-34"`.
    #[serde(default)]
    pub age_range: String,
    #[serde(default)]
    pub gender: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub behaviors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetType {
    Daily,
    #[default]
    Total,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDescriptor {
    pub amount: f64,
    #[serde(default, rename = "type")]
    pub budget_type: BudgetType,
    /// Flight length in days. Unset means the planner's configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
}

impl BudgetDescriptor {
    pub fn duration_or(&self, default_days: u32) -> u32 {
        self.duration.unwrap_or(default_days)
    }

    /// Total spend over a `days`-long flight: `amount × days` for daily
    /// budgets, `amount` otherwise.
    pub fn total_budget(&self, days: u32) -> f64 {
        match self.budget_type {
            BudgetType::Daily => self.amount * f64::from(days),
            BudgetType::Total => self.amount,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreativeDescriptor {
    #[serde(default)]
    pub formats: Vec<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub cta: String,
}

// ─── Media plan ────────────────────────────────────────────────────────────

/// Insertion-order status. Any value may be set at any time; only `Draft`
/// gates launching.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IoStatus {
    #[default]
    Draft,
    Ready,
    Signed,
}

impl IoStatus {
    pub fn permits_launch(self) -> bool {
        !matches!(self, IoStatus::Draft)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IoStatus::Draft => "draft",
            IoStatus::Ready => "ready",
            IoStatus::Signed => "signed",
        }
    }
}

/// A single platform + format + budget line item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub id: Uuid,
    pub platform: String,
    pub format: String,
    pub placement: String,
    pub budget: f64,
    pub cpm: f64,
    pub impressions: f64,
}

/// Impressions bought by `budget` at `cpm`; zero when the CPM is not positive.
pub fn impressions_for(budget: f64, cpm: f64) -> f64 {
    if cpm > 0.0 {
        budget / cpm * 1000.0
    } else {
        0.0
    }
}

impl Placement {
    pub fn new(
        platform: impl Into<String>,
        format: impl Into<String>,
        placement: impl Into<String>,
        budget: f64,
        cpm: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform: platform.into(),
            format: format.into(),
            placement: placement.into(),
            budget,
            cpm,
            impressions: impressions_for(budget, cpm),
        }
    }

    pub fn recompute_impressions(&mut self) {
        self.impressions = impressions_for(self.budget, self.cpm);
    }
}

/// User-supplied placement fields for the manual edit path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementInput {
    pub platform: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub placement: String,
    pub budget: f64,
    pub cpm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPlan {
    pub id: Uuid,
    pub placements: Vec<Placement>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub io_number: String,
    pub io_status: IoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaPlan {
    pub fn total_budget(&self) -> f64 {
        self.placements.iter().map(|p| p.budget).sum()
    }

    pub fn total_impressions(&self) -> f64 {
        self.placements.iter().map(|p| p.impressions).sum()
    }

    /// `(total budget / total impressions) × 1000`, or zero without impressions.
    pub fn blended_cpm(&self) -> f64 {
        blended_cpm(self.total_budget(), self.total_impressions())
    }

    /// Flight length in whole days, never less than one.
    pub fn flight_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days().max(1)
    }
}

pub fn blended_cpm(total_budget: f64, total_impressions: f64) -> f64 {
    if total_impressions > 0.0 {
        total_budget / total_impressions * 1000.0
    } else {
        0.0
    }
}
