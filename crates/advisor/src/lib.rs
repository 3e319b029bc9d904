//! AI-assisted planning — LLM persona and media-plan suggestions with a
//! deterministic fallback, plus website scraping for business context.

pub mod error;
pub mod generator;
pub mod openai;
pub mod scrape;

use async_trait::async_trait;
use campaign_core::types::{AudiencePersona, CampaignData};
use campaign_media_plan::Flight;
use serde::{Deserialize, Serialize};

pub use error::{AdvisorError, AdvisorResult};
pub use generator::{GeneratedPlan, PlanGenerator, PlanSource};
pub use openai::OpenAiAdvisor;
pub use scrape::ScrapeClient;

/// Inputs for persona generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaRequest {
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub industry: String,
    /// Scraped or pasted business description.
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedAllocation {
    pub platform: String,
    pub share: f64,
}

/// What the LLM proposes for a campaign.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSuggestion {
    #[serde(default)]
    pub persona: Option<AudiencePersona>,
    #[serde(default)]
    pub allocations: Vec<SuggestedAllocation>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[async_trait]
pub trait PlanAdvisor: Send + Sync {
    async fn suggest_plan(
        &self,
        request: &CampaignData,
        flight: Flight,
    ) -> AdvisorResult<PlanSuggestion>;

    async fn suggest_personas(
        &self,
        request: &PersonaRequest,
    ) -> AdvisorResult<Vec<AudiencePersona>>;
}
