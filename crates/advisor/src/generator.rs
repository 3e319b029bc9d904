//! Plan generation with the advisor in front and the deterministic
//! allocator behind it. Advisor failures never reach the caller.

use crate::{PersonaRequest, PlanAdvisor};
use campaign_core::types::{AudiencePersona, CampaignData, MediaPlan};
use campaign_core::CampaignResult;
use campaign_media_plan::BudgetAllocator;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Shown instead of advisor output whenever the advisor is unavailable.
pub const FALLBACK_SUGGESTIONS: &[&str] = &[
    "Start with broad targeting and narrow it once the first week of data is in.",
    "Refresh creatives every two to three weeks to avoid ad fatigue.",
    "Set up conversion tracking on every platform before scaling spend.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlan {
    pub plan: MediaPlan,
    pub persona: AudiencePersona,
    pub suggestions: Vec<String>,
    pub source: PlanSource,
}

fn fallback_suggestions() -> Vec<String> {
    FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

/// Generic personas used when the advisor cannot produce any.
pub fn fallback_personas(industry: &str) -> Vec<AudiencePersona> {
    let industry = if industry.trim().is_empty() {
        "your category"
    } else {
        industry.trim()
    };
    vec![
        AudiencePersona {
            name: "Value Seeker".to_string(),
            age_range: "25-34".to_string(),
            gender: vec!["all".to_string()],
            interests: vec![
                industry.to_string(),
                "deals".to_string(),
                "product reviews".to_string(),
            ],
            behaviors: vec!["compares prices".to_string(), "shops on mobile".to_string()],
        },
        AudiencePersona {
            name: "Established Professional".to_string(),
            age_range: "35-54".to_string(),
            gender: vec!["all".to_string()],
            interests: vec![
                industry.to_string(),
                "quality".to_string(),
                "productivity".to_string(),
            ],
            behaviors: vec![
                "researches before buying".to_string(),
                "reads newsletters".to_string(),
            ],
        },
    ]
}

pub struct PlanGenerator {
    advisor: Arc<dyn PlanAdvisor>,
    allocator: BudgetAllocator,
}

impl PlanGenerator {
    pub fn new(advisor: Arc<dyn PlanAdvisor>, allocator: BudgetAllocator) -> Self {
        Self { advisor, allocator }
    }

    pub fn allocator(&self) -> &BudgetAllocator {
        &self.allocator
    }

    /// Ask the advisor for a plan; on any advisor failure fall back to the
    /// table-driven split and the generic suggestions. Input guards (no
    /// platforms, bad budget) are still reported as errors.
    pub async fn generate(
        &self,
        data: &CampaignData,
        existing_io: Option<&str>,
    ) -> CampaignResult<GeneratedPlan> {
        let flight = self.allocator.validate(data)?;

        match self.advisor.suggest_plan(data, flight).await {
            Ok(suggestion) => {
                let shares = |platform: &str| {
                    suggestion
                        .allocations
                        .iter()
                        .find(|a| a.platform.trim().eq_ignore_ascii_case(platform.trim()))
                        .map(|a| a.share)
                };
                let allocations = self.allocator.allocate_with_weights(
                    &data.platforms,
                    &shares,
                    &data.industry,
                    &data.objective,
                    flight.total_budget,
                );
                let plan = self.allocator.assemble(
                    &allocations,
                    flight.days,
                    existing_io,
                    Utc::now().date_naive(),
                )?;

                let suggestions = if suggestion.suggestions.is_empty() {
                    fallback_suggestions()
                } else {
                    suggestion.suggestions
                };

                metrics::counter!("advisor.plans", "source" => "ai").increment(1);
                info!(io_number = %plan.io_number, "Media plan generated from advisor suggestion");

                Ok(GeneratedPlan {
                    plan,
                    persona: suggestion
                        .persona
                        .unwrap_or_else(|| data.audience_persona.clone()),
                    suggestions,
                    source: PlanSource::Ai,
                })
            }
            Err(e) => {
                warn!(error = %e, "Advisor unavailable, using deterministic allocation");
                metrics::counter!("advisor.plans", "source" => "fallback").increment(1);

                let plan = self.allocator.generate_plan(data, existing_io)?;
                Ok(GeneratedPlan {
                    plan,
                    persona: data.audience_persona.clone(),
                    suggestions: fallback_suggestions(),
                    source: PlanSource::Fallback,
                })
            }
        }
    }

    /// Personas from the advisor, or the generic pair when it fails.
    pub async fn personas(&self, request: &PersonaRequest) -> (Vec<AudiencePersona>, PlanSource) {
        match self.advisor.suggest_personas(request).await {
            Ok(personas) => (personas, PlanSource::Ai),
            Err(e) => {
                warn!(error = %e, "Advisor unavailable, using generic personas");
                (fallback_personas(&request.industry), PlanSource::Fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AdvisorError, AdvisorResult, PlanSuggestion, SuggestedAllocation};
    use async_trait::async_trait;
    use campaign_core::CampaignError;
    use campaign_media_plan::{AllocationTables, Flight};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingAdvisor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PlanAdvisor for FailingAdvisor {
        async fn suggest_plan(&self, _: &CampaignData, _: Flight) -> AdvisorResult<PlanSuggestion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AdvisorError::Api("503 Service Unavailable".to_string()))
        }

        async fn suggest_personas(
            &self,
            _: &PersonaRequest,
        ) -> AdvisorResult<Vec<AudiencePersona>> {
            Err(AdvisorError::NoApiKey)
        }
    }

    struct FixedAdvisor(PlanSuggestion);

    #[async_trait]
    impl PlanAdvisor for FixedAdvisor {
        async fn suggest_plan(&self, _: &CampaignData, _: Flight) -> AdvisorResult<PlanSuggestion> {
            Ok(self.0.clone())
        }

        async fn suggest_personas(
            &self,
            _: &PersonaRequest,
        ) -> AdvisorResult<Vec<AudiencePersona>> {
            Ok(self.0.persona.clone().into_iter().collect())
        }
    }

    fn allocator() -> BudgetAllocator {
        BudgetAllocator::new(Arc::new(AllocationTables::builtin()))
    }

    fn campaign(platforms: &[&str]) -> CampaignData {
        serde_json::from_value(serde_json::json!({
            "websiteUrl": "https://shop.example.com",
            "industry": "E-commerce",
            "objective": "conversion",
            "platforms": platforms,
            "budget": { "amount": 1000.0, "type": "total", "duration": 30 }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_advisor_failure_falls_back_to_tables() {
        let advisor = Arc::new(FailingAdvisor { calls: AtomicUsize::new(0) });
        let generator = PlanGenerator::new(advisor.clone(), allocator());

        let out = generator.generate(&campaign(&["google", "meta"]), None).await.unwrap();

        assert_eq!(out.source, PlanSource::Fallback);
        assert_eq!(out.suggestions.len(), FALLBACK_SUGGESTIONS.len());
        assert!((out.plan.placements[0].budget - 666.666_666).abs() < 1e-3);
        assert!((out.plan.placements[1].budget - 333.333_333).abs() < 1e-3);
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_advisor_shares_are_renormalized() {
        let suggestion = PlanSuggestion {
            persona: Some(AudiencePersona {
                name: "Gift Buyer".to_string(),
                ..Default::default()
            }),
            allocations: vec![
                SuggestedAllocation { platform: "Meta".to_string(), share: 0.3 },
                SuggestedAllocation { platform: "google".to_string(), share: 0.3 },
                SuggestedAllocation { platform: "snapchat".to_string(), share: 0.4 },
            ],
            suggestions: vec!["Lean into video".to_string()],
        };
        let generator = PlanGenerator::new(Arc::new(FixedAdvisor(suggestion)), allocator());

        let out = generator
            .generate(&campaign(&["google", "meta"]), Some("IO-555555"))
            .await
            .unwrap();

        assert_eq!(out.source, PlanSource::Ai);
        assert_eq!(out.persona.name, "Gift Buyer");
        assert_eq!(out.plan.io_number, "IO-555555");
        // snapchat is not selected, so google and meta split evenly
        for p in &out.plan.placements {
            assert!((p.budget - 500.0).abs() < 1e-9);
            assert!((p.impressions - p.budget / p.cpm * 1000.0).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_empty_platforms_error_without_calling_advisor() {
        let advisor = Arc::new(FailingAdvisor { calls: AtomicUsize::new(0) });
        let generator = PlanGenerator::new(advisor.clone(), allocator());

        let err = generator.generate(&campaign(&[]), None).await.unwrap_err();
        assert!(matches!(err, CampaignError::NoPlatforms));
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_persona_failure_returns_generic_pair() {
        let generator = PlanGenerator::new(
            Arc::new(FailingAdvisor { calls: AtomicUsize::new(0) }),
            allocator(),
        );
        let (personas, source) = generator
            .personas(&PersonaRequest {
                website_url: String::new(),
                industry: "Fitness".to_string(),
                content: String::new(),
            })
            .await;
        assert_eq!(source, PlanSource::Fallback);
        assert_eq!(personas.len(), 2);
        assert!(personas[0].interests.contains(&"Fitness".to_string()));
    }
}
