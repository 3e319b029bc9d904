//! Chat-completions client that asks an LLM for personas and platform splits.

use crate::error::{AdvisorError, AdvisorResult};
use crate::{PersonaRequest, PlanAdvisor, PlanSuggestion};
use async_trait::async_trait;
use campaign_core::config::LlmConfig;
use campaign_core::types::{AudiencePersona, CampaignData};
use campaign_media_plan::Flight;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const PLAN_SYSTEM_PROMPT: &str = "You are a senior media planner. \
    Reply with a single JSON object and nothing else. \
    Shape: {\"persona\": {\"name\", \"ageRange\", \"gender\": [], \"interests\": [], \
    \"behaviors\": []}, \"allocations\": [{\"platform\", \"share\"}], \
    \"suggestions\": [string]}. \
    Shares are fractions of the total budget and only use the platforms you are given.";

const PERSONA_SYSTEM_PROMPT: &str = "You are a marketing strategist. \
    Reply with a single JSON object and nothing else. \
    Shape: {\"personas\": [{\"name\", \"ageRange\", \"gender\": [], \"interests\": [], \
    \"behaviors\": []}]}. Return two or three distinct personas.";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct PersonaEnvelope {
    #[serde(default)]
    personas: Vec<AudiencePersona>,
}

/// Strip a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let start = trimmed.find('\n').map(|i| i + 1).unwrap_or(trimmed.len());
    let end = trimmed[start..]
        .rfind("```")
        .map(|i| i + start)
        .unwrap_or(trimmed.len());
    trimmed[start..end].trim()
}

/// Parse the model's reply into `T`, tolerating code fences.
pub fn parse_reply<T: DeserializeOwned>(text: &str) -> AdvisorResult<T> {
    let json = strip_code_fences(text);
    serde_json::from_str(json).map_err(|e| {
        let snippet: String = json.chars().take(300).collect();
        error!(error = %e, %snippet, "LLM reply is not valid JSON");
        AdvisorError::Parse(e.to_string())
    })
}

pub struct OpenAiAdvisor {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiAdvisor {
    pub fn new(config: &LlmConfig) -> AdvisorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        if config.api_key.is_none() {
            info!("LLM API key not set - plan generation will use deterministic fallback");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    async fn complete<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: String,
    ) -> AdvisorResult<T> {
        let api_key = self.api_key.as_ref().ok_or(AdvisorError::NoApiKey)?;

        let request = ChatRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };

        info!(model = %request.model, "Sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(%status, "LLM API returned an error");
            return Err(AdvisorError::Api(format!("API returned {status}: {body}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::Parse(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .ok_or(AdvisorError::InvalidResponse)?
            .message
            .content;

        parse_reply(&content)
    }
}

fn plan_prompt(request: &CampaignData, flight: Flight) -> String {
    let persona = &request.audience_persona;
    format!(
        "Website: {}\nIndustry: {}\nObjective: {}\nPlatforms: {}\n\
         Total budget: {:.2} over {} days\nTarget countries: {}\n\
         Current persona: {} ({}), interests: {}\n\
         Suggest a refined persona, a budget share per platform, \
         and three short optimization tips.",
        request.website_url,
        request.industry,
        request.objective,
        request.platforms.join(", "),
        flight.total_budget,
        flight.days,
        request.budget.countries.join(", "),
        persona.name,
        persona.age_range,
        persona.interests.join(", "),
    )
}

fn persona_prompt(request: &PersonaRequest) -> String {
    format!(
        "Website: {}\nIndustry: {}\nWebsite content:\n{}\n\nDescribe the target customer personas.",
        request.website_url, request.industry, request.content
    )
}

#[async_trait]
impl PlanAdvisor for OpenAiAdvisor {
    async fn suggest_plan(
        &self,
        request: &CampaignData,
        flight: Flight,
    ) -> AdvisorResult<PlanSuggestion> {
        self.complete(PLAN_SYSTEM_PROMPT, plan_prompt(request, flight))
            .await
    }

    async fn suggest_personas(
        &self,
        request: &PersonaRequest,
    ) -> AdvisorResult<Vec<AudiencePersona>> {
        let envelope: PersonaEnvelope = self
            .complete(PERSONA_SYSTEM_PROMPT, persona_prompt(request))
            .await?;
        if envelope.personas.is_empty() {
            return Err(AdvisorError::InvalidResponse);
        }
        Ok(envelope.personas)
    }
}
