//! Deterministic performance forecast for a media plan, derived from the
//! per-platform CTR and CVR in the allocation tables.

use crate::tables::AllocationTables;
use campaign_core::types::MediaPlan;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementForecast {
    pub placement_id: Uuid,
    pub platform: String,
    pub budget: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub ctr: f64,
    /// `budget / clicks` (0.0 without clicks).
    pub cpc: f64,
    /// `budget / conversions` (0.0 without conversions).
    pub cpa: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanForecast {
    pub plan_id: Uuid,
    pub rows: Vec<PlacementForecast>,
    pub total_budget: f64,
    pub total_impressions: f64,
    pub total_clicks: f64,
    pub total_conversions: f64,
    pub blended_ctr: f64,
    pub blended_cpa: f64,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

pub fn forecast(plan: &MediaPlan, tables: &AllocationTables) -> PlanForecast {
    let rows: Vec<PlacementForecast> = plan
        .placements
        .iter()
        .map(|p| {
            let rates = tables.platform_defaults(&p.platform);
            let clicks = p.impressions * rates.ctr;
            let conversions = clicks * rates.cvr;
            PlacementForecast {
                placement_id: p.id,
                platform: p.platform.clone(),
                budget: p.budget,
                impressions: p.impressions,
                clicks,
                conversions,
                ctr: rates.ctr,
                cpc: ratio(p.budget, clicks),
                cpa: ratio(p.budget, conversions),
            }
        })
        .collect();

    let total_budget: f64 = rows.iter().map(|r| r.budget).sum();
    let total_impressions: f64 = rows.iter().map(|r| r.impressions).sum();
    let total_clicks: f64 = rows.iter().map(|r| r.clicks).sum();
    let total_conversions: f64 = rows.iter().map(|r| r.conversions).sum();

    PlanForecast {
        plan_id: plan.id,
        rows,
        total_budget,
        total_impressions,
        total_clicks,
        total_conversions,
        blended_ctr: ratio(total_clicks, total_impressions),
        blended_cpa: ratio(total_budget, total_conversions),
    }
}
