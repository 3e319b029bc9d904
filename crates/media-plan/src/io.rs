//! Insertion orders: IO numbers, status changes and the launch gate.

use campaign_core::types::{IoStatus, MediaPlan};
use campaign_core::{CampaignError, CampaignResult};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Draw a fresh `IO-NNNNNN` number with N in [100000, 999999].
pub fn generate_io_number() -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    format!("IO-{n}")
}

pub fn is_valid_io_number(io: &str) -> bool {
    io.strip_prefix("IO-")
        .map(|digits| digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Set the IO status. Any transition is allowed.
pub fn set_io_status(plan: &mut MediaPlan, status: IoStatus) {
    if plan.io_status != status {
        info!(
            io_number = %plan.io_number,
            from = plan.io_status.as_str(),
            to = status.as_str(),
            "IO status changed"
        );
    }
    plan.io_status = status;
    plan.updated_at = Utc::now();
}

/// Draft insertion orders block launch unless `bypass_draft` is set.
pub fn ensure_launchable(plan: &MediaPlan, bypass_draft: bool) -> CampaignResult<()> {
    if plan.io_status.permits_launch() {
        return Ok(());
    }
    if bypass_draft {
        warn!(io_number = %plan.io_number, "Launching draft insertion order (bypass)");
        return Ok(());
    }
    Err(CampaignError::LaunchBlocked {
        io_number: plan.io_number.clone(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchLine {
    pub platform: String,
    pub format: String,
    pub placement: String,
    pub budget: f64,
    pub daily_budget: f64,
    pub impressions: u64,
}

/// What would be handed to each ad platform for a launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchManifest {
    pub io_number: String,
    pub io_status: IoStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub lines: Vec<LaunchLine>,
    pub total_budget: f64,
    pub generated_at: DateTime<Utc>,
}

/// Check the gate and build the per-placement launch manifest.
pub fn launch(plan: &MediaPlan, bypass_draft: bool) -> CampaignResult<LaunchManifest> {
    ensure_launchable(plan, bypass_draft)?;

    let days = plan.flight_days() as f64;
    let lines = plan
        .placements
        .iter()
        .map(|p| LaunchLine {
            platform: p.platform.clone(),
            format: p.format.clone(),
            placement: p.placement.clone(),
            budget: p.budget,
            daily_budget: p.budget / days,
            impressions: p.impressions.round() as u64,
        })
        .collect();

    metrics::counter!("media_plan.launches").increment(1);
    info!(io_number = %plan.io_number, placements = plan.placements.len(), "Launch manifest built");

    Ok(LaunchManifest {
        io_number: plan.io_number.clone(),
        io_status: plan.io_status,
        start_date: plan.start_date,
        end_date: plan.end_date,
        lines,
        total_budget: plan.total_budget(),
        generated_at: Utc::now(),
    })
}
