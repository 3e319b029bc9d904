//! Budget allocator: splits a campaign budget across the selected ad
//! platforms and turns each share into a CPM-priced placement.

use crate::io::generate_io_number;
use crate::tables::{table_key, AllocationTables, WeightSource};
use campaign_core::types::{CampaignData, MediaPlan, Placement};
use campaign_core::{CampaignError, CampaignResult};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// One platform's slice of the budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformAllocation {
    pub platform: String,
    /// Raw weight before normalization.
    pub weight: f64,
    /// `weight / Σ weights` over the selected platforms.
    pub share: f64,
    pub amount: f64,
    pub source: WeightSource,
}

/// Drop blank and repeated platform ids, keeping first-seen order.
pub fn dedupe_platforms(platforms: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    platforms
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .filter(|p| seen.insert(table_key(p)))
        .map(str::to_string)
        .collect()
}

/// Normalize weights so they sum to one. All-zero input yields a uniform split.
pub fn normalize(weights: &[f64]) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        weights.iter().map(|w| w / total).collect()
    } else {
        vec![1.0 / weights.len() as f64; weights.len()]
    }
}

/// Longest flight a campaign may request.
pub const MAX_FLIGHT_DAYS: u32 = 3650;

const DEFAULT_FLIGHT_DAYS: u32 = 30;

/// Validated budget and flight length for one campaign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flight {
    pub total_budget: f64,
    pub days: u32,
}

#[derive(Debug, Clone)]
pub struct BudgetAllocator {
    tables: Arc<AllocationTables>,
    default_flight_days: u32,
}

impl BudgetAllocator {
    pub fn new(tables: Arc<AllocationTables>) -> Self {
        Self {
            tables,
            default_flight_days: DEFAULT_FLIGHT_DAYS,
        }
    }

    /// Flight length for campaigns that do not carry a duration.
    pub fn with_default_flight_days(mut self, days: u32) -> Self {
        self.default_flight_days = days;
        self
    }

    pub fn tables(&self) -> &AllocationTables {
        &self.tables
    }

    pub fn default_flight_days(&self) -> u32 {
        self.default_flight_days
    }

    /// Guard a campaign's inputs and resolve its flight.
    pub fn validate(&self, data: &CampaignData) -> CampaignResult<Flight> {
        validate_campaign(data, self.default_flight_days)
    }

    /// Split `total_budget` over `platforms` using the weight tables.
    /// An empty platform list allocates nothing.
    pub fn allocate(
        &self,
        platforms: &[String],
        industry: &str,
        objective: &str,
        total_budget: f64,
    ) -> Vec<PlatformAllocation> {
        let platforms = dedupe_platforms(platforms);
        let n = platforms.len();
        let resolved: Vec<(f64, WeightSource)> = platforms
            .iter()
            .map(|p| self.tables.resolve_weight(industry, objective, p, n))
            .collect();

        self.split(platforms, resolved, total_budget)
    }

    /// Split `total_budget` using externally suggested weights (e.g. from the
    /// advisor). Platforms without a suggestion resolve through the tables.
    pub fn allocate_with_weights(
        &self,
        platforms: &[String],
        suggested: &dyn Fn(&str) -> Option<f64>,
        industry: &str,
        objective: &str,
        total_budget: f64,
    ) -> Vec<PlatformAllocation> {
        let platforms = dedupe_platforms(platforms);
        let n = platforms.len();
        let resolved = platforms
            .iter()
            .map(|p| match suggested(p) {
                Some(w) if w.is_finite() && w >= 0.0 => (w, WeightSource::Exact),
                _ => self.tables.resolve_weight(industry, objective, p, n),
            })
            .collect();

        self.split(platforms, resolved, total_budget)
    }

    fn split(
        &self,
        platforms: Vec<String>,
        resolved: Vec<(f64, WeightSource)>,
        total_budget: f64,
    ) -> Vec<PlatformAllocation> {
        let raw: Vec<f64> = resolved.iter().map(|(w, _)| *w).collect();
        let shares = normalize(&raw);

        platforms
            .into_iter()
            .zip(resolved)
            .zip(shares)
            .map(|((platform, (weight, source)), share)| PlatformAllocation {
                platform,
                weight,
                share,
                amount: share * total_budget,
                source,
            })
            .collect()
    }

    /// Turn allocations into priced placements using the platform defaults.
    pub fn build_placements(&self, allocations: &[PlatformAllocation]) -> Vec<Placement> {
        allocations
            .iter()
            .map(|a| {
                let defaults = self.tables.platform_defaults(&a.platform);
                Placement::new(
                    a.platform.clone(),
                    defaults.format.clone(),
                    defaults.placement.clone(),
                    a.amount,
                    defaults.cpm,
                )
            })
            .collect()
    }

    /// Generate a fresh media plan starting today.
    pub fn generate_plan(
        &self,
        data: &CampaignData,
        existing_io: Option<&str>,
    ) -> CampaignResult<MediaPlan> {
        self.generate_plan_on(data, existing_io, Utc::now().date_naive())
    }

    /// Generate a media plan whose flight starts on `today`. An existing IO
    /// number is carried over; otherwise a new one is drawn.
    pub fn generate_plan_on(
        &self,
        data: &CampaignData,
        existing_io: Option<&str>,
        today: NaiveDate,
    ) -> CampaignResult<MediaPlan> {
        let flight = self.validate(data)?;
        let allocations = self.allocate(
            &data.platforms,
            &data.industry,
            &data.objective,
            flight.total_budget,
        );
        debug!(
            industry = %data.industry,
            objective = %data.objective,
            platforms = allocations.len(),
            total_budget = flight.total_budget,
            days = flight.days,
            "Budget allocated"
        );
        self.assemble(&allocations, flight.days, existing_io, today)
    }

    /// Wrap allocations into a draft plan.
    pub fn assemble(
        &self,
        allocations: &[PlatformAllocation],
        duration_days: u32,
        existing_io: Option<&str>,
        today: NaiveDate,
    ) -> CampaignResult<MediaPlan> {
        let end_date = today
            .checked_add_signed(Duration::days(i64::from(duration_days)))
            .ok_or_else(|| {
                CampaignError::Validation(format!(
                    "flight of {duration_days} days from {today} is out of range"
                ))
            })?;
        let now = Utc::now();
        let io_number = existing_io
            .filter(|io| !io.is_empty())
            .map(str::to_string)
            .unwrap_or_else(generate_io_number);

        metrics::counter!("media_plan.generated").increment(1);

        Ok(MediaPlan {
            id: Uuid::new_v4(),
            placements: self.build_placements(allocations),
            start_date: today,
            end_date,
            io_number,
            io_status: Default::default(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Guard the allocator's inputs: at least one platform, a flight of at most
/// [`MAX_FLIGHT_DAYS`] and a finite, non-negative total budget.
pub fn validate_campaign(data: &CampaignData, default_days: u32) -> CampaignResult<Flight> {
    if dedupe_platforms(&data.platforms).is_empty() {
        return Err(CampaignError::NoPlatforms);
    }
    let days = data.budget.duration_or(default_days);
    if days > MAX_FLIGHT_DAYS {
        return Err(CampaignError::Validation(format!(
            "duration must be at most {MAX_FLIGHT_DAYS} days, got {days}"
        )));
    }
    let total_budget = data.budget.total_budget(days);
    if !total_budget.is_finite() || total_budget < 0.0 {
        return Err(CampaignError::Validation(
            "budget must be a non-negative number".to_string(),
        ));
    }
    Ok(Flight { total_budget, days })
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::types::{BudgetDescriptor, BudgetType, IoStatus};

    fn allocator() -> BudgetAllocator {
        BudgetAllocator::new(Arc::new(AllocationTables::builtin()))
    }

    fn platforms(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn campaign(
        ids: &[&str],
        amount: f64,
        budget_type: BudgetType,
        duration: Option<u32>,
    ) -> CampaignData {
        CampaignData {
            website_url: "https://shop.example.com".to_string(),
            industry: "E-commerce".to_string(),
            objective: "conversion".to_string(),
            platforms: platforms(ids),
            audience_persona: Default::default(),
            budget: BudgetDescriptor {
                amount,
                budget_type,
                duration,
                countries: vec!["US".to_string()],
                regions: vec![],
            },
            creative: Default::default(),
        }
    }

    fn total_amount(allocs: &[PlatformAllocation]) -> f64 {
        allocs.iter().map(|a| a.amount).sum()
    }

    #[test]
    fn test_ecommerce_conversion_google_meta_split() {
        let allocs = allocator().allocate(
            &platforms(&["google", "meta"]),
            "E-commerce",
            "conversion",
            1000.0,
        );

        assert_eq!(allocs.len(), 2);
        assert!((allocs[0].weight - 0.40).abs() < 1e-12);
        assert!((allocs[1].weight - 0.20).abs() < 1e-12);
        assert!((allocs[0].share - 2.0 / 3.0).abs() < 1e-9);
        assert!((allocs[1].share - 1.0 / 3.0).abs() < 1e-9);
        assert!((allocs[0].amount - 666.666_666).abs() < 1e-3);
        assert!((allocs[1].amount - 333.333_333).abs() < 1e-3);
    }

    #[test]
    fn test_shares_sum_to_one_for_any_subset() {
        let alloc = allocator();
        let subsets: &[&[&str]] = &[
            &["google"],
            &["meta", "tiktok", "reddit"],
            &["linkedin", "twitter", "youtube", "amazon", "pinterest"],
        ];
        let pairs = [
            ("Technology", "awareness"),
            ("Retail", "leads"),
            ("E-commerce", "engagement"),
        ];
        for subset in subsets {
            for (industry, objective) in pairs {
                let allocs = alloc.allocate(&platforms(subset), industry, objective, 5000.0);
                let total: f64 = allocs.iter().map(|a| a.share).sum();
                assert!((total - 1.0).abs() < 1e-9, "{subset:?} {industry}/{objective}");
            }
        }
    }

    #[test]
    fn test_unknown_pair_falls_back_without_error() {
        let allocs =
            allocator().allocate(&platforms(&["google", "meta"]), "Aerospace", "retention", 100.0);
        assert!(allocs.iter().all(|a| a.source == WeightSource::GlobalDefault));
        assert!((total_amount(&allocs) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_objective_table_without_default_uses_global_weight() {
        // E-commerce/awareness lists no linkedin weight and carries no default
        let allocs = allocator().allocate(
            &platforms(&["meta", "linkedin"]),
            "E-commerce",
            "awareness",
            800.0,
        );

        assert_eq!(allocs[0].source, WeightSource::Exact);
        assert!((allocs[0].weight - 0.30).abs() < 1e-12);
        assert_eq!(allocs[1].source, WeightSource::GlobalDefault);
        assert!((allocs[1].weight - 0.10).abs() < 1e-12);
        assert!((allocs[0].amount - 600.0).abs() < 1e-9);
        assert!((allocs[1].amount - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_weight_sources_still_sum_to_budget() {
        let alloc = allocator();

        let allocs = alloc.allocate(
            &platforms(&["meta", "linkedin", "reddit"]),
            "E-commerce",
            "awareness",
            1234.56,
        );
        let sources: Vec<WeightSource> = allocs.iter().map(|a| a.source).collect();
        assert_eq!(
            sources,
            vec![
                WeightSource::Exact,
                WeightSource::GlobalDefault,
                WeightSource::Uniform
            ]
        );
        let shares: f64 = allocs.iter().map(|a| a.share).sum();
        assert!((shares - 1.0).abs() < 1e-9);
        assert!((total_amount(&allocs) - 1234.56).abs() <= 1234.56 * 1e-9);

        let allocs = alloc.allocate(
            &platforms(&["linkedin", "amazon", "reddit"]),
            "Technology",
            "awareness",
            500.0,
        );
        assert_eq!(allocs[0].source, WeightSource::Exact);
        assert_eq!(allocs[1].source, WeightSource::ObjectiveDefault);
        assert_eq!(allocs[2].source, WeightSource::ObjectiveDefault);
        assert!((total_amount(&allocs) - 500.0).abs() <= 500.0 * 1e-9);
    }

    #[test]
    fn test_tables_loaded_from_file_drive_allocation() {
        let path = std::env::temp_dir().join(format!("allocation-tables-{}.json", Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{
                "default_weights": { "google": 1.0 },
                "industries": {
                    "Fitness": {
                        "Leads": { "weights": { "Meta": 3.0 }, "default": 1.0 }
                    }
                },
                "platforms": {
                    "meta": { "format": "Lead Form", "placement": "Facebook Feed", "cpm": 12.5 }
                }
            }"#,
        )
        .unwrap();

        let tables = AllocationTables::from_file(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        let alloc = BudgetAllocator::new(Arc::new(tables));
        let allocs = alloc.allocate(&platforms(&["meta", "tiktok"]), "fitness", "leads", 400.0);
        assert_eq!(allocs[0].source, WeightSource::Exact);
        assert_eq!(allocs[1].source, WeightSource::ObjectiveDefault);
        assert!((allocs[0].amount - 300.0).abs() < 1e-9);
        assert!((allocs[1].amount - 100.0).abs() < 1e-9);

        let placements = alloc.build_placements(&allocs);
        assert_eq!(placements[0].format, "Lead Form");
        assert!((placements[0].impressions - 24_000.0).abs() < 1e-6);
        assert_eq!(placements[1].format, "Display");
    }

    #[test]
    fn test_missing_tables_file_is_a_config_error() {
        let path = std::env::temp_dir().join(format!("missing-{}.json", Uuid::new_v4()));
        let result = AllocationTables::from_file(path.to_str().unwrap());
        assert!(matches!(result, Err(CampaignError::Config(_))));
    }

    #[test]
    fn test_empty_platforms_allocates_nothing() {
        assert!(allocator()
            .allocate(&[], "E-commerce", "conversion", 1000.0)
            .is_empty());
    }

    #[test]
    fn test_duplicate_platforms_collapse() {
        let allocs = allocator().allocate(
            &platforms(&["google", "Google ", "", "meta"]),
            "E-commerce",
            "conversion",
            900.0,
        );
        assert_eq!(allocs.len(), 2);
        assert_eq!(allocs[0].platform, "google");
    }

    #[test]
    fn test_all_zero_weights_split_uniformly() {
        let shares = normalize(&[0.0, 0.0, 0.0, 0.0]);
        assert!(shares.iter().all(|s| (s - 0.25).abs() < 1e-12));
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_suggested_weights_override_tables() {
        let alloc = allocator();
        let suggested = |p: &str| if p == "meta" { Some(3.0) } else { None };
        let allocs = alloc.allocate_with_weights(
            &platforms(&["meta", "google"]),
            &suggested,
            "E-commerce",
            "conversion",
            1000.0,
        );
        // meta 3.0 vs google 0.40 from the tables
        assert!((allocs[0].share - 3.0 / 3.4).abs() < 1e-9);
        assert_eq!(allocs[1].source, WeightSource::Exact);
        assert!((total_amount(&allocs) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_budget_and_impression_invariants() {
        let data = campaign(
            &["google", "meta", "tiktok", "reddit"],
            250.0,
            BudgetType::Daily,
            Some(12),
        );
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let plan = allocator().generate_plan_on(&data, None, today).unwrap();

        assert_eq!(plan.placements.len(), 4);
        let total = plan.total_budget();
        assert!((total - 3000.0).abs() <= 3000.0 * 1e-9);

        for p in &plan.placements {
            assert!(p.budget >= 0.0);
            assert!(p.impressions >= 0.0);
            assert!((p.impressions - p.budget / p.cpm * 1000.0).abs() < 1e-6);
        }

        let reddit = &plan.placements[3];
        assert_eq!(reddit.format, "Display");
        assert!((reddit.cpm - 10.0).abs() < f64::EPSILON);

        assert_eq!(plan.start_date, today);
        assert_eq!(plan.end_date, NaiveDate::from_ymd_opt(2026, 3, 13).unwrap());
        assert_eq!(plan.io_status, IoStatus::Draft);
        assert!(plan.io_number.starts_with("IO-"));
    }

    #[test]
    fn test_missing_duration_uses_configured_default() {
        let alloc = allocator().with_default_flight_days(14);
        let data = campaign(&["google"], 10.0, BudgetType::Daily, None);
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let plan = alloc.generate_plan_on(&data, None, today).unwrap();

        assert!((plan.total_budget() - 140.0).abs() < 1e-9);
        assert_eq!(plan.end_date, NaiveDate::from_ymd_opt(2026, 5, 15).unwrap());
    }

    #[test]
    fn test_existing_io_number_is_kept() {
        let data = campaign(&["google"], 500.0, BudgetType::Total, Some(30));
        let plan = allocator().generate_plan(&data, Some("IO-123456")).unwrap();
        assert_eq!(plan.io_number, "IO-123456");
    }

    #[test]
    fn test_zero_budget_yields_zero_placements_budget() {
        let data = campaign(&["google", "meta"], 0.0, BudgetType::Total, Some(7));
        let plan = allocator().generate_plan(&data, None).unwrap();
        assert!(plan
            .placements
            .iter()
            .all(|p| p.budget == 0.0 && p.impressions == 0.0));
    }

    #[test]
    fn test_guards_reject_bad_input() {
        let alloc = allocator();
        let empty = campaign(&[], 500.0, BudgetType::Total, Some(30));
        assert!(matches!(
            alloc.generate_plan(&empty, None),
            Err(CampaignError::NoPlatforms)
        ));

        let negative = campaign(&["google"], -1.0, BudgetType::Total, Some(30));
        assert!(matches!(
            alloc.generate_plan(&negative, None),
            Err(CampaignError::Validation(_))
        ));

        let nan = campaign(&["google"], f64::NAN, BudgetType::Total, Some(30));
        assert!(matches!(
            alloc.generate_plan(&nan, None),
            Err(CampaignError::Validation(_))
        ));
    }

    #[test]
    fn test_oversized_duration_is_rejected_not_panicking() {
        let alloc = allocator();
        for budget_type in [BudgetType::Total, BudgetType::Daily] {
            let huge = campaign(&["google"], 100.0, budget_type, Some(u32::MAX));
            assert!(matches!(
                alloc.generate_plan(&huge, None),
                Err(CampaignError::Validation(_))
            ));
        }

        let longest = campaign(&["google"], 100.0, BudgetType::Total, Some(MAX_FLIGHT_DAYS));
        assert!(alloc.generate_plan(&longest, None).is_ok());
    }

    #[test]
    fn test_assemble_rejects_flight_past_calendar_range() {
        let alloc = allocator();
        let allocs = alloc.allocate(&platforms(&["google"]), "E-commerce", "conversion", 10.0);
        let result = alloc.assemble(&allocs, 1, None, NaiveDate::MAX);
        assert!(matches!(result, Err(CampaignError::Validation(_))));
    }
}
