//! Manual edits to a generated plan. Each edit touches one placement and
//! never rebalances the others.

use campaign_core::types::{MediaPlan, Placement, PlacementInput};
use campaign_core::{CampaignError, CampaignResult};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

fn validate(input: &PlacementInput) -> CampaignResult<()> {
    if input.platform.trim().is_empty() {
        return Err(CampaignError::Validation("platform must not be empty".to_string()));
    }
    if !input.budget.is_finite() || input.budget < 0.0 {
        return Err(CampaignError::Validation("budget must be a non-negative number".to_string()));
    }
    if !input.cpm.is_finite() || input.cpm < 0.0 {
        return Err(CampaignError::Validation("cpm must be a non-negative number".to_string()));
    }
    Ok(())
}

pub fn add_placement(plan: &mut MediaPlan, input: PlacementInput) -> CampaignResult<Placement> {
    validate(&input)?;
    let placement = Placement::new(
        input.platform.trim(),
        input.format,
        input.placement,
        input.budget,
        input.cpm,
    );
    debug!(placement_id = %placement.id, platform = %placement.platform, "Placement added");
    plan.placements.push(placement.clone());
    plan.updated_at = Utc::now();
    Ok(placement)
}

/// Replace a placement's fields and recompute its impressions.
pub fn update_placement(
    plan: &mut MediaPlan,
    placement_id: Uuid,
    input: PlacementInput,
) -> CampaignResult<Placement> {
    validate(&input)?;
    let placement = plan
        .placements
        .iter_mut()
        .find(|p| p.id == placement_id)
        .ok_or(CampaignError::PlacementNotFound(placement_id))?;

    placement.platform = input.platform.trim().to_string();
    placement.format = input.format;
    placement.placement = input.placement;
    placement.budget = input.budget;
    placement.cpm = input.cpm;
    placement.recompute_impressions();

    let updated = placement.clone();
    plan.updated_at = Utc::now();
    Ok(updated)
}

pub fn remove_placement(plan: &mut MediaPlan, placement_id: Uuid) -> CampaignResult<Placement> {
    let idx = plan
        .placements
        .iter()
        .position(|p| p.id == placement_id)
        .ok_or(CampaignError::PlacementNotFound(placement_id))?;
    plan.updated_at = Utc::now();
    Ok(plan.placements.remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::BudgetAllocator;
    use crate::tables::AllocationTables;
    use campaign_core::types::{BudgetDescriptor, BudgetType, CampaignData};
    use std::sync::Arc;

    fn generated_plan() -> MediaPlan {
        let data = CampaignData {
            website_url: String::new(),
            industry: "Technology".to_string(),
            objective: "conversion".to_string(),
            platforms: vec!["google".into(), "linkedin".into(), "meta".into()],
            audience_persona: Default::default(),
            budget: BudgetDescriptor {
                amount: 9000.0,
                budget_type: BudgetType::Total,
                duration: Some(30),
                countries: vec![],
                regions: vec![],
            },
            creative: Default::default(),
        };
        BudgetAllocator::new(Arc::new(AllocationTables::builtin()))
            .generate_plan(&data, None)
            .unwrap()
    }

    fn input(platform: &str, budget: f64, cpm: f64) -> PlacementInput {
        PlacementInput {
            platform: platform.to_string(),
            format: "Custom".to_string(),
            placement: "Manual".to_string(),
            budget,
            cpm,
        }
    }

    #[test]
    fn test_edit_recomputes_only_the_edited_row() {
        let mut plan = generated_plan();
        let before = plan.placements.clone();
        let target = before[1].id;

        let updated = update_placement(&mut plan, target, input("linkedin", 1200.0, 24.0)).unwrap();
        assert!((updated.impressions - 50_000.0).abs() < 1e-9);

        assert_eq!(plan.placements[0], before[0]);
        assert_eq!(plan.placements[2], before[2]);
        assert!((plan.placements[1].budget - 1200.0).abs() < f64::EPSILON);
        assert_eq!(plan.placements[1].id, target);
    }

    #[test]
    fn test_add_and_remove_leave_siblings_alone() {
        let mut plan = generated_plan();
        let before = plan.placements.clone();

        let added = add_placement(&mut plan, input("reddit", 300.0, 0.0)).unwrap();
        assert_eq!(added.impressions, 0.0);
        assert_eq!(plan.placements.len(), 4);
        assert_eq!(&plan.placements[..3], &before[..]);

        let removed = remove_placement(&mut plan, before[0].id).unwrap();
        assert_eq!(removed.platform, "google");
        assert_eq!(plan.placements[0], before[1]);
    }

    #[test]
    fn test_invalid_edits_are_rejected() {
        let mut plan = generated_plan();
        let id = plan.placements[0].id;
        assert!(matches!(
            update_placement(&mut plan, id, input("google", -5.0, 10.0)),
            Err(CampaignError::Validation(_))
        ));
        assert!(matches!(
            add_placement(&mut plan, input("  ", 5.0, 10.0)),
            Err(CampaignError::Validation(_))
        ));
        assert!(matches!(
            remove_placement(&mut plan, Uuid::new_v4()),
            Err(CampaignError::PlacementNotFound(_))
        ));
    }
}
