//! Media plan exports: the CSV table and the plain-text insertion order.

use campaign_core::types::{blended_cpm, MediaPlan, Placement};
use campaign_core::{CampaignError, CampaignResult};
use std::fmt::Write as _;

/// Expected CSV headers in exact order.
pub const CSV_HEADERS: &[&str] = &[
    "Platform",
    "Format",
    "Placement",
    "Budget",
    "CPM",
    "Estimated Impressions",
];

fn money(v: f64) -> String {
    format!("{v:.2}")
}

fn count(v: f64) -> String {
    format!("{}", v.round() as u64)
}

/// Serialize placements plus a `TOTAL` row whose CPM is recomputed from the
/// summed budget and impressions.
pub fn export_csv(placements: &[Placement]) -> CampaignResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let to_err = |e: csv::Error| CampaignError::Export(e.to_string());

    writer.write_record(CSV_HEADERS).map_err(to_err)?;

    let mut total_budget = 0.0;
    let mut total_impressions = 0.0;
    for p in placements {
        total_budget += p.budget;
        total_impressions += p.impressions;
        let (budget, cpm, impressions) = (money(p.budget), money(p.cpm), count(p.impressions));
        writer
            .write_record([
                p.platform.as_str(),
                p.format.as_str(),
                p.placement.as_str(),
                budget.as_str(),
                cpm.as_str(),
                impressions.as_str(),
            ])
            .map_err(to_err)?;
    }

    let (budget, cpm, impressions) = (
        money(total_budget),
        money(blended_cpm(total_budget, total_impressions)),
        count(total_impressions),
    );
    writer
        .write_record([
            "TOTAL",
            "",
            "",
            budget.as_str(),
            cpm.as_str(),
            impressions.as_str(),
        ])
        .map_err(to_err)?;

    let bytes = writer
        .into_inner()
        .map_err(|e| CampaignError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CampaignError::Export(e.to_string()))
}

/// Render the insertion order as a printable document.
pub fn io_document(plan: &MediaPlan, advertiser: &str) -> String {
    let mut doc = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(doc, "INSERTION ORDER {}", plan.io_number);
    let _ = writeln!(doc, "Status: {}", plan.io_status.as_str().to_uppercase());
    if !advertiser.is_empty() {
        let _ = writeln!(doc, "Advertiser: {advertiser}");
    }
    let _ = writeln!(
        doc,
        "Flight: {} to {} ({} days)",
        plan.start_date,
        plan.end_date,
        plan.flight_days()
    );
    let _ = writeln!(doc);
    let _ = writeln!(
        doc,
        "{:<4} {:<12} {:<24} {:<30} {:>12} {:>8} {:>14}",
        "#", "Platform", "Format", "Placement", "Budget", "CPM", "Impressions"
    );
    for (i, p) in plan.placements.iter().enumerate() {
        let _ = writeln!(
            doc,
            "{:<4} {:<12} {:<24} {:<30} {:>12} {:>8} {:>14}",
            i + 1,
            p.platform,
            p.format,
            p.placement,
            money(p.budget),
            money(p.cpm),
            count(p.impressions)
        );
    }
    let _ = writeln!(doc);
    let _ = writeln!(doc, "Total budget:      {}", money(plan.total_budget()));
    let _ = writeln!(doc, "Total impressions: {}", count(plan.total_impressions()));
    let _ = writeln!(doc, "Blended CPM:       {}", money(plan.blended_cpm()));
    let _ = writeln!(doc);
    let _ = writeln!(doc, "Advertiser signature: ______________________  Date: __________");
    doc
}
