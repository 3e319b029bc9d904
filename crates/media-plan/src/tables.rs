//! Static allocation tables: industry → objective → platform weights, the
//! global default split, and per-platform placement defaults.
//!
//! Weight resolution for a selected platform walks, in order:
//! 1. the exact `(industry, objective, platform)` weight,
//! 2. the `(industry, objective)` table's `default` weight,
//! 3. the global default table,
//! 4. a uniform `1 / |platforms|`.
//!
//! All keys match case-insensitively after trimming.

use campaign_core::{CampaignError, CampaignResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Weights for one `(industry, objective)` pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    /// Weight for platforms not listed in `weights`.
    #[serde(default)]
    pub default: Option<f64>,
}

/// Default line item for a platform, plus the rates the forecast uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformDefaults {
    pub format: String,
    pub placement: String,
    pub cpm: f64,
    #[serde(default = "default_ctr")]
    pub ctr: f64,
    #[serde(default = "default_cvr")]
    pub cvr: f64,
}

fn default_ctr() -> f64 {
    0.005
}
fn default_cvr() -> f64 {
    0.02
}

/// Where a resolved weight came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSource {
    Exact,
    ObjectiveDefault,
    GlobalDefault,
    Uniform,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationTables {
    /// industry → objective → weights
    #[serde(default)]
    pub industries: HashMap<String, HashMap<String, ObjectiveWeights>>,
    #[serde(default)]
    pub default_weights: HashMap<String, f64>,
    #[serde(default)]
    pub platforms: HashMap<String, PlatformDefaults>,
    #[serde(default = "fallback_platform")]
    pub fallback_platform: PlatformDefaults,
}

fn fallback_platform() -> PlatformDefaults {
    PlatformDefaults {
        format: "Display".to_string(),
        placement: "Standard Placement".to_string(),
        cpm: 10.0,
        ctr: default_ctr(),
        cvr: default_cvr(),
    }
}

pub(crate) fn table_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn weights(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, w)| (k.to_string(), *w)).collect()
}

fn objective(pairs: &[(&str, f64)], default: Option<f64>) -> ObjectiveWeights {
    ObjectiveWeights {
        weights: weights(pairs),
        default,
    }
}

fn platform(format: &str, placement: &str, cpm: f64, ctr: f64, cvr: f64) -> PlatformDefaults {
    PlatformDefaults {
        format: format.to_string(),
        placement: placement.to_string(),
        cpm,
        ctr,
        cvr,
    }
}

impl AllocationTables {
    /// Tables compiled into the binary. Only E-commerce and Technology carry
    /// objective-specific splits; every other industry uses `default_weights`.
    pub fn builtin() -> Self {
        let mut industries = HashMap::new();

        let mut ecommerce = HashMap::new();
        ecommerce.insert(
            "conversion".to_string(),
            objective(
                &[
                    ("google", 0.40),
                    ("meta", 0.20),
                    ("amazon", 0.15),
                    ("tiktok", 0.10),
                    ("pinterest", 0.10),
                    ("snapchat", 0.05),
                ],
                Some(0.05),
            ),
        );
        ecommerce.insert(
            "awareness".to_string(),
            objective(
                &[
                    ("meta", 0.30),
                    ("tiktok", 0.25),
                    ("youtube", 0.20),
                    ("google", 0.10),
                    ("pinterest", 0.10),
                    ("snapchat", 0.05),
                ],
                None,
            ),
        );
        ecommerce.insert(
            "engagement".to_string(),
            objective(
                &[
                    ("meta", 0.35),
                    ("tiktok", 0.25),
                    ("pinterest", 0.15),
                    ("google", 0.10),
                    ("youtube", 0.10),
                    ("snapchat", 0.05),
                ],
                None,
            ),
        );
        industries.insert("e-commerce".to_string(), ecommerce);

        let mut technology = HashMap::new();
        technology.insert(
            "conversion".to_string(),
            objective(
                &[
                    ("google", 0.40),
                    ("linkedin", 0.30),
                    ("meta", 0.15),
                    ("twitter", 0.10),
                    ("microsoft", 0.05),
                ],
                None,
            ),
        );
        technology.insert(
            "awareness".to_string(),
            objective(
                &[
                    ("linkedin", 0.30),
                    ("youtube", 0.25),
                    ("google", 0.20),
                    ("twitter", 0.15),
                    ("meta", 0.10),
                ],
                Some(0.05),
            ),
        );
        technology.insert(
            "engagement".to_string(),
            objective(
                &[
                    ("linkedin", 0.35),
                    ("twitter", 0.25),
                    ("meta", 0.15),
                    ("youtube", 0.15),
                    ("google", 0.10),
                ],
                None,
            ),
        );
        industries.insert("technology".to_string(), technology);

        let default_weights = weights(&[
            ("google", 0.30),
            ("meta", 0.25),
            ("tiktok", 0.10),
            ("linkedin", 0.10),
            ("youtube", 0.10),
            ("twitter", 0.05),
            ("pinterest", 0.04),
            ("snapchat", 0.03),
            ("amazon", 0.02),
            ("microsoft", 0.01),
        ]);

        let platforms = [
            (
                "google",
                platform("Responsive Search Ad", "Google Search Network", 10.0, 0.035, 0.04),
            ),
            ("meta", platform("Feed Image Ad", "Facebook & Instagram Feeds", 8.5, 0.009, 0.025)),
            ("tiktok", platform("In-Feed Video", "TikTok For You Feed", 6.0, 0.010, 0.015)),
            ("linkedin", platform("Sponsored Content", "LinkedIn Feed", 30.0, 0.006, 0.02)),
            ("twitter", platform("Promoted Post", "X Timeline", 6.5, 0.008, 0.012)),
            ("youtube", platform("Skippable In-Stream", "YouTube Videos", 9.0, 0.005, 0.01)),
            ("pinterest", platform("Standard Pin", "Pinterest Home Feed", 5.0, 0.004, 0.02)),
            ("snapchat", platform("Single Image/Video", "Snapchat Stories", 4.0, 0.006, 0.01)),
            ("amazon", platform("Sponsored Products", "Amazon Search Results", 7.0, 0.004, 0.08)),
            ("microsoft", platform("Expanded Text Ad", "Bing Search Network", 9.5, 0.030, 0.035)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            industries,
            default_weights,
            platforms,
            fallback_platform: fallback_platform(),
        }
    }

    /// Load tables from a TOML/JSON/YAML file (format from the extension).
    pub fn from_file(path: &str) -> CampaignResult<Self> {
        let source = config::File::with_name(path);
        let tables = Self::from_source(source)?;
        info!(
            path,
            industries = tables.industries.len(),
            platforms = tables.platforms.len(),
            "Allocation tables loaded"
        );
        Ok(tables)
    }

    /// Parse tables from an in-memory document.
    pub fn parse(contents: &str, format: config::FileFormat) -> CampaignResult<Self> {
        Self::from_source(config::File::from_str(contents, format))
    }

    fn from_source<S>(source: S) -> CampaignResult<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let tables: Self = config::Config::builder()
            .add_source(source)
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| CampaignError::Config(e.to_string()))?;
        Ok(tables.normalized())
    }

    /// Lower-case and trim every key so lookups are case-insensitive.
    pub fn normalized(self) -> Self {
        let norm = |m: HashMap<String, f64>| -> HashMap<String, f64> {
            m.into_iter().map(|(k, v)| (table_key(&k), v)).collect()
        };

        let industries = self
            .industries
            .into_iter()
            .map(|(industry, objectives)| {
                let objectives = objectives
                    .into_iter()
                    .map(|(obj, w)| {
                        (
                            table_key(&obj),
                            ObjectiveWeights {
                                weights: norm(w.weights),
                                default: w.default,
                            },
                        )
                    })
                    .collect();
                (table_key(&industry), objectives)
            })
            .collect();

        Self {
            industries,
            default_weights: norm(self.default_weights),
            platforms: self
                .platforms
                .into_iter()
                .map(|(k, v)| (table_key(&k), v))
                .collect(),
            fallback_platform: self.fallback_platform,
        }
    }

    pub fn objective_weights(&self, industry: &str, objective: &str) -> Option<&ObjectiveWeights> {
        self.industries
            .get(&table_key(industry))?
            .get(&table_key(objective))
    }

    /// Resolve the raw weight for `platform` when `selected` platforms are
    /// in play. Negative and non-finite weights are treated as zero.
    pub fn resolve_weight(
        &self,
        industry: &str,
        objective: &str,
        platform: &str,
        selected: usize,
    ) -> (f64, WeightSource) {
        let key = table_key(platform);
        let table = self.objective_weights(industry, objective);

        let (weight, source) = if let Some(w) = table.and_then(|t| t.weights.get(&key)) {
            (*w, WeightSource::Exact)
        } else if let Some(w) = table.and_then(|t| t.default) {
            (w, WeightSource::ObjectiveDefault)
        } else if let Some(w) = self.default_weights.get(&key) {
            (*w, WeightSource::GlobalDefault)
        } else {
            (1.0 / selected.max(1) as f64, WeightSource::Uniform)
        };

        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        (weight, source)
    }

    /// Placement defaults for a platform, or the fallback triple.
    pub fn platform_defaults(&self, platform: &str) -> &PlatformDefaults {
        self.platforms
            .get(&table_key(platform))
            .unwrap_or(&self.fallback_platform)
    }
}

impl Default for AllocationTables {
    fn default() -> Self {
        Self::builtin()
    }
}
