use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ranked picks served to the dashboard. Index 0 of every list is the top pick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSet {
    #[serde(default)]
    pub top_stocks: Vec<String>,
    #[serde(default)]
    pub top_mutual_funds: Vec<String>,
    /// Keyed by `YYYY-MM`.
    #[serde(default)]
    pub monthly_stock_picks: BTreeMap<String, Vec<String>>,
    /// Keyed by `YYYY-MM`.
    #[serde(default)]
    pub monthly_mf_picks: BTreeMap<String, Vec<String>>,
}

impl RecommendationSet {
    pub fn is_empty(&self) -> bool {
        self.top_stocks.is_empty()
            && self.top_mutual_funds.is_empty()
            && self.monthly_stock_picks.is_empty()
            && self.monthly_mf_picks.is_empty()
    }

    pub fn summary(&self) -> SetSummary {
        SetSummary {
            top_stocks: self.top_stocks.len(),
            top_mutual_funds: self.top_mutual_funds.len(),
            stock_months: self.monthly_stock_picks.len(),
            mf_months: self.monthly_mf_picks.len(),
        }
    }
}

/// Counts used in log lines instead of dumping whole sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetSummary {
    pub top_stocks: usize,
    pub top_mutual_funds: usize,
    pub stock_months: usize,
    pub mf_months: usize,
}
