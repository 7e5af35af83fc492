use crate::domain::recommendation::RecommendationSet;
use std::collections::{BTreeMap, BTreeSet};

/// Why a set coming from outside the process (analysis output, reviewer, API caller) was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ContractViolation(pub String);

impl RecommendationSet {
    /// Trims every entry and checks ranking and month-key rules.
    pub fn validate(self) -> Result<RecommendationSet, ContractViolation> {
        Ok(RecommendationSet {
            top_stocks: validate_ranked("top_stocks", self.top_stocks)?,
            top_mutual_funds: validate_ranked("top_mutual_funds", self.top_mutual_funds)?,
            monthly_stock_picks: validate_monthly("monthly_stock_picks", self.monthly_stock_picks)?,
            monthly_mf_picks: validate_monthly("monthly_mf_picks", self.monthly_mf_picks)?,
        })
    }
}

fn validate_ranked(field: &str, items: Vec<String>) -> Result<Vec<String>, ContractViolation> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(items.len());
    for (rank, item) in items.into_iter().enumerate() {
        let item = item.trim().to_string();
        if item.is_empty() {
            return Err(ContractViolation(format!("{field}[{rank}] must be non-empty")));
        }
        if !seen.insert(item.clone()) {
            return Err(ContractViolation(format!("{field} lists {item} more than once")));
        }
        out.push(item);
    }
    Ok(out)
}

fn validate_monthly(
    field: &str,
    picks: BTreeMap<String, Vec<String>>,
) -> Result<BTreeMap<String, Vec<String>>, ContractViolation> {
    let mut out = BTreeMap::new();
    for (key, items) in picks {
        let month = key.trim().to_string();
        if !is_month_key(&month) {
            return Err(ContractViolation(format!(
                "{field} has invalid month key {key:?} (expected YYYY-MM)"
            )));
        }
        let items = validate_ranked(&format!("{field}.{month}"), items)?;
        if out.insert(month.clone(), items).is_some() {
            return Err(ContractViolation(format!(
                "{field} has duplicate month key {month}"
            )));
        }
    }
    Ok(out)
}

pub fn is_month_key(s: &str) -> bool {
    let Some((year, month)) = s.split_once('-') else {
        return false;
    };
    year.len() == 4
        && month.len() == 2
        && year.bytes().all(|b| b.is_ascii_digit())
        && month.bytes().all(|b| b.is_ascii_digit())
        && matches!(month.parse::<u32>(), Ok(1..=12))
}

/// Parses and validates a JSON document in the persisted set shape.
pub fn parse_set(text: &str) -> Result<RecommendationSet, ContractViolation> {
    let parsed = serde_json::from_str::<RecommendationSet>(text)
        .map_err(|e| ContractViolation(format!("not a valid recommendation set: {e}")))?;
    parsed.validate()
}
