//! Rule evaluator: `ExecuteRule` (bulk) and `EvaluateForAsset` (per-asset)
//! over a `RelationalStore`, plus the in-memory fast path for
//! metadata-match rules that bypasses the store entirely for the cheap
//! pattern types.

use std::sync::Arc;

use crate::asset::{Asset, AssetId};
use crate::cancel::CancellationToken;
use crate::config::ExecutionConfig;
use crate::error::CoreResult;
use crate::relational::RelationalStore;

use super::model::{read_metadata_path, MetadataMatchRule, PatternType, RuleKind};

/// `*` matches any substring; matching is case-insensitive; the pattern is
/// anchored at the start/end of the value only when it lacks a leading or
/// trailing `*` there, per §4.H.
pub fn wildcard_match(pattern: &str, value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    let pattern = pattern.to_lowercase();
    let value = value.to_lowercase();
    let leading_star = pattern.starts_with('*');
    let trailing_star = pattern.ends_with('*');
    let segments: Vec<&str> = pattern.split('*').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        // the pattern was made entirely of `*` (e.g. "*"): matches any
        // non-empty value.
        return true;
    }

    let mut pos = 0usize;
    for (i, segment) in segments.iter().enumerate() {
        match value[pos..].find(segment) {
            Some(found) => {
                let absolute = pos + found;
                if i == 0 && !leading_star && absolute != 0 {
                    return false;
                }
                pos = absolute + segment.len();
            }
            None => return false,
        }
    }
    if !trailing_star && pos != value.len() {
        return false;
    }
    true
}

/// Runs rules against a `RelationalStore` under the configured deadlines.
pub struct RuleEvaluator {
    store: Arc<dyn RelationalStore>,
    config: ExecutionConfig,
}

impl RuleEvaluator {
    pub fn new(store: Arc<dyn RelationalStore>, config: ExecutionConfig) -> Self {
        RuleEvaluator { store, config }
    }

    /// `ExecuteRule(rule) -> []AssetID`, bounded by the bulk deadline.
    pub fn execute(&self, rule: &dyn RuleKind, ctx: &CancellationToken) -> CoreResult<Vec<AssetId>> {
        rule.execute(self.store.as_ref(), ctx, self.config.bulk_timeout())
    }

    /// `EvaluateForAsset(rule, assetID) -> bool`, bounded by the cheaper
    /// per-asset deadline.
    pub fn evaluate_for_asset(&self, rule: &dyn RuleKind, ctx: &CancellationToken, asset: AssetId) -> CoreResult<bool> {
        rule.evaluate_for_asset(self.store.as_ref(), ctx, self.config.per_asset_timeout(), asset)
    }

    /// In-memory fast path for metadata-match rules: only consults the
    /// store when the pattern type is `regex` or the metadata path is
    /// simply absent from the in-memory asset (callers may fall back to
    /// `evaluate_for_asset` in that case).
    pub fn evaluate_metadata_rule_in_memory(&self, rule: &MetadataMatchRule, asset: &Asset) -> Option<bool> {
        if rule.pattern_type == PatternType::Regex {
            return None;
        }
        let value = read_metadata_path(asset, &rule.field);
        rule.evaluate_in_memory(value.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_any_non_empty_string() {
        assert!(wildcard_match("*", "anything"));
        assert!(!wildcard_match("*", ""));
    }

    #[test]
    fn wildcard_anchors_start_when_no_leading_star() {
        assert!(wildcard_match("data-*", "data-platform"));
        assert!(!wildcard_match("data-*", "team-data-platform"));
    }

    #[test]
    fn wildcard_anchors_end_when_no_trailing_star() {
        assert!(wildcard_match("*-platform", "data-platform"));
        assert!(!wildcard_match("*-platform", "data-platform-extra"));
    }

    #[test]
    fn wildcard_with_no_star_requires_exact_match() {
        assert!(wildcard_match("exact", "exact"));
        assert!(!wildcard_match("exact", "not-exact"));
    }

    #[test]
    fn wildcard_is_case_insensitive() {
        assert!(wildcard_match("Data-*", "data-PLATFORM"));
    }
}
