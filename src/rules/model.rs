//! `EnrichmentRule` and the polymorphic `RuleKind` dispatch (Design Notes
//! §9): each rule variant exposes `validate`, `execute`,
//! `evaluate_for_asset`, and `targets`, so adding a third rule kind stays
//! closed under the existing evaluator rather than requiring a new
//! `match` arm scattered across the codebase.

use std::time::Duration;

use regex::Regex;
use uuid::Uuid;

use crate::asset::{Asset, AssetId};
use crate::cancel::CancellationToken;
use crate::error::{CoreError, CoreResult};
use crate::query::{self, metadata_accessor, SqlParam};
use crate::relational::RelationalStore;

use super::target::{targets_for_metadata_match, targets_for_query, RuleTarget};

/// How a metadata-match rule's pattern is compared against a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternType {
    Exact,
    Prefix,
    Wildcard,
    Regex,
}

/// Rule family, per §3's `EnrichmentRule` data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    Query,
    MetadataMatch,
}

/// The persisted rule record. Optional fields are required in combination
/// depending on `rule_type`; `validate`/`to_kind` enforce that.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentRule {
    pub id: Uuid,
    pub rule_type: RuleType,
    pub is_enabled: bool,
    pub query_expression: Option<String>,
    pub metadata_field: Option<String>,
    pub pattern_type: Option<PatternType>,
    pub pattern_value: Option<String>,
}

impl EnrichmentRule {
    /// Validate field combinations and build the dispatchable capability
    /// set. Returns `CoreError::InvalidRule` for an invalid regex or a
    /// missing required field; never persisted when this fails.
    pub fn to_kind(&self) -> CoreResult<Box<dyn RuleKind>> {
        match self.rule_type {
            RuleType::Query => {
                let expression = self
                    .query_expression
                    .clone()
                    .ok_or_else(|| CoreError::InvalidRule("query rule missing queryExpression".to_string()))?;
                let ast = query::parse(&expression)
                    .map_err(|e| CoreError::InvalidRule(format!("unparseable query expression: {e}")))?;
                Ok(Box::new(QueryRule { expression, ast }))
            }
            RuleType::MetadataMatch => {
                let field = self
                    .metadata_field
                    .clone()
                    .ok_or_else(|| CoreError::InvalidRule("metadata_match rule missing field".to_string()))?;
                let pattern_type = self
                    .pattern_type
                    .ok_or_else(|| CoreError::InvalidRule("metadata_match rule missing patternType".to_string()))?;
                let pattern_value = self
                    .pattern_value
                    .clone()
                    .ok_or_else(|| CoreError::InvalidRule("metadata_match rule missing patternValue".to_string()))?;
                if pattern_type == PatternType::Regex {
                    Regex::new(&pattern_value)
                        .map_err(|e| CoreError::InvalidRule(format!("invalid regex `{pattern_value}`: {e}")))?;
                }
                Ok(Box::new(MetadataMatchRule { field, pattern_type, pattern_value }))
            }
        }
    }
}

/// The capability set every rule variant implements. `ctx` carries request
/// cancellation; `timeout` is the caller's deadline for this call (5s bulk,
/// 2s per-asset, per §5).
pub trait RuleKind: Send + Sync {
    fn validate(&self) -> CoreResult<()>;

    fn execute(
        &self,
        store: &dyn RelationalStore,
        ctx: &CancellationToken,
        timeout: Duration,
    ) -> CoreResult<Vec<AssetId>>;

    fn evaluate_for_asset(
        &self,
        store: &dyn RelationalStore,
        ctx: &CancellationToken,
        timeout: Duration,
        asset: AssetId,
    ) -> CoreResult<bool>;

    fn targets(&self) -> Vec<RuleTarget>;
}

/// A `query`-family rule: a parsed boolean expression compiled to SQL.
pub struct QueryRule {
    pub expression: String,
    pub ast: query::Node,
}

impl RuleKind for QueryRule {
    fn validate(&self) -> CoreResult<()> {
        query::parse(&self.expression).map(|_| ())
    }

    fn execute(
        &self,
        store: &dyn RelationalStore,
        ctx: &CancellationToken,
        timeout: Duration,
    ) -> CoreResult<Vec<AssetId>> {
        let compiled = query::build(&self.ast)?;
        crate::cancel::with_deadline(ctx, timeout, || {
            store.query_assets(&compiled.sql, &compiled.params, timeout)
        })
    }

    fn evaluate_for_asset(
        &self,
        store: &dyn RelationalStore,
        ctx: &CancellationToken,
        timeout: Duration,
        asset: AssetId,
    ) -> CoreResult<bool> {
        let compiled = query::build(&self.ast)?;
        let id_placeholder = compiled.params.len() + 1;
        let exists_sql =
            format!("EXISTS (SELECT 1 FROM assets WHERE {} AND id = ${id_placeholder})", compiled.sql);
        let mut params = compiled.params;
        params.push(SqlParam::Str(asset.to_string()));
        crate::cancel::with_deadline(ctx, timeout, || store.asset_matches(&exists_sql, &params, asset, timeout))
    }

    fn targets(&self) -> Vec<RuleTarget> {
        targets_for_query(&self.expression, &self.ast)
    }
}

/// A `metadata_match`-family rule: a dotted metadata path compared against
/// a pattern.
pub struct MetadataMatchRule {
    pub field: String,
    pub pattern_type: PatternType,
    pub pattern_value: String,
}

impl MetadataMatchRule {
    fn pattern_sql(&self) -> (String, SqlParam) {
        let column = metadata_accessor(&self.field);
        match self.pattern_type {
            PatternType::Exact => (format!("{column} = $1"), SqlParam::Str(self.pattern_value.clone())),
            PatternType::Prefix => {
                (format!("{column} ILIKE $1"), SqlParam::Str(format!("{}%", self.pattern_value)))
            }
            PatternType::Wildcard => {
                (format!("{column} ILIKE $1"), SqlParam::Str(self.pattern_value.replace('*', "%")))
            }
            PatternType::Regex => (format!("{column} ~* $1"), SqlParam::Str(self.pattern_value.clone())),
        }
    }

    /// Fast path bypassing the store for {exact, prefix, wildcard}; regex
    /// is deferred to the backend. `asset_metadata_value` is the raw string
    /// value read from the asset's metadata tree at `self.field`, or
    /// `None` when the path is absent.
    pub fn evaluate_in_memory(&self, asset_metadata_value: Option<&str>) -> Option<bool> {
        let value = asset_metadata_value?;
        match self.pattern_type {
            PatternType::Exact => Some(value.eq_ignore_ascii_case(&self.pattern_value)),
            PatternType::Prefix => Some(value.to_lowercase().starts_with(&self.pattern_value.to_lowercase())),
            PatternType::Wildcard => Some(super::evaluator::wildcard_match(&self.pattern_value, value)),
            PatternType::Regex => None,
        }
    }
}

impl RuleKind for MetadataMatchRule {
    fn validate(&self) -> CoreResult<()> {
        if self.pattern_type == PatternType::Regex {
            Regex::new(&self.pattern_value)
                .map_err(|e| CoreError::InvalidRule(format!("invalid regex: {e}")))?;
        }
        Ok(())
    }

    fn execute(
        &self,
        store: &dyn RelationalStore,
        ctx: &CancellationToken,
        timeout: Duration,
    ) -> CoreResult<Vec<AssetId>> {
        let (clause, param) = self.pattern_sql();
        let sql = format!("{clause} AND is_stub = false");
        crate::cancel::with_deadline(ctx, timeout, || store.query_assets(&sql, &[param.clone()], timeout))
    }

    fn evaluate_for_asset(
        &self,
        store: &dyn RelationalStore,
        ctx: &CancellationToken,
        timeout: Duration,
        asset: AssetId,
    ) -> CoreResult<bool> {
        let (clause, param) = self.pattern_sql();
        let sql = format!("{clause} AND id = $2 AND is_stub = false");
        let params = vec![param, SqlParam::Str(asset.to_string())];
        crate::cancel::with_deadline(ctx, timeout, || store.asset_matches(&sql, &params, asset, timeout))
    }

    fn targets(&self) -> Vec<RuleTarget> {
        targets_for_metadata_match(&self.field)
    }
}

/// `a ∈ Asset.tags`-style helper retained for completeness: read the
/// dotted-path value this rule's field names out of an asset's metadata
/// tree, for use with `evaluate_in_memory`.
pub fn read_metadata_path(asset: &Asset, path: &str) -> Option<String> {
    let mut current = asset.metadata.get(path.split('.').next()?)?;
    for segment in path.split('.').skip(1) {
        current = current.get(segment)?;
    }
    current.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_rule_validation_rejects_unparseable_expression() {
        let rule = EnrichmentRule {
            id: Uuid::new_v4(),
            rule_type: RuleType::Query,
            is_enabled: true,
            query_expression: Some("@type = ".to_string()),
            metadata_field: None,
            pattern_type: None,
            pattern_value: None,
        };
        assert!(matches!(rule.to_kind(), Err(CoreError::InvalidRule(_))));
    }

    #[test]
    fn metadata_match_requires_all_three_fields() {
        let rule = EnrichmentRule {
            id: Uuid::new_v4(),
            rule_type: RuleType::MetadataMatch,
            is_enabled: true,
            query_expression: None,
            metadata_field: Some("owner.team".to_string()),
            pattern_type: None,
            pattern_value: Some("data-*".to_string()),
        };
        assert!(matches!(rule.to_kind(), Err(CoreError::InvalidRule(_))));
    }

    #[test]
    fn invalid_regex_rejected_at_validation() {
        let rule = EnrichmentRule {
            id: Uuid::new_v4(),
            rule_type: RuleType::MetadataMatch,
            is_enabled: true,
            query_expression: None,
            metadata_field: Some("owner.team".to_string()),
            pattern_type: Some(PatternType::Regex),
            pattern_value: Some("(unclosed".to_string()),
        };
        assert!(matches!(rule.to_kind(), Err(CoreError::InvalidRule(_))));
    }

    #[test]
    fn metadata_match_in_memory_wildcard_scenario_four() {
        let rule = MetadataMatchRule {
            field: "owner.team".to_string(),
            pattern_type: PatternType::Wildcard,
            pattern_value: "data-*".to_string(),
        };
        assert_eq!(rule.evaluate_in_memory(Some("data-platform")), Some(true));
        assert_eq!(rule.evaluate_in_memory(Some("ml-ops")), Some(false));
        assert_eq!(rule.evaluate_in_memory(None), None);
    }
}
