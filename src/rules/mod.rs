//! Enrichment rule model and evaluation: the query/metadata-match rule
//! families, their polymorphic dispatch, rule-target extraction, and the
//! evaluator that runs them against a `RelationalStore`.

pub mod evaluator;
pub mod model;
pub mod target;

pub use evaluator::{wildcard_match, RuleEvaluator};
pub use model::{EnrichmentRule, MetadataMatchRule, PatternType, QueryRule, RuleKind, RuleType};
pub use target::{RuleTarget, TargetType};
