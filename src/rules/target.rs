//! `RuleTarget` extraction: a coarse classification of what a rule selects
//! on, used by the product resolver to index candidate rules against
//! changed-asset signatures without a full per-asset re-scan (4.I).

use crate::query::{FieldType, Node};

/// The coarse signal class a rule target belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    AssetType,
    Provider,
    Tag,
    MetadataKey,
    /// The rule cannot be cheaply indexed and must be re-evaluated on any
    /// asset or rule change.
    Query,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleTarget {
    pub target_type: TargetType,
    pub target_value: String,
}

/// Targets for a `metadata_match` rule: a single `metadata_key` target
/// carrying the top-level key of the dotted path.
pub fn targets_for_metadata_match(field: &str) -> Vec<RuleTarget> {
    let top_level = field.split('.').next().unwrap_or(field);
    vec![RuleTarget { target_type: TargetType::MetadataKey, target_value: top_level.to_string() }]
}

/// Targets for a `query` rule: walk the AST and emit one target per filter
/// according to its field type. Bare terms and any filter type without a
/// direct mapping fall back to a `query` target (full re-evaluation). If
/// nothing could be derived at all, the rule gets a single `query` target
/// built from the raw expression.
pub fn targets_for_query(expression: &str, ast: &Node) -> Vec<RuleTarget> {
    let mut targets = Vec::new();
    walk(ast, &mut targets);
    if targets.is_empty() {
        targets.push(RuleTarget { target_type: TargetType::Query, target_value: expression.to_string() });
    }
    targets
}

fn walk(node: &Node, out: &mut Vec<RuleTarget>) {
    match node {
        Node::Must(children) | Node::Should(children) => {
            for child in children {
                walk(child, out);
            }
        }
        Node::MustNot(child) => walk(child, out),
        Node::Filter(filter) => {
            let target = match filter.field_type {
                FieldType::AssetType => RuleTarget {
                    target_type: TargetType::AssetType,
                    target_value: filter_value_string(filter),
                },
                FieldType::Provider => RuleTarget {
                    target_type: TargetType::Provider,
                    target_value: filter_value_string(filter),
                },
                FieldType::Tag => {
                    RuleTarget { target_type: TargetType::Tag, target_value: filter_value_string(filter) }
                }
                FieldType::Metadata => {
                    let top_level = filter
                        .field
                        .as_deref()
                        .and_then(|p| p.split('.').next())
                        .unwrap_or("")
                        .to_string();
                    RuleTarget { target_type: TargetType::MetadataKey, target_value: top_level }
                }
                FieldType::Name | FieldType::Description => {
                    RuleTarget { target_type: TargetType::Query, target_value: filter_value_string(filter) }
                }
            };
            out.push(target);
        }
        Node::BareTerm(term) => {
            out.push(RuleTarget { target_type: TargetType::Query, target_value: term.clone() });
        }
    }
}

fn filter_value_string(filter: &crate::query::Filter) -> String {
    match &filter.value {
        crate::query::FilterValue::Str(s) => s.clone(),
        crate::query::FilterValue::Range(from, to) => format!("{from}..{to}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse;

    #[test]
    fn metadata_match_target_uses_top_level_key() {
        let targets = targets_for_metadata_match("owner.team");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].target_type, TargetType::MetadataKey);
        assert_eq!(targets[0].target_value, "owner");
    }

    #[test]
    fn query_rule_targets_mapped_per_filter_field() {
        let expr = "@type = \"table\" AND @provider = \"bigquery\"";
        let ast = parse(expr).unwrap();
        let targets = targets_for_query(expr, &ast);
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().any(|t| t.target_type == TargetType::AssetType));
        assert!(targets.iter().any(|t| t.target_type == TargetType::Provider));
    }

    #[test]
    fn free_text_query_falls_back_to_single_query_target() {
        let expr = "users";
        let ast = parse(expr).unwrap();
        let targets = targets_for_query(expr, &ast);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].target_type, TargetType::Query);
    }
}
