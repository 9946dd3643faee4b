//! Compiles a parsed query AST into a parameterized SQL predicate over an
//! `assets` table.
//!
//! Conventions:
//! - A metadata path `metadata.a.b.c` becomes a nested `jsonb` accessor
//!   (`metadata->'a'->'b'->>'c'`) yielding text for scalar leaves.
//! - A `*` inside a value becomes a case-insensitive `ILIKE` with `%`
//!   substituted for each `*`.
//! - `regex` uses the backend's case-insensitive regex match operator
//!   (`~*`); the pattern was already validated at parse time.
//! - Numeric/range operators cast the leaf to `numeric`.
//! - Placeholders are emitted as `?` during compilation and renumbered to
//!   `$1, $2, …` in a final pass so callers can splice the fragment into a
//!   surrounding query.
//! - Every compiled query has the hard predicate `is_stub = false` appended
//!   so rule evaluation never matches stub assets.

use super::ast::{FieldType, Filter, FilterValue, Node, Operator};
use crate::error::{CoreError, CoreResult};

/// A single bound parameter in a compiled predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Str(String),
    Float(f64),
}

/// A compiled, ready-to-splice SQL fragment and its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

pub fn metadata_accessor(path: &str) -> String {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.is_empty() {
        return "metadata".to_string();
    }
    let mut sql = "metadata".to_string();
    for (i, segment) in segments.iter().enumerate() {
        let op = if i == segments.len() - 1 { "->>" } else { "->" };
        sql.push_str(op);
        sql.push('\'');
        sql.push_str(&segment.replace('\'', "''"));
        sql.push('\'');
    }
    sql
}

fn wildcard_to_ilike(value: &str) -> String {
    value.replace('*', "%")
}

fn compile_filter(filter: &Filter, params: &mut Vec<SqlParam>) -> CoreResult<String> {
    let column = match filter.field_type {
        FieldType::Name => "name".to_string(),
        FieldType::AssetType => "asset_type".to_string(),
        FieldType::Description => "description".to_string(),
        FieldType::Provider => "providers".to_string(),
        FieldType::Tag => "tags".to_string(),
        FieldType::Metadata => {
            let path = filter
                .field
                .as_deref()
                .ok_or_else(|| CoreError::InvalidInput("metadata filter missing path".to_string()))?;
            metadata_accessor(path)
        }
    };

    let is_array_field = matches!(filter.field_type, FieldType::Provider | FieldType::Tag);

    let sql = match (&filter.value, filter.operator) {
        (FilterValue::Range(from, to), Operator::Range) => {
            params.push(SqlParam::Float(from.parse().unwrap_or(0.0)));
            params.push(SqlParam::Float(to.parse().unwrap_or(0.0)));
            format!("({column})::numeric BETWEEN ? AND ?")
        }
        (FilterValue::Str(value), Operator::Regex) => {
            params.push(SqlParam::Str(value.clone()));
            format!("{column} ~* ?")
        }
        (FilterValue::Str(value), op) if value.contains('*') => {
            params.push(SqlParam::Str(wildcard_to_ilike(value)));
            let clause = format!("{column} ILIKE ?");
            if op == Operator::Neq { format!("NOT ({clause})") } else { clause }
        }
        (FilterValue::Str(value), op) if is_array_field => {
            params.push(SqlParam::Str(value.clone()));
            let clause = "? = ANY(".to_string() + &column + ")";
            match op {
                Operator::Neq => format!("NOT ({clause})"),
                _ => clause,
            }
        }
        (FilterValue::Str(value), op @ (Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte)) => {
            params.push(SqlParam::Float(value.parse().unwrap_or(0.0)));
            let symbol = match op {
                Operator::Gt => ">",
                Operator::Lt => "<",
                Operator::Gte => ">=",
                Operator::Lte => "<=",
                _ => unreachable!(),
            };
            format!("({column})::numeric {symbol} ?")
        }
        (FilterValue::Str(value), Operator::Contains) => {
            params.push(SqlParam::Str(format!("%{value}%")));
            format!("{column} ILIKE ?")
        }
        (FilterValue::Str(value), Operator::Exists) => {
            let _ = value;
            format!("{column} IS NOT NULL")
        }
        (FilterValue::Str(value), Operator::Eq) => {
            params.push(SqlParam::Str(value.clone()));
            format!("{column} = ?")
        }
        (FilterValue::Str(value), Operator::Neq) => {
            params.push(SqlParam::Str(value.clone()));
            format!("{column} != ?")
        }
        (FilterValue::Range(_, _), op) => {
            return Err(CoreError::InvalidInput(format!("range value used with non-range operator {op:?}")));
        }
        (FilterValue::Str(_), Operator::Range) => {
            return Err(CoreError::InvalidInput(
                "range operator used with non-range value".to_string(),
            ));
        }
    };

    Ok(sql)
}

fn compile_node(node: &Node, params: &mut Vec<SqlParam>) -> CoreResult<String> {
    match node {
        Node::Must(children) => {
            let parts: Vec<String> = children
                .iter()
                .map(|c| compile_node(c, params))
                .collect::<CoreResult<_>>()?;
            Ok(format!("({})", parts.join(" AND ")))
        }
        Node::Should(children) => {
            let parts: Vec<String> = children
                .iter()
                .map(|c| compile_node(c, params))
                .collect::<CoreResult<_>>()?;
            Ok(format!("({})", parts.join(" OR ")))
        }
        Node::MustNot(child) => {
            let inner = compile_node(child, params)?;
            Ok(format!("NOT ({inner})"))
        }
        Node::Filter(filter) => compile_filter(filter, params),
        Node::BareTerm(term) => {
            params.push(SqlParam::Str(format!("%{term}%")));
            params.push(SqlParam::Str(format!("%{term}%")));
            Ok("(name ILIKE ? OR description ILIKE ?)".to_string())
        }
    }
}

fn renumber_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut n = 0;
    for c in sql.chars() {
        if c == '?' {
            n += 1;
            out.push_str(&format!("${n}"));
        } else {
            out.push(c);
        }
    }
    out
}

/// Compile an AST into a parameterized predicate with the mandatory
/// `is_stub = false` guard appended.
pub fn build(node: &Node) -> CoreResult<CompiledQuery> {
    let mut params = Vec::new();
    let body = compile_node(node, &mut params)?;
    let sql = renumber_placeholders(&format!("{body} AND is_stub = false"));
    Ok(CompiledQuery { sql, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse;

    #[test]
    fn simple_eq_filter_compiles_with_stub_guard() {
        let node = parse("@type = \"table\"").unwrap();
        let compiled = build(&node).unwrap();
        assert_eq!(compiled.sql, "asset_type = $1 AND is_stub = false");
        assert_eq!(compiled.params, vec![SqlParam::Str("table".to_string())]);
    }

    #[test]
    fn and_of_two_filters_renumbers_placeholders() {
        let node = parse("@type = \"table\" AND @metadata.env : \"prod\"").unwrap();
        let compiled = build(&node).unwrap();
        assert!(compiled.sql.contains("$1"));
        assert!(compiled.sql.contains("$2"));
        assert_eq!(compiled.params.len(), 2);
    }

    #[test]
    fn wildcard_value_becomes_ilike() {
        let node = parse("@name = \"data-*\"").unwrap();
        let compiled = build(&node).unwrap();
        assert!(compiled.sql.contains("ILIKE"));
        assert_eq!(compiled.params[0], SqlParam::Str("data-%".to_string()));
    }

    #[test]
    fn metadata_path_becomes_nested_jsonb_accessor() {
        let node = parse("@metadata.owner.team = \"data-platform\"").unwrap();
        let compiled = build(&node).unwrap();
        assert!(compiled.sql.contains("metadata->'owner'->>'team'"));
    }

    #[test]
    fn range_filter_casts_to_numeric_and_uses_between() {
        let node = parse("@metadata.rowcount range [10 TO 100]").unwrap();
        let compiled = build(&node).unwrap();
        assert!(compiled.sql.contains("BETWEEN"));
        assert_eq!(compiled.params.len(), 2);
    }
}
