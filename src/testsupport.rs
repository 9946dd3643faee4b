//! In-memory reference implementations of the `AssetService` and
//! `RelationalStore` collaborator traits, for this crate's own tests and
//! for the debug CLIs. Neither is meant for production: a real deployment
//! owns its own asset store and query backend (§1).

use std::sync::Arc;

use dashmap::DashMap;
use regex::Regex;

use crate::asset::{Asset, AssetId, AssetInput, AssetService};
use crate::error::{CoreError, CoreResult};
use crate::facet::MetadataValue;
use crate::mrn::Mrn;
use crate::query::SqlParam;
use crate::relational::RelationalStore;

/// Reference `AssetService`: two `DashMap`s, one by id and one by MRN,
/// mirroring the lineage store's indexing shape.
#[derive(Default)]
pub struct InMemoryAssetService {
    by_id: DashMap<AssetId, Asset>,
    by_mrn: DashMap<Mrn, AssetId>,
}

impl InMemoryAssetService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get_by_id(&self, id: AssetId) -> CoreResult<Asset> {
        self.by_id.get(&id).map(|a| a.clone()).ok_or_else(|| CoreError::NotFound(format!("asset {id}")))
    }

    pub fn all(&self) -> Vec<Asset> {
        self.by_id.iter().map(|entry| entry.value().clone()).collect()
    }

    fn build_asset(id: AssetId, mrn: Mrn, input: AssetInput) -> Asset {
        Asset {
            id,
            mrn,
            asset_type: input.asset_type,
            providers: input.providers,
            metadata: input.metadata,
            tags: input.tags,
            sources: input.sources,
            schema: input.schema,
            query: input.query,
            query_language: input.query_language,
            is_stub: input.is_stub,
            description: input.description,
            created_by: input.created_by,
        }
    }
}

impl AssetService for InMemoryAssetService {
    fn create(&self, input: AssetInput) -> CoreResult<Asset> {
        let mrn = input.mrn.clone().ok_or_else(|| CoreError::InvalidInput("create requires an mrn".to_string()))?;
        if self.by_mrn.contains_key(&mrn) {
            return Err(CoreError::AlreadyExists(mrn.to_string()));
        }
        let id = AssetId::new();
        let asset = Self::build_asset(id, mrn.clone(), input);
        self.by_mrn.insert(mrn, id);
        self.by_id.insert(id, asset.clone());
        Ok(asset)
    }

    fn update(&self, id: AssetId, input: AssetInput) -> CoreResult<Asset> {
        let mut existing =
            self.by_id.get_mut(&id).ok_or_else(|| CoreError::NotFound(format!("asset {id}")))?;
        let mrn = input.mrn.clone().unwrap_or_else(|| existing.mrn.clone());
        let updated = Self::build_asset(id, mrn, input);
        *existing = updated.clone();
        Ok(updated)
    }

    fn get_by_mrn(&self, mrn: &Mrn) -> CoreResult<Asset> {
        let id = self.by_mrn.get(mrn).map(|e| *e).ok_or_else(|| CoreError::NotFound(mrn.to_string()))?;
        self.get_by_id(id)
    }
}

/// Reference `RelationalStore`: holds the same assets an
/// `InMemoryAssetService` would, and interprets the restricted SQL grammar
/// `query::builder` emits directly rather than running a real database.
/// Atoms, `NOT (...)`, and `EXISTS (SELECT 1 FROM assets WHERE ...)` are all
/// recognized; anything outside that grammar is a logic error in the
/// compiler, not a data condition, so it panics rather than silently
/// matching nothing.
pub struct InMemoryRelationalStore {
    assets: Arc<InMemoryAssetService>,
}

impl InMemoryRelationalStore {
    pub fn new(assets: Arc<InMemoryAssetService>) -> Self {
        InMemoryRelationalStore { assets }
    }
}

impl RelationalStore for InMemoryRelationalStore {
    fn query_assets(&self, sql: &str, params: &[SqlParam], _timeout: std::time::Duration) -> CoreResult<Vec<AssetId>> {
        Ok(self
            .assets
            .all()
            .into_iter()
            .filter(|asset| eval_predicate(sql, params, asset))
            .map(|asset| asset.id)
            .collect())
    }

    fn asset_matches(
        &self,
        sql: &str,
        params: &[SqlParam],
        asset: AssetId,
        _timeout: std::time::Duration,
    ) -> CoreResult<bool> {
        let asset = self.assets.get_by_id(asset)?;
        Ok(eval_predicate(sql, params, &asset))
    }
}

fn param_str(params: &[SqlParam], index_1based: &str) -> String {
    let idx: usize = index_1based.parse().expect("placeholder index is always numeric");
    match &params[idx - 1] {
        SqlParam::Str(s) => s.clone(),
        SqlParam::Float(f) => f.to_string(),
    }
}

fn param_f64(params: &[SqlParam], index_1based: &str) -> f64 {
    let idx: usize = index_1based.parse().expect("placeholder index is always numeric");
    match &params[idx - 1] {
        SqlParam::Str(s) => s.parse().unwrap_or(0.0),
        SqlParam::Float(f) => *f,
    }
}

fn split_top_level<'a>(expr: &'a str, sep: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    let bytes = expr.as_bytes();
    let sep_bytes = sep.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && expr[i..].starts_with(sep) {
            parts.push(expr[start..i].trim());
            i += sep_bytes.len();
            start = i;
            continue;
        }
        i += 1;
    }
    parts.push(expr[start..].trim());
    parts
}

fn scalar_column(column: &str, asset: &Asset) -> Option<String> {
    match column {
        "name" => Mrn::parse(asset.mrn.as_str()).map(|p| p.name),
        "asset_type" => Some(asset.asset_type.clone()),
        "description" => asset.description.clone(),
        "id" => Some(asset.id.to_string()),
        _ if column.starts_with("metadata") => metadata_column(column, asset),
        _ => None,
    }
}

fn metadata_column_f64(column: &str, asset: &Asset) -> Option<f64> {
    let path_value = metadata_column_value(column, asset)?;
    path_value.as_f64().or_else(|| path_value.as_str().and_then(|s| s.parse().ok()))
}

fn metadata_column(column: &str, asset: &Asset) -> Option<String> {
    metadata_column_value(column, asset)?.as_str().map(str::to_string)
}

fn metadata_column_value<'a>(column: &str, asset: &'a Asset) -> Option<&'a MetadataValue> {
    let segment_re = Regex::new(r"'([^']*)'").unwrap();
    let mut segments = segment_re.captures_iter(column).map(|c| c[1].to_string());
    let first = segments.next()?;
    let mut current = asset.metadata.get(&first)?;
    for segment in segments {
        current = current.get(&segment)?;
    }
    Some(current)
}

fn array_column<'a>(column: &str, asset: &'a Asset) -> Option<&'a [String]> {
    match column {
        "providers" => Some(&asset.providers),
        "tags" => Some(&asset.tags),
        _ => None,
    }
}

/// Match one leaf predicate shape. Returns `None` when `expr` is not a
/// recognized atom, signalling the caller to treat it as a combinator.
fn eval_atom(expr: &str, params: &[SqlParam], asset: &Asset) -> Option<bool> {
    if expr == "is_stub = false" {
        return Some(!asset.is_stub);
    }
    if expr == "is_stub = true" {
        return Some(asset.is_stub);
    }

    let between_re = Regex::new(r"^\((.+)\)::numeric BETWEEN \$(\d+) AND \$(\d+)$").unwrap();
    if let Some(c) = between_re.captures(expr) {
        let value = metadata_column_f64(&c[1], asset).or_else(|| scalar_column(&c[1], asset).and_then(|s| s.parse().ok()));
        let lo = param_f64(params, &c[2]);
        let hi = param_f64(params, &c[3]);
        return Some(value.map(|v| v >= lo && v <= hi).unwrap_or(false));
    }

    let numeric_re = Regex::new(r"^\((.+)\)::numeric (>=|<=|>|<) \$(\d+)$").unwrap();
    if let Some(c) = numeric_re.captures(expr) {
        let value = metadata_column_f64(&c[1], asset).or_else(|| scalar_column(&c[1], asset).and_then(|s| s.parse().ok()));
        let bound = param_f64(params, &c[3]);
        let op = &c[2];
        return Some(match value {
            Some(v) => match op {
                ">" => v > bound,
                "<" => v < bound,
                ">=" => v >= bound,
                "<=" => v <= bound,
                _ => false,
            },
            None => false,
        });
    }

    let any_re = Regex::new(r"^\$(\d+) = ANY\((.+)\)$").unwrap();
    if let Some(c) = any_re.captures(expr) {
        let needle = param_str(params, &c[1]);
        let column = &c[2];
        let found = array_column(column, asset)
            .map(|values| values.iter().any(|v| v.eq_ignore_ascii_case(&needle)))
            .unwrap_or(false);
        return Some(found);
    }

    let not_null_re = Regex::new(r"^(.+) IS NOT NULL$").unwrap();
    if let Some(c) = not_null_re.captures(expr) {
        return Some(scalar_column(&c[1], asset).is_some());
    }

    let regex_re = Regex::new(r"^(.+) ~\* \$(\d+)$").unwrap();
    if let Some(c) = regex_re.captures(expr) {
        let pattern = param_str(params, &c[2]);
        let value = scalar_column(&c[1], asset);
        return Some(match (value, Regex::new(&format!("(?i){pattern}"))) {
            (Some(v), Ok(re)) => re.is_match(&v),
            _ => false,
        });
    }

    let ilike_re = Regex::new(r"^(.+) ILIKE \$(\d+)$").unwrap();
    if let Some(c) = ilike_re.captures(expr) {
        let pattern = param_str(params, &c[2]).replace('%', "*");
        let column = &c[1];
        return Some(if let Some(values) = array_column(column, asset) {
            values.iter().any(|v| crate::rules::wildcard_match(&pattern, v))
        } else {
            scalar_column(column, asset).map(|v| crate::rules::wildcard_match(&pattern, &v)).unwrap_or(false)
        });
    }

    let neq_re = Regex::new(r"^(.+) != \$(\d+)$").unwrap();
    if let Some(c) = neq_re.captures(expr) {
        let expected = param_str(params, &c[2]);
        return Some(scalar_column(&c[1], asset).map(|v| v != expected).unwrap_or(true));
    }

    let eq_re = Regex::new(r"^(.+) = \$(\d+)$").unwrap();
    if let Some(c) = eq_re.captures(expr) {
        let expected = param_str(params, &c[2]);
        return Some(scalar_column(&c[1], asset).map(|v| v == expected).unwrap_or(false));
    }

    None
}

fn eval_predicate(sql: &str, params: &[SqlParam], asset: &Asset) -> bool {
    eval(sql.trim(), params, asset)
}

fn eval(expr: &str, params: &[SqlParam], asset: &Asset) -> bool {
    let expr = expr.trim();
    if let Some(result) = eval_atom(expr, params, asset) {
        return result;
    }
    if let Some(inner) = expr.strip_prefix("NOT (").and_then(|s| s.strip_suffix(')')) {
        return !eval(inner, params, asset);
    }
    if let Some(inner) = expr
        .strip_prefix("EXISTS (SELECT 1 FROM assets WHERE ")
        .and_then(|s| s.strip_suffix(')'))
    {
        return eval(inner, params, asset);
    }

    let and_parts = split_top_level(expr, " AND ");
    if and_parts.len() > 1 {
        return and_parts.iter().all(|p| eval(p, params, asset));
    }
    let or_parts = split_top_level(expr, " OR ");
    if or_parts.len() > 1 {
        return or_parts.iter().any(|p| eval(p, params, asset));
    }
    if expr.starts_with('(') && expr.ends_with(')') {
        return eval(&expr[1..expr.len() - 1], params, asset);
    }

    panic!("unrecognized predicate fragment in reference relational store: `{expr}`");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn asset_input(mrn: Mrn, asset_type: &str, providers: Vec<&str>) -> AssetInput {
        AssetInput {
            name: None,
            mrn: Some(mrn),
            description: Some("a table".to_string()),
            asset_type: asset_type.to_string(),
            providers: providers.into_iter().map(String::from).collect(),
            metadata: BTreeMap::new(),
            tags: vec![],
            sources: vec![],
            schema: None,
            query: None,
            query_language: None,
            is_stub: false,
            created_by: None,
        }
    }

    #[test]
    fn create_rejects_duplicate_mrn() {
        let service = InMemoryAssetService::new();
        let mrn = Mrn::build("table", "bigquery", "ns", "users");
        service.create(asset_input(mrn.clone(), "table", vec!["bigquery"])).unwrap();
        let result = service.create(asset_input(mrn, "table", vec!["bigquery"]));
        assert!(matches!(result, Err(CoreError::AlreadyExists(_))));
    }

    #[test]
    fn relational_store_evaluates_compiled_query() {
        let assets = Arc::new(InMemoryAssetService::new());
        let mrn_a = Mrn::build("table", "bigquery", "ns", "users");
        let mrn_b = Mrn::build("table", "postgresql", "ns", "orders");
        assets.create(asset_input(mrn_a, "table", vec!["bigquery"])).unwrap();
        assets.create(asset_input(mrn_b, "table", vec!["postgresql"])).unwrap();

        let store = InMemoryRelationalStore::new(assets);
        let ast = query::parse("@provider = \"bigquery\"").unwrap();
        let compiled = query::build(&ast).unwrap();
        let matched = store.query_assets(&compiled.sql, &compiled.params, Duration::from_secs(1)).unwrap();
        assert_eq!(matched.len(), 1);
    }
}
