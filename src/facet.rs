//! Facet extraction: pulling schema, query, ownership, and statistics data
//! out of OpenLineage's free-form nested facet maps.
//!
//! Facets arrive as arbitrary JSON. Rather than probing with dynamic type
//! assertions at each call site, the incoming document is first normalized
//! into [`MetadataValue`], a tagged-variant tree, so extraction logic can
//! match exhaustively over `Scalar | Array | Object` and stay testable.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

/// A leaf scalar in a metadata or facet tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// A node of the tagged-variant metadata/facet tree.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Scalar(Value),
    Array(Vec<MetadataValue>),
    Object(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    /// Normalize an arbitrary JSON document into the tagged-variant tree.
    pub fn from_json(value: &JsonValue) -> MetadataValue {
        match value {
            JsonValue::Null => MetadataValue::Scalar(Value::Null),
            JsonValue::Bool(b) => MetadataValue::Scalar(Value::Bool(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    MetadataValue::Scalar(Value::Integer(i))
                } else {
                    MetadataValue::Scalar(Value::Float(n.as_f64().unwrap_or(0.0)))
                }
            }
            JsonValue::String(s) => MetadataValue::Scalar(Value::String(s.clone())),
            JsonValue::Array(items) => {
                MetadataValue::Array(items.iter().map(MetadataValue::from_json).collect())
            }
            JsonValue::Object(map) => MetadataValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), MetadataValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Scalar(Value::Float(f)) => Some(*f),
            MetadataValue::Scalar(Value::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        match self {
            MetadataValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, MetadataValue>> {
        match self {
            MetadataValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[MetadataValue]> {
        match self {
            MetadataValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Walk a dotted path (`a.b.c`) through nested objects/arrays.
    /// Array indices are not addressed by this walk; `index 0` access
    /// (e.g. owners[0]) is handled explicitly by callers that need it.
    pub fn get_path(&self, path: &str) -> Option<&MetadataValue> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }
}

/// The result of extracting facets from a single job or dataset event node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFacets {
    pub metadata: BTreeMap<String, MetadataValue>,
    pub query: Option<String>,
    pub query_language: Option<String>,
    pub schema: Option<BTreeMap<String, String>>,
}

/// Map a raw JSON-schema-ish type name onto the extractor's fixed type
/// vocabulary, defaulting to `string` for anything unrecognized.
fn map_schema_type(raw: &str) -> &'static str {
    match raw.to_lowercase().as_str() {
        "string" | "varchar" | "char" | "text" => "string",
        "integer" | "int" | "int32" | "int64" | "bigint" | "smallint" | "long" => "integer",
        "double" | "float" | "decimal" | "numeric" => "number",
        "boolean" | "bool" => "boolean",
        "date" | "datetime" | "timestamp" | "time" => "string",
        "array" => "array",
        "object" | "struct" | "record" => "object",
        _ => "string",
    }
}

/// Extract metadata/query/schema fields from a facet map. Missing or
/// wrong-typed facets are silently ignored; this function never fails.
pub fn extract_facets(facets: &MetadataValue) -> ExtractedFacets {
    let mut result = ExtractedFacets::default();

    if let Some(query) = facets
        .get("sql")
        .and_then(|f| f.get("query"))
        .and_then(MetadataValue::as_str)
    {
        result.query = Some(query.to_string());
        result.query_language = Some("sql".to_string());
    } else if let Some(source) = facets
        .get("sourceCode")
        .and_then(|f| f.get("sourceCode"))
        .and_then(MetadataValue::as_str)
    {
        result.query = Some(source.to_string());
        result.query_language = Some("python".to_string());
    }

    if let Some(url) = facets
        .get("sourceCodeLocation")
        .and_then(|f| f.get("url"))
        .and_then(MetadataValue::as_str)
    {
        result
            .metadata
            .insert("source_code_url".to_string(), MetadataValue::Scalar(Value::String(url.to_string())));
    }

    if let Some(owner) = facets
        .get("ownership")
        .and_then(|f| f.get("owners"))
        .and_then(MetadataValue::as_array)
        .and_then(|owners| owners.first())
        .and_then(|first| first.get("name"))
        .and_then(MetadataValue::as_str)
    {
        result
            .metadata
            .insert("owner".to_string(), MetadataValue::Scalar(Value::String(owner.to_string())));
    }

    if let Some(tasks) = facets.get("airflow").and_then(|f| f.get("tasks")).and_then(MetadataValue::as_object) {
        let task_names: Vec<MetadataValue> = tasks
            .keys()
            .map(|k| MetadataValue::Scalar(Value::String(k.clone())))
            .collect();
        result.metadata.insert("tasks".to_string(), MetadataValue::Array(task_names));
    }

    if let Some(fields) = facets.get("schema").and_then(|f| f.get("fields")).and_then(MetadataValue::as_array) {
        let mut schema = BTreeMap::new();
        for field in fields {
            if let (Some(name), Some(ty)) = (
                field.get("name").and_then(MetadataValue::as_str),
                field.get("type").and_then(MetadataValue::as_str),
            ) {
                schema.insert(name.to_string(), map_schema_type(ty).to_string());
            }
        }
        if !schema.is_empty() {
            result.schema = Some(schema);
        }
    }

    if let Some(name) = facets.get("dataSource").and_then(|f| f.get("name")).and_then(MetadataValue::as_str) {
        result
            .metadata
            .insert("data_source_name".to_string(), MetadataValue::Scalar(Value::String(name.to_string())));
    }

    if let Some(version) = facets.get("version").and_then(|f| f.get("datasetVersion")).and_then(MetadataValue::as_str) {
        result
            .metadata
            .insert("dataset_version".to_string(), MetadataValue::Scalar(Value::String(version.to_string())));
    }

    result
}

/// Extract `rowCount` from an input/output statistics facet and store it as
/// an integer metadata field under `input_row_count` / `output_row_count`.
pub fn extract_row_count(facets: &MetadataValue, metadata: &mut BTreeMap<String, MetadataValue>, is_input: bool) {
    if let Some(count) = facets
        .get("outputStatistics")
        .or_else(|| facets.get("inputStatistics"))
        .and_then(|f| f.get("rowCount"))
        .and_then(MetadataValue::as_f64)
    {
        let key = if is_input { "input_row_count" } else { "output_row_count" };
        metadata.insert(key.to_string(), MetadataValue::Scalar(Value::Integer(count as i64)));
    }
}
