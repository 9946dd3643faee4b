//! Marmot Resource Name (MRN) construction and parsing.
//!
//! Canonical shape: `mrn://<asset-type>/<provider>/<namespace>.<name>`. All
//! components are lowercased at construction. Namespace segments are often
//! URL-shaped (`postgres://host:port`) and may contain `/` and `.`
//! themselves; `parse` is therefore structural-by-position rather than
//! greedy: the namespace/name split happens at the *first* `.` found after
//! the provider segment, not the last, since `build` always inserts exactly
//! one join `.` immediately after the namespace it was given.

use std::fmt;

/// The kind of asset an MRN identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    Job,
    Dag,
    Task,
    Model,
    Project,
    Table,
    Topic,
    File,
    Bucket,
    Dataset,
}

impl AssetType {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Job => "job",
            AssetType::Dag => "dag",
            AssetType::Task => "task",
            AssetType::Model => "model",
            AssetType::Project => "project",
            AssetType::Table => "table",
            AssetType::Topic => "topic",
            AssetType::File => "file",
            AssetType::Bucket => "bucket",
            AssetType::Dataset => "dataset",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The producer or storage system an asset belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provider {
    Airflow,
    Spark,
    Dbt,
    OpenLineage,
    Bigquery,
    Postgresql,
    Mysql,
    Sqlserver,
    Kafka,
    S3,
    Gcs,
    Azure,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Airflow => "airflow",
            Provider::Spark => "spark",
            Provider::Dbt => "dbt",
            Provider::OpenLineage => "openlineage",
            Provider::Bigquery => "bigquery",
            Provider::Postgresql => "postgresql",
            Provider::Mysql => "mysql",
            Provider::Sqlserver => "sqlserver",
            Provider::Kafka => "kafka",
            Provider::S3 => "s3",
            Provider::Gcs => "gcs",
            Provider::Azure => "azure",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical, lowercase `mrn://type/provider/namespace.name` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mrn(String);

impl Mrn {
    /// Construct a canonical MRN from its parts, lowercasing each component.
    /// `namespace` and `name` are joined with a literal `.`.
    pub fn build(asset_type: &str, provider: &str, namespace: &str, name: &str) -> Mrn {
        Mrn(format!(
            "mrn://{}/{}/{}.{}",
            asset_type.to_lowercase(),
            provider.to_lowercase(),
            namespace.to_lowercase(),
            name.to_lowercase(),
        ))
    }

    /// Parse an MRN back into its components. Lenient: malformed input
    /// returns `None` rather than panicking, and callers must not assume
    /// any structure from a `None` result.
    pub fn parse(raw: &str) -> Option<ParsedMrn> {
        let rest = raw.strip_prefix("mrn://")?;
        let (asset_type, rest) = rest.split_once('/')?;
        let (provider, namespace_name) = rest.split_once('/')?;
        let (namespace, name) = namespace_name.split_once('.')?;
        if asset_type.is_empty() || provider.is_empty() || namespace.is_empty() || name.is_empty()
        {
            return None;
        }
        Some(ParsedMrn {
            asset_type: asset_type.to_string(),
            provider: provider.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Mrn {
    /// Wrap an already-canonical string without re-deriving it. Used when
    /// reading MRNs back from a store rather than building them fresh.
    fn from(value: String) -> Self {
        Mrn(value.to_lowercase())
    }
}

/// The decomposed parts of a successfully parsed MRN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMrn {
    pub asset_type: String,
    pub provider: String,
    pub namespace: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_lowercases_every_component() {
        let mrn = Mrn::build("Table", "BigQuery", "Analytics", "Users");
        assert_eq!(mrn.as_str(), "mrn://table/bigquery/analytics.users");
    }

    #[test]
    fn parse_inverts_build_for_simple_namespaces() {
        let mrn = Mrn::build("task", "airflow", "etl", "load_users");
        let parsed = Mrn::parse(mrn.as_str()).expect("well-formed");
        assert_eq!(parsed.asset_type, "task");
        assert_eq!(parsed.provider, "airflow");
        assert_eq!(parsed.namespace, "etl");
        assert_eq!(parsed.name, "load_users");
        let rebuilt = Mrn::build(
            &parsed.asset_type,
            &parsed.provider,
            &parsed.namespace,
            &parsed.name,
        );
        assert_eq!(rebuilt, mrn);
    }

    #[test]
    fn parse_splits_url_shaped_namespace_at_first_dot() {
        // namespace "postgres://prod" has no dot of its own, so the first
        // dot after the provider segment is the join dot build() inserted.
        let mrn = Mrn::build("table", "postgresql", "postgres://prod", "public.users");
        assert_eq!(
            mrn.as_str(),
            "mrn://table/postgresql/postgres://prod.public.users"
        );
        let parsed = Mrn::parse(mrn.as_str()).expect("well-formed");
        assert_eq!(parsed.namespace, "postgres://prod");
        assert_eq!(parsed.name, "public.users");
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(Mrn::parse("not-an-mrn").is_none());
        assert!(Mrn::parse("mrn://table/bigquery/missingdot").is_none());
        assert!(Mrn::parse("mrn://table/bigquery/").is_none());
    }
}
