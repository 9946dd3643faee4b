//! Pure inference functions mapping producer/namespace strings onto
//! [`Provider`] and [`AssetType`] enum values. Every function here is a
//! total, side-effect-free string match — no I/O, no fallible paths.

use crate::mrn::{AssetType, Provider};

const JOB_PROVIDER_ORDER: &[(&str, Provider)] = &[
    ("airflow", Provider::Airflow),
    ("spark", Provider::Spark),
    ("dbt", Provider::Dbt),
];

/// `InferProvider`: case-insensitive substring match over `producer` in
/// priority order {airflow, spark, dbt}; falls back to `OpenLineage`.
pub fn infer_provider(producer: &str) -> Provider {
    let lower = producer.to_lowercase();
    for (needle, provider) in JOB_PROVIDER_ORDER {
        if lower.contains(needle) {
            return provider.clone();
        }
    }
    Provider::OpenLineage
}

fn default_job_type(provider: &Provider) -> AssetType {
    match provider {
        Provider::Dbt => AssetType::Model,
        Provider::Airflow => AssetType::Dag,
        Provider::Spark => AssetType::Job,
        _ => AssetType::Job,
    }
}

fn parse_explicit_job_type(raw: &str) -> Option<AssetType> {
    match raw.to_lowercase().as_str() {
        "task" => Some(AssetType::Task),
        "dag" => Some(AssetType::Dag),
        "model" => Some(AssetType::Model),
        "project" => Some(AssetType::Project),
        "job" => Some(AssetType::Job),
        _ => None,
    }
}

/// `InferJobType`: prefers an explicit `job.facets.jobType.jobType` value
/// (case-folded), otherwise falls back to the provider default. A dbt event
/// whose job name starts with `dbt-run-` and carries no parent facet is
/// promoted from `Job` to `Project`.
pub fn infer_job_type(
    explicit_job_type: Option<&str>,
    provider: &Provider,
    job_name: &str,
    has_parent_facet: bool,
) -> AssetType {
    let mut asset_type = explicit_job_type
        .and_then(parse_explicit_job_type)
        .unwrap_or_else(|| default_job_type(provider));

    if asset_type == AssetType::Job && job_name.starts_with("dbt-run-") && !has_parent_facet {
        asset_type = AssetType::Project;
    }
    asset_type
}

/// `extractSimpleJobName`: the last dotted segment of `name`, or `name`
/// with any `dbt-run-` prefix stripped when there is no dot.
pub fn extract_simple_job_name(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) => name[idx + 1..].to_string(),
        None => name.strip_prefix("dbt-run-").unwrap_or(name).to_string(),
    }
}

const DATASET_PROVIDER_ORDER: &[(&[&str], Provider)] = &[
    (&["bigquery", "bq"], Provider::Bigquery),
    (&["postgres"], Provider::Postgresql),
    (&["mysql"], Provider::Mysql),
    (&["sqlserver"], Provider::Sqlserver),
    (&["kafka"], Provider::Kafka),
    (&["s3"], Provider::S3),
    (&["gcs"], Provider::Gcs),
    (&["azure"], Provider::Azure),
];

/// `InferDatasetProvider`: matches `namespace` substrings in the listed
/// order; an ambiguous namespace matching more than one rule resolves to
/// the first match in that order. Falls back to `OpenLineage` when nothing
/// matches, mirroring the job-provider fallback.
pub fn infer_dataset_provider(namespace: &str) -> Provider {
    let lower = namespace.to_lowercase();
    for (needles, provider) in DATASET_PROVIDER_ORDER {
        if needles.iter().any(|needle| lower.contains(needle)) {
            return provider.clone();
        }
    }
    Provider::OpenLineage
}

const KNOWN_FILE_EXTENSIONS: &[&str] = &[
    ".csv", ".tsv", ".json", ".jsonl", ".parquet", ".avro", ".orc", ".txt", ".xml", ".xlsx",
    ".gz",
];

/// `InferDatasetType`: relational providers map to `Table`, `kafka` maps to
/// `Topic`, object-store providers map to `File` when `name` carries a
/// known extension and `Bucket` otherwise, and anything else falls back to
/// the generic `Dataset`.
pub fn infer_dataset_type(provider: &Provider, name: &str) -> AssetType {
    match provider {
        Provider::Postgresql | Provider::Mysql | Provider::Sqlserver | Provider::Bigquery => {
            AssetType::Table
        }
        Provider::Kafka => AssetType::Topic,
        Provider::S3 | Provider::Gcs | Provider::Azure => {
            let lower = name.to_lowercase();
            if KNOWN_FILE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
                AssetType::File
            } else {
                AssetType::Bucket
            }
        }
        _ => AssetType::Dataset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_provider_priority_order() {
        assert_eq!(infer_provider("great-expectations-airflow/1.0"), Provider::Airflow);
        assert_eq!(infer_provider("dbt/1.7.0"), Provider::Dbt);
        assert_eq!(infer_provider("custom-producer"), Provider::OpenLineage);
    }

    #[test]
    fn infer_provider_matches_substring_case_insensitively() {
        assert_eq!(infer_provider("Apache-Spark-3.4"), Provider::Spark);
    }

    #[test]
    fn infer_job_type_uses_explicit_facet_first() {
        assert_eq!(
            infer_job_type(Some("TASK"), &Provider::Airflow, "daily.load_users", true),
            AssetType::Task
        );
    }

    #[test]
    fn infer_job_type_falls_back_to_provider_default() {
        assert_eq!(infer_job_type(None, &Provider::Dbt, "model.proj.users", false), AssetType::Model);
        assert_eq!(infer_job_type(None, &Provider::Airflow, "daily", false), AssetType::Dag);
        assert_eq!(infer_job_type(None, &Provider::Spark, "etl_job", false), AssetType::Job);
    }

    #[test]
    fn dbt_run_prefix_without_parent_promotes_job_to_project() {
        assert_eq!(
            infer_job_type(Some("JOB"), &Provider::Dbt, "dbt-run-proj", false),
            AssetType::Project
        );
        // with a parent facet present, no promotion
        assert_eq!(
            infer_job_type(Some("JOB"), &Provider::Dbt, "dbt-run-proj", true),
            AssetType::Job
        );
    }

    #[test]
    fn extract_simple_job_name_takes_last_dotted_segment() {
        assert_eq!(extract_simple_job_name("daily.load_users"), "load_users");
        assert_eq!(extract_simple_job_name("model.proj.users"), "users");
        assert_eq!(extract_simple_job_name("dbt-run-proj"), "proj");
        assert_eq!(extract_simple_job_name("no_prefix_no_dot"), "no_prefix_no_dot");
    }

    #[test]
    fn infer_dataset_provider_resolves_ambiguous_namespace_to_first_match() {
        // contains both "postgres" and "bigquery" substrings; postgres is listed first
        assert_eq!(
            infer_dataset_provider("bigquery-postgres-mirror"),
            Provider::Bigquery
        );
        assert_eq!(infer_dataset_provider("postgres://prod"), Provider::Postgresql);
        assert_eq!(infer_dataset_provider("unknown://host"), Provider::OpenLineage);
    }

    #[test]
    fn infer_dataset_type_by_provider_and_extension() {
        assert_eq!(infer_dataset_type(&Provider::Postgresql, "public.users"), AssetType::Table);
        assert_eq!(infer_dataset_type(&Provider::Kafka, "topic.events"), AssetType::Topic);
        assert_eq!(infer_dataset_type(&Provider::S3, "raw/events.csv"), AssetType::File);
        assert_eq!(infer_dataset_type(&Provider::S3, "raw-bucket"), AssetType::Bucket);
        assert_eq!(infer_dataset_type(&Provider::OpenLineage, "anything"), AssetType::Dataset);
    }
}
