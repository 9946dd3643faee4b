//! The OpenLineage ingestor (4.F): `process_event` orchestrates MRN
//! construction, provider inference, facet extraction, asset upsert, edge
//! creation, and run-history append for a single incoming event.
//!
//! Ordering within one call is fixed: inputs are processed before outputs,
//! and all asset upserts happen before any edge is created so every edge
//! endpoint is resolvable by the time it is used. The job-asset upsert and
//! the run-history append are the "spine" of the event — their failures
//! abort and propagate. Dataset upserts, lineage edges, and parent-edge
//! synthesis are "fan-out" — failures there are logged and skipped, and the
//! event is still reported successful, relying on idempotent MRNs to make
//! retries safe.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::asset::{Asset, AssetId, AssetInput, AssetService};
use crate::error::{CoreError, CoreResult};
use crate::facet::{self, MetadataValue};
use crate::lineage::{EventType, LineageService, RunHistoryEntry};
use crate::mrn::Mrn;
use crate::provider::{
    extract_simple_job_name, infer_dataset_provider, infer_dataset_type, infer_job_type, infer_provider,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSection {
    pub run_id: String,
    #[serde(default)]
    pub facets: Option<JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSection {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub facets: Option<JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetNode {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub facets: Option<JsonValue>,
    #[serde(default)]
    pub input_facets: Option<JsonValue>,
    #[serde(default)]
    pub output_facets: Option<JsonValue>,
}

/// An OpenLineage-compatible run event, as received from a pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub event_type: String,
    pub event_time: DateTime<Utc>,
    pub run: RunSection,
    pub job: JobSection,
    #[serde(default)]
    pub inputs: Vec<DatasetNode>,
    #[serde(default)]
    pub outputs: Vec<DatasetNode>,
    pub producer: String,
    #[serde(rename = "schemaURL", default)]
    pub schema_url: Option<String>,
}

fn facets_tree(raw: &Option<JsonValue>) -> MetadataValue {
    raw.as_ref().map(MetadataValue::from_json).unwrap_or_else(|| MetadataValue::Object(BTreeMap::new()))
}

/// Merge a dataset node's general `facets` with its direction-specific
/// `inputFacets`/`outputFacets` map into one tree for extraction.
fn merged_dataset_facets(node: &DatasetNode, is_input: bool) -> MetadataValue {
    let mut merged = match facets_tree(&node.facets) {
        MetadataValue::Object(map) => map,
        _ => BTreeMap::new(),
    };
    let directional = if is_input { &node.input_facets } else { &node.output_facets };
    if let MetadataValue::Object(extra) = facets_tree(directional) {
        merged.extend(extra);
    }
    MetadataValue::Object(merged)
}

/// Outcome of a successful `process_event` call, surfaced for callers that
/// want to inspect what the event produced (tests, the debug CLI).
#[derive(Debug, Clone)]
pub struct ProcessEventOutcome {
    pub job_asset: Asset,
    pub job_mrn: Mrn,
    pub input_mrns: Vec<Mrn>,
    pub output_mrns: Vec<Mrn>,
}

pub struct Ingestor {
    assets: Arc<dyn AssetService>,
    lineage: Arc<LineageService>,
}

impl Ingestor {
    pub fn new(assets: Arc<dyn AssetService>, lineage: Arc<LineageService>) -> Self {
        Ingestor { assets, lineage }
    }

    pub fn process_event(&self, event: &RunEvent, created_by: Option<&str>) -> CoreResult<ProcessEventOutcome> {
        let job_facets = facets_tree(&event.job.facets);
        let run_facets = facets_tree(&event.run.facets);

        let provider = infer_provider(&event.producer);
        let explicit_job_type = job_facets.get("jobType").and_then(|v| v.get("jobType")).and_then(MetadataValue::as_str);
        let has_parent_facet = run_facets.get("parent").and_then(|p| p.get("job")).is_some();
        let job_type = infer_job_type(explicit_job_type, &provider, &event.job.name, has_parent_facet);
        let simple_job_name = extract_simple_job_name(&event.job.name);
        let job_mrn = Mrn::build(job_type.as_str(), provider.as_str(), &event.job.namespace, &simple_job_name);

        let description = job_facets
            .get("documentation")
            .and_then(|d| d.get("description"))
            .and_then(MetadataValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{job_type} from {} namespace", event.job.namespace));

        let extracted = facet::extract_facets(&job_facets);

        // Step 4 — spine: job-asset upsert. Failures here propagate.
        let job_asset = self.upsert_job_asset(&job_mrn, job_type.as_str(), provider.as_str(), &description, &extracted, created_by)?;

        // Step 5 — fan-out: dataset upserts, inputs before outputs.
        let input_mrns: Vec<Mrn> = event
            .inputs
            .iter()
            .map(|dataset| self.upsert_dataset(dataset, true))
            .collect();
        let output_mrns: Vec<Mrn> = event
            .outputs
            .iter()
            .map(|dataset| self.upsert_dataset(dataset, false))
            .collect();

        // Step 6 — fan-out: lineage edges, after all upserts.
        for input_mrn in &input_mrns {
            if let Err(e) = self.lineage.create_edge(input_mrn, &job_mrn, "lineage") {
                warn!(source = %input_mrn, target = %job_mrn, error = %e, "failed to create input lineage edge");
            }
        }
        for output_mrn in &output_mrns {
            if let Err(e) = self.lineage.create_edge(&job_mrn, output_mrn, "lineage") {
                warn!(source = %job_mrn, target = %output_mrn, error = %e, "failed to create output lineage edge");
            }
        }

        // Step 7 — fan-out: provider-specific parent edges.
        self.synthesize_parent_edge(&provider, job_type.as_str(), &run_facets, &job_mrn);

        // Step 8 — spine: run-history append. Failures here propagate.
        self.lineage.append_run_history(RunHistoryEntry {
            id: uuid::Uuid::new_v4(),
            asset_id: job_asset.id,
            run_id: event.run.run_id.clone(),
            job_namespace: event.job.namespace.clone(),
            job_name: event.job.name.clone(),
            event_type: EventType::from_str(&event.event_type),
            event_time: event.event_time,
            producer: event.producer.clone(),
            run_facets,
            job_facets,
            inputs: input_mrns.clone(),
            outputs: output_mrns.clone(),
            created_at: Utc::now(),
        })?;

        Ok(ProcessEventOutcome { job_asset, job_mrn, input_mrns, output_mrns })
    }

    #[allow(clippy::too_many_arguments)]
    fn upsert_job_asset(
        &self,
        mrn: &Mrn,
        asset_type: &str,
        provider: &str,
        description: &str,
        extracted: &facet::ExtractedFacets,
        created_by: Option<&str>,
    ) -> CoreResult<Asset> {
        let input = AssetInput {
            name: None,
            mrn: Some(mrn.clone()),
            description: Some(description.to_string()),
            asset_type: asset_type.to_string(),
            providers: vec![provider.to_string()],
            metadata: extracted.metadata.clone(),
            tags: vec![],
            sources: vec![],
            schema: extracted.schema.clone(),
            query: extracted.query.clone(),
            query_language: extracted.query_language.clone(),
            is_stub: false,
            created_by: created_by.map(str::to_string),
        };

        match self.assets.create(input.clone()) {
            Ok(asset) => Ok(asset),
            Err(CoreError::AlreadyExists(_)) => {
                let existing = self.assets.get_by_mrn(mrn)?;
                let mut update_input = input;
                update_input.mrn = None;
                if extracted.query.is_none() {
                    update_input.query = None;
                    update_input.query_language = None;
                }
                match self.assets.update(existing.id, update_input) {
                    Ok(updated) => Ok(updated),
                    Err(e) => {
                        warn!(mrn = %mrn, error = %e, "job asset update failed; continuing with existing record");
                        Ok(existing)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Fan-out dataset upsert: never propagates. Returns the computed MRN
    /// regardless of whether the upsert itself succeeded, since lineage
    /// edges must still be created against it.
    fn upsert_dataset(&self, dataset: &DatasetNode, is_input: bool) -> Mrn {
        let provider = infer_dataset_provider(&dataset.namespace);
        let asset_type = infer_dataset_type(&provider, &dataset.name);
        let mrn = Mrn::build(asset_type.as_str(), provider.as_str(), &dataset.namespace, &dataset.name);

        let facets = merged_dataset_facets(dataset, is_input);
        let mut extracted = facet::extract_facets(&facets);
        facet::extract_row_count(&facets, &mut extracted.metadata, is_input);

        let input = AssetInput {
            name: None,
            mrn: Some(mrn.clone()),
            description: None,
            asset_type: asset_type.as_str().to_string(),
            providers: vec![provider.as_str().to_string()],
            metadata: extracted.metadata,
            tags: vec![],
            sources: vec![],
            schema: extracted.schema,
            query: None,
            query_language: None,
            is_stub: true,
            created_by: None,
        };

        match self.assets.create(input.clone()) {
            Ok(_) => {}
            Err(CoreError::AlreadyExists(_)) => match self.assets.get_by_mrn(&mrn) {
                Ok(existing) => {
                    let mut update_input = input;
                    update_input.mrn = None;
                    // never demote an existing non-stub asset back to stub
                    update_input.is_stub = existing.is_stub;
                    if let Err(e) = self.assets.update(existing.id, update_input) {
                        warn!(mrn = %mrn, error = %e, "dataset asset update failed; skipping");
                    }
                }
                Err(e) => warn!(mrn = %mrn, error = %e, "dataset asset lookup after AlreadyExists failed; skipping"),
            },
            Err(e) => warn!(mrn = %mrn, error = %e, "dataset asset upsert failed; skipping"),
        }

        mrn
    }

    fn synthesize_parent_edge(
        &self,
        provider: &crate::mrn::Provider,
        job_type: &str,
        run_facets: &MetadataValue,
        job_mrn: &Mrn,
    ) {
        let Some(parent_job) = run_facets.get("parent").and_then(|p| p.get("job")) else {
            return;
        };

        match (provider, job_type) {
            (crate::mrn::Provider::Airflow, "task") => {
                let (Some(namespace), Some(name)) = (
                    parent_job.get("namespace").and_then(MetadataValue::as_str),
                    parent_job.get("name").and_then(MetadataValue::as_str),
                ) else {
                    return; // malformed parent facet: no parent edge, no error
                };
                let dag_mrn = Mrn::build("dag", provider.as_str(), namespace, name);
                if matches!(self.assets.get_by_mrn(&dag_mrn), Err(CoreError::NotFound(_))) {
                    let input = AssetInput {
                        name: None,
                        mrn: Some(dag_mrn.clone()),
                        description: None,
                        asset_type: "dag".to_string(),
                        providers: vec![provider.as_str().to_string()],
                        metadata: BTreeMap::new(),
                        tags: vec!["openlineage".to_string()],
                        sources: vec![],
                        schema: None,
                        query: None,
                        query_language: None,
                        is_stub: false,
                        created_by: None,
                    };
                    if let Err(e) = self.assets.create(input) {
                        warn!(mrn = %dag_mrn, error = %e, "failed to create DAG asset for parent edge");
                    }
                }
                if let Err(e) = self.lineage.create_edge(&dag_mrn, job_mrn, "lineage") {
                    warn!(source = %dag_mrn, target = %job_mrn, error = %e, "failed to create dag-task parent edge");
                }
            }
            (crate::mrn::Provider::Dbt, "model") => {
                let (Some(namespace), Some(name)) = (
                    parent_job.get("namespace").and_then(MetadataValue::as_str),
                    parent_job.get("name").and_then(MetadataValue::as_str),
                ) else {
                    return;
                };
                let project_name = extract_simple_job_name(name);
                let project_mrn = Mrn::build("project", provider.as_str(), namespace, &project_name);
                if let Err(e) = self.lineage.create_edge(&project_mrn, job_mrn, "lineage") {
                    warn!(source = %project_mrn, target = %job_mrn, error = %e, "failed to create project-model parent edge");
                }
            }
            _ => {}
        }
    }
}

/// `AssetId` display helper used when binding it as a SQL parameter; kept
/// here rather than on `AssetId` itself since only the ingestor's upsert
/// flow needs a canonical string form distinct from `Display`.
pub fn asset_id_param(id: AssetId) -> String {
    id.to_string()
}
