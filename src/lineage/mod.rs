//! Lineage data model: directed edges between assets, BFS traversal, and
//! the append-only run-history log.

pub mod service;
pub mod store;

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::facet::MetadataValue;
use crate::mrn::Mrn;

pub use service::{LineageChangeObserver, LineageService, NoopObserver};
pub use store::{InMemoryLineageStore, LineageStore};

/// Opaque identifier for a persisted lineage edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    pub fn new() -> EdgeId {
        EdgeId(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        EdgeId::new()
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single, non-transitive directed dependency between two assets.
#[derive(Debug, Clone, PartialEq)]
pub struct LineageEdge {
    pub id: EdgeId,
    pub source: Mrn,
    pub target: Mrn,
    pub edge_type: String,
}

/// Traversal direction relative to a starting asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upstream,
    Downstream,
    Both,
}

/// A single node visited during a traversal, carrying its signed depth
/// relative to the start (negative upstream, zero at start, positive
/// downstream).
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalNode {
    pub mrn: Mrn,
    pub depth: i64,
}

/// The result of a bounded BFS traversal: every node visited (each at most
/// once, at its shortest depth) plus every edge encountered while
/// expanding the frontier, including edges that lead back to an
/// already-visited node (so clients can render cycles).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Traversal {
    pub nodes: Vec<TraversalNode>,
    pub edges: Vec<LineageEdge>,
}

/// The OpenLineage run-state classification of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Start,
    Running,
    Complete,
    Fail,
    Abort,
    Other,
}

impl EventType {
    pub fn from_str(raw: &str) -> EventType {
        match raw.to_uppercase().as_str() {
            "START" => EventType::Start,
            "RUNNING" => EventType::Running,
            "COMPLETE" => EventType::Complete,
            "FAIL" => EventType::Fail,
            "ABORT" => EventType::Abort,
            _ => EventType::Other,
        }
    }
}

/// Immutable, append-only record of one ingested run event, keyed to the
/// job asset it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHistoryEntry {
    pub id: Uuid,
    pub asset_id: crate::asset::AssetId,
    pub run_id: String,
    pub job_namespace: String,
    pub job_name: String,
    pub event_type: EventType,
    pub event_time: DateTime<Utc>,
    pub producer: String,
    pub run_facets: MetadataValue,
    pub job_facets: MetadataValue,
    pub inputs: Vec<Mrn>,
    pub outputs: Vec<Mrn>,
    pub created_at: DateTime<Utc>,
}
