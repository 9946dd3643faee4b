//! `LineageStore`: the abstract edge/run-history backend (4.D), plus an
//! `InMemoryLineageStore` reference implementation used by this crate's own
//! tests and the debug CLIs.
//!
//! The in-memory store mirrors a sharded `Arc<RwLock<Database>>`
//! concurrency shape: per-direction
//! adjacency maps are kept in `DashMap`s so reads (`Traverse`, `Neighbors`)
//! never block writes (`CreateEdge`) behind one global lock, and the
//! append-only run-history log is the only part guarded by a plain
//! `parking_lot::RwLock` since it must preserve insertion order.

use std::collections::{HashMap, VecDeque};

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::mrn::Mrn;

use super::{Direction, EdgeId, LineageEdge, RunHistoryEntry, Traversal, TraversalNode};

/// Operations over a directed lineage graph plus its run-history log.
pub trait LineageStore: Send + Sync {
    /// Idempotent on `(source, target)`: returns the existing edge id with
    /// `created = false` if the edge is already present.
    fn create_edge(&self, source: &Mrn, target: &Mrn, edge_type: &str) -> CoreResult<(EdgeId, bool)>;

    /// Idempotent delete: deleting a missing edge id is not an error.
    fn delete_edge(&self, id: EdgeId) -> CoreResult<()>;

    fn edge_exists(&self, source: &Mrn, target: &Mrn) -> CoreResult<bool>;

    fn get_edge(&self, id: EdgeId) -> CoreResult<LineageEdge>;

    fn neighbors(&self, mrn: &Mrn, direction: Direction) -> CoreResult<Vec<Mrn>>;

    /// Bounded BFS to a node-count cap. Cycles are tolerated: a node is
    /// emitted at most once, at its shortest depth; edges revisiting an
    /// already-visited node are still included.
    fn traverse(&self, start: &Mrn, limit: usize, direction: Direction) -> CoreResult<Traversal>;

    fn append_run_history(&self, entry: RunHistoryEntry) -> CoreResult<()>;
}

/// In-memory reference implementation. Not persistent; intended for tests
/// and the operational CLIs, not production deployment.
#[derive(Default)]
pub struct InMemoryLineageStore {
    edges: DashMap<EdgeId, LineageEdge>,
    by_source_target: DashMap<(Mrn, Mrn), EdgeId>,
    downstream: DashMap<Mrn, Vec<EdgeId>>,
    upstream: DashMap<Mrn, Vec<EdgeId>>,
    run_history: RwLock<Vec<RunHistoryEntry>>,
}

impl InMemoryLineageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn downstream_edges(&self, mrn: &Mrn) -> Vec<LineageEdge> {
        self.downstream
            .get(mrn)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id).map(|e| e.clone())).collect())
            .unwrap_or_default()
    }

    fn upstream_edges(&self, mrn: &Mrn) -> Vec<LineageEdge> {
        self.upstream
            .get(mrn)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id).map(|e| e.clone())).collect())
            .unwrap_or_default()
    }
}

impl LineageStore for InMemoryLineageStore {
    fn create_edge(&self, source: &Mrn, target: &Mrn, edge_type: &str) -> CoreResult<(EdgeId, bool)> {
        let key = (source.clone(), target.clone());
        if let Some(existing) = self.by_source_target.get(&key) {
            return Ok((*existing, false));
        }

        let id = EdgeId::new();
        let edge = LineageEdge {
            id,
            source: source.clone(),
            target: target.clone(),
            edge_type: edge_type.to_string(),
        };

        // `entry().or_insert()` is atomic under DashMap's shard locking, so
        // concurrent callers racing on the same (source, target) converge
        // on exactly one winner id.
        let winner = *self.by_source_target.entry(key).or_insert(id);
        if winner != id {
            return Ok((winner, false));
        }

        self.edges.insert(id, edge);
        self.downstream.entry(source.clone()).or_default().push(id);
        self.upstream.entry(target.clone()).or_default().push(id);
        Ok((id, true))
    }

    fn delete_edge(&self, id: EdgeId) -> CoreResult<()> {
        if let Some((_, edge)) = self.edges.remove(&id) {
            self.by_source_target.remove(&(edge.source.clone(), edge.target.clone()));
            if let Some(mut list) = self.downstream.get_mut(&edge.source) {
                list.retain(|e| *e != id);
            }
            if let Some(mut list) = self.upstream.get_mut(&edge.target) {
                list.retain(|e| *e != id);
            }
        }
        Ok(())
    }

    fn edge_exists(&self, source: &Mrn, target: &Mrn) -> CoreResult<bool> {
        Ok(self.by_source_target.contains_key(&(source.clone(), target.clone())))
    }

    fn get_edge(&self, id: EdgeId) -> CoreResult<LineageEdge> {
        self.edges
            .get(&id)
            .map(|e| e.clone())
            .ok_or_else(|| CoreError::NotFound(format!("edge {id}")))
    }

    fn neighbors(&self, mrn: &Mrn, direction: Direction) -> CoreResult<Vec<Mrn>> {
        let mut out = Vec::new();
        if matches!(direction, Direction::Downstream | Direction::Both) {
            out.extend(self.downstream_edges(mrn).into_iter().map(|e| e.target));
        }
        if matches!(direction, Direction::Upstream | Direction::Both) {
            out.extend(self.upstream_edges(mrn).into_iter().map(|e| e.source));
        }
        Ok(out)
    }

    fn traverse(&self, start: &Mrn, limit: usize, direction: Direction) -> CoreResult<Traversal> {
        let mut visited: HashMap<Mrn, i64> = HashMap::new();
        let mut seen_edges: std::collections::HashSet<EdgeId> = std::collections::HashSet::new();
        let mut result = Traversal::default();
        let mut queue: VecDeque<(Mrn, i64)> = VecDeque::new();

        visited.insert(start.clone(), 0);
        queue.push_back((start.clone(), 0));
        result.nodes.push(TraversalNode { mrn: start.clone(), depth: 0 });

        while let Some((current, depth)) = queue.pop_front() {
            if visited.len() >= limit {
                break;
            }

            let mut frontier: Vec<(LineageEdge, i64)> = Vec::new();
            if matches!(direction, Direction::Downstream | Direction::Both) {
                for edge in self.downstream_edges(&current) {
                    frontier.push((edge, depth + 1));
                }
            }
            if matches!(direction, Direction::Upstream | Direction::Both) {
                for edge in self.upstream_edges(&current) {
                    frontier.push((edge, depth - 1));
                }
            }

            for (edge, next_depth) in frontier {
                if seen_edges.insert(edge.id) {
                    result.edges.push(edge.clone());
                }
                let neighbor = if edge.source == current { edge.target.clone() } else { edge.source.clone() };
                if !visited.contains_key(&neighbor) && visited.len() < limit {
                    visited.insert(neighbor.clone(), next_depth);
                    result.nodes.push(TraversalNode { mrn: neighbor.clone(), depth: next_depth });
                    queue.push_back((neighbor, next_depth));
                }
            }
        }

        Ok(result)
    }

    fn append_run_history(&self, entry: RunHistoryEntry) -> CoreResult<()> {
        self.run_history.write().push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetId;
    use crate::facet::MetadataValue;
    use crate::lineage::EventType;
    use chrono::Utc;

    fn mrn(s: &str) -> Mrn {
        Mrn::build("table", "openlineage", "ns", s)
    }

    #[test]
    fn create_edge_is_idempotent() {
        let store = InMemoryLineageStore::new();
        let (id1, created1) = store.create_edge(&mrn("a"), &mrn("b"), "lineage").unwrap();
        assert!(created1);
        let (id2, created2) = store.create_edge(&mrn("a"), &mrn("b"), "lineage").unwrap();
        assert!(!created2);
        assert_eq!(id1, id2);
    }

    #[test]
    fn delete_edge_is_idempotent() {
        let store = InMemoryLineageStore::new();
        let (id, _) = store.create_edge(&mrn("a"), &mrn("b"), "lineage").unwrap();
        store.delete_edge(id).unwrap();
        assert!(store.delete_edge(id).is_ok());
        assert!(matches!(store.get_edge(id), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn traverse_tolerates_cycles_and_dedups_nodes() {
        let store = InMemoryLineageStore::new();
        store.create_edge(&mrn("a"), &mrn("b"), "lineage").unwrap();
        store.create_edge(&mrn("b"), &mrn("a"), "lineage").unwrap();

        let traversal = store.traverse(&mrn("a"), 10, Direction::Both).unwrap();
        assert_eq!(traversal.nodes.len(), 2);
        assert_eq!(traversal.edges.len(), 2);
        let b_depth = traversal.nodes.iter().find(|n| n.mrn == mrn("b")).unwrap().depth;
        assert_eq!(b_depth, 1);
    }

    #[test]
    fn traverse_respects_node_limit() {
        let store = InMemoryLineageStore::new();
        store.create_edge(&mrn("a"), &mrn("b"), "lineage").unwrap();
        store.create_edge(&mrn("b"), &mrn("c"), "lineage").unwrap();
        store.create_edge(&mrn("c"), &mrn("d"), "lineage").unwrap();

        let traversal = store.traverse(&mrn("a"), 2, Direction::Downstream).unwrap();
        assert_eq!(traversal.nodes.len(), 2);
    }

    #[test]
    fn run_history_appends_are_ordered() {
        let store = InMemoryLineageStore::new();
        for i in 0..3 {
            store
                .append_run_history(RunHistoryEntry {
                    id: uuid::Uuid::new_v4(),
                    asset_id: AssetId::new(),
                    run_id: format!("run-{i}"),
                    job_namespace: "ns".into(),
                    job_name: "job".into(),
                    event_type: EventType::Complete,
                    event_time: Utc::now(),
                    producer: "test".into(),
                    run_facets: MetadataValue::Object(Default::default()),
                    job_facets: MetadataValue::Object(Default::default()),
                    inputs: vec![],
                    outputs: vec![],
                    created_at: Utc::now(),
                })
                .unwrap();
        }
        assert_eq!(store.run_history.read().len(), 3);
    }
}
