//! `LineageService`: wraps a `LineageStore` with observer notification and
//! the "set once before any mutation" invariant, encoded as a builder
//! pattern — the observer is supplied at construction and the field is
//! never mutated thereafter, mirroring Design Notes §9.

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::mrn::Mrn;
use tracing::warn;

use super::{Direction, EdgeId, LineageEdge, LineageStore, RunHistoryEntry, Traversal};

/// Notified synchronously after a lineage mutation has been durably
/// applied. Only fires on state-changing operations: creating an
/// already-existing edge does not fire `on_edge_created`.
pub trait LineageChangeObserver: Send + Sync {
    fn on_edge_created(&self, source: &Mrn, target: &Mrn, edge_type: &str);
    fn on_edge_deleted(&self, source: &Mrn, target: &Mrn);
}

/// Default observer for callers that don't need change notifications.
pub struct NoopObserver;

impl LineageChangeObserver for NoopObserver {
    fn on_edge_created(&self, _source: &Mrn, _target: &Mrn, _edge_type: &str) {}
    fn on_edge_deleted(&self, _source: &Mrn, _target: &Mrn) {}
}

/// Front door for lineage graph mutation and traversal. Store errors
/// propagate to the caller as `CoreError::StoreError`; observer
/// panics/errors never corrupt core state because the observer is infallible
/// by trait signature and any panic is caught and logged.
pub struct LineageService {
    store: Arc<dyn LineageStore>,
    observer: Arc<dyn LineageChangeObserver>,
}

impl LineageService {
    /// The observer is installed here, at construction, and nowhere else —
    /// this is how the "set once before any mutation" runtime invariant is
    /// encoded as a compile-time guarantee.
    pub fn new(store: Arc<dyn LineageStore>, observer: Arc<dyn LineageChangeObserver>) -> Self {
        LineageService { store, observer }
    }

    pub fn with_noop_observer(store: Arc<dyn LineageStore>) -> Self {
        Self::new(store, Arc::new(NoopObserver))
    }

    pub fn create_edge(&self, source: &Mrn, target: &Mrn, edge_type: &str) -> CoreResult<(EdgeId, bool)> {
        let (id, created) = self.store.create_edge(source, target, edge_type)?;
        if created {
            self.notify(|observer| observer.on_edge_created(source, target, edge_type));
        }
        Ok((id, created))
    }

    /// Reads the edge first so the observer has its endpoints; a failed
    /// read does not block the delete, it only suppresses the callback.
    pub fn delete_edge(&self, id: EdgeId) -> CoreResult<()> {
        let endpoints = self.store.get_edge(id).ok();
        self.store.delete_edge(id)?;
        if let Some(edge) = endpoints {
            self.notify(|observer| observer.on_edge_deleted(&edge.source, &edge.target));
        } else {
            warn!(edge_id = %id, "edge endpoints unavailable before delete; suppressing EdgeDeleted notification");
        }
        Ok(())
    }

    pub fn edge_exists(&self, source: &Mrn, target: &Mrn) -> CoreResult<bool> {
        self.store.edge_exists(source, target)
    }

    pub fn get_edge(&self, id: EdgeId) -> CoreResult<LineageEdge> {
        self.store.get_edge(id)
    }

    pub fn neighbors(&self, mrn: &Mrn, direction: Direction) -> CoreResult<Vec<Mrn>> {
        self.store.neighbors(mrn, direction)
    }

    pub fn traverse(&self, start: &Mrn, limit: usize, direction: Direction) -> CoreResult<Traversal> {
        self.store.traverse(start, limit, direction)
    }

    pub fn append_run_history(&self, entry: RunHistoryEntry) -> CoreResult<()> {
        self.store.append_run_history(entry)
    }

    fn notify(&self, f: impl FnOnce(&dyn LineageChangeObserver)) {
        let observer = self.observer.clone();
        if let Err(_panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(observer.as_ref()))) {
            warn!("lineage change observer panicked; swallowing to protect core state");
        }
    }
}

/// Helper so callers that only have a `CoreResult` from a third party can
/// map generic failures onto the store-error variant with context.
pub fn wrap_store_error(context: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::StoreError(format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::InMemoryLineageStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver {
        created: AtomicUsize,
        deleted: AtomicUsize,
    }

    impl LineageChangeObserver for CountingObserver {
        fn on_edge_created(&self, _source: &Mrn, _target: &Mrn, _edge_type: &str) {
            self.created.fetch_add(1, Ordering::SeqCst);
        }
        fn on_edge_deleted(&self, _source: &Mrn, _target: &Mrn) {
            self.deleted.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn mrn(s: &str) -> Mrn {
        Mrn::build("table", "openlineage", "ns", s)
    }

    #[test]
    fn duplicate_edge_creation_fires_observer_once() {
        let observer = Arc::new(CountingObserver { created: AtomicUsize::new(0), deleted: AtomicUsize::new(0) });
        let service = LineageService::new(Arc::new(InMemoryLineageStore::new()), observer.clone());

        service.create_edge(&mrn("a"), &mrn("b"), "lineage").unwrap();
        service.create_edge(&mrn("a"), &mrn("b"), "lineage").unwrap();

        assert_eq!(observer.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delete_fires_observer_with_resolved_endpoints() {
        let observer = Arc::new(CountingObserver { created: AtomicUsize::new(0), deleted: AtomicUsize::new(0) });
        let service = LineageService::new(Arc::new(InMemoryLineageStore::new()), observer.clone());

        let (id, _) = service.create_edge(&mrn("a"), &mrn("b"), "lineage").unwrap();
        service.delete_edge(id).unwrap();

        assert_eq!(observer.deleted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deleting_missing_edge_does_not_fire_observer() {
        let observer = Arc::new(CountingObserver { created: AtomicUsize::new(0), deleted: AtomicUsize::new(0) });
        let service = LineageService::new(Arc::new(InMemoryLineageStore::new()), observer.clone());

        service.delete_edge(EdgeId::new()).unwrap();

        assert_eq!(observer.deleted.load(Ordering::SeqCst), 0);
    }
}
