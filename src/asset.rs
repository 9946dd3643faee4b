//! Asset types and the `AssetService` collaborator contract.
//!
//! Assets themselves are owned by an external service (out of scope per the
//! system overview); this module defines the shared vocabulary — the
//! `Asset` record, its `AssetInput` constructor/updater payload, and the
//! trait boundary the ingestor and rule evaluator depend on.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::facet::MetadataValue;
use crate::mrn::Mrn;

/// Opaque internal identifier for an asset, independent of its MRN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub Uuid);

impl AssetId {
    pub fn new() -> AssetId {
        AssetId(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        AssetId::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named source that contributed data to an asset, with a freshness
/// timestamp and arbitrary source-specific properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub name: String,
    pub last_sync: DateTime<Utc>,
    pub properties: BTreeMap<String, MetadataValue>,
    pub priority: i32,
}

/// The full record of a catalog asset, as returned by `AssetService`.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: AssetId,
    pub mrn: Mrn,
    pub asset_type: String,
    pub providers: Vec<String>,
    pub metadata: BTreeMap<String, MetadataValue>,
    pub tags: Vec<String>,
    pub sources: Vec<Source>,
    pub schema: Option<BTreeMap<String, String>>,
    pub query: Option<String>,
    pub query_language: Option<String>,
    pub is_stub: bool,
    pub description: Option<String>,
    pub created_by: Option<String>,
}

/// Payload accepted by `AssetService::create`/`update`. `mrn` is required on
/// create; `update` resolves the target by `AssetId` and may leave this
/// unset when the MRN is not changing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetInput {
    pub name: Option<String>,
    pub mrn: Option<Mrn>,
    pub description: Option<String>,
    pub asset_type: String,
    pub providers: Vec<String>,
    pub metadata: BTreeMap<String, MetadataValue>,
    pub tags: Vec<String>,
    pub sources: Vec<Source>,
    pub schema: Option<BTreeMap<String, String>>,
    pub query: Option<String>,
    pub query_language: Option<String>,
    pub is_stub: bool,
    pub created_by: Option<String>,
}

/// Collaborator contract for asset CRUD and MRN lookup. Owned and
/// implemented by an external service; the core only depends on this trait.
pub trait AssetService: Send + Sync {
    /// Create an asset. Returns `CoreError::AlreadyExists` when `input.mrn`
    /// is already taken; callers fall back to `get_by_mrn` + `update`.
    fn create(&self, input: AssetInput) -> CoreResult<Asset>;

    /// Update an existing asset by internal id. Returns
    /// `CoreError::NotFound` when `id` does not resolve.
    fn update(&self, id: AssetId, input: AssetInput) -> CoreResult<Asset>;

    /// Look up an asset by its canonical MRN.
    fn get_by_mrn(&self, mrn: &Mrn) -> CoreResult<Asset>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_values_are_unique() {
        assert_ne!(AssetId::new(), AssetId::new());
    }
}
