//! `RelationalStore`: the collaborator contract the rule evaluator compiles
//! queries against. Ownership of the actual database driver is out of
//! scope (§1); this crate depends only on this trait.

use std::time::Duration;

use crate::asset::AssetId;
use crate::error::CoreResult;
use crate::query::SqlParam;

pub trait RelationalStore: Send + Sync {
    /// Run a bulk predicate, returning every matching asset id.
    fn query_assets(&self, sql: &str, params: &[SqlParam], timeout: Duration) -> CoreResult<Vec<AssetId>>;

    /// Run a predicate scoped to a single asset.
    fn asset_matches(&self, sql: &str, params: &[SqlParam], asset: AssetId, timeout: Duration) -> CoreResult<bool>;
}
