//! Product resolver (4.J): a data product's resolved membership is
//! `manualAssets ∪ ⋃ rule.Execute()`. Kept fresh incrementally rather than
//! recomputed from scratch, since a catalog carries thousands of rules and
//! a full per-asset re-scan on every change is exactly what the rule-target
//! index exists to avoid.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::asset::{Asset, AssetId};
use crate::cancel::CancellationToken;
use crate::error::CoreResult;
use crate::rules::{EnrichmentRule, RuleEvaluator, RuleKind, RuleTarget, TargetType};
use uuid::Uuid;

/// A changed or newly-seen asset's coarse classification, used to decide
/// which rules are even candidates for re-evaluation against it.
#[derive(Debug, Clone)]
pub struct AssetSignature {
    pub asset_type: String,
    pub providers: Vec<String>,
    pub tags: Vec<String>,
    pub metadata_keys: Vec<String>,
}

impl AssetSignature {
    pub fn of(asset: &Asset) -> AssetSignature {
        AssetSignature {
            asset_type: asset.asset_type.clone(),
            providers: asset.providers.clone(),
            tags: asset.tags.clone(),
            metadata_keys: asset.metadata.keys().cloned().collect(),
        }
    }

    /// Whether a candidate rule's target could plausibly match this asset.
    /// A `Query` target is never excluded here — it always requires a real
    /// per-asset evaluation, since its selector isn't captured by any of
    /// the coarse signal classes.
    fn matches(&self, target: &RuleTarget) -> bool {
        match target.target_type {
            TargetType::AssetType => self.asset_type == target.target_value,
            TargetType::Provider => self.providers.iter().any(|p| p == &target.target_value),
            TargetType::Tag => self.tags.iter().any(|t| t == &target.target_value),
            TargetType::MetadataKey => self.metadata_keys.iter().any(|k| k == &target.target_value),
            TargetType::Query => true,
        }
    }
}

struct CompiledRule {
    id: Uuid,
    kind: Box<dyn RuleKind>,
    is_enabled: bool,
    targets: Vec<RuleTarget>,
    /// Assets this rule matched as of its last bulk execution or
    /// per-asset re-evaluation, used to recompute a product's resolved
    /// set without re-running every other rule. Always empty for a
    /// disabled rule.
    last_matched: BTreeSet<AssetId>,
}

/// One data product: its manually curated assets, its rule set, and the
/// resolved membership those two sources produce together.
pub struct DataProduct {
    pub id: Uuid,
    manual_assets: BTreeSet<AssetId>,
    rules: Vec<CompiledRule>,
    resolved: BTreeSet<AssetId>,
}

impl DataProduct {
    pub fn new(id: Uuid, manual_assets: BTreeSet<AssetId>) -> DataProduct {
        let resolved = manual_assets.clone();
        DataProduct { id, manual_assets, rules: Vec::new(), resolved }
    }

    pub fn resolved_members(&self) -> &BTreeSet<AssetId> {
        &self.resolved
    }

    /// A rule-target index entry used by the resolver: maps a target back
    /// to the product and rule it came from, so an asset-change event can
    /// fetch only the rules that could plausibly select it.
    fn target_index_entries(&self) -> Vec<(RuleTarget, Uuid)> {
        self.rules.iter().flat_map(|r| r.targets.iter().map(move |t| (t.clone(), r.id))).collect()
    }
}

/// Resolves data-product membership by reacting to the three event classes
/// 4.J names, backed by the target index so asset-change handling stays
/// cheap regardless of how many rules exist across all products.
pub struct ProductResolver {
    evaluator: RuleEvaluator,
    products: RwLock<BTreeMap<Uuid, DataProduct>>,
    /// `(target) -> [(product, rule)]`, rebuilt incrementally as rules
    /// change. Flat rather than nested by target type, since lookups
    /// always know the target type from the asset signature already.
    target_index: RwLock<Vec<(RuleTarget, Uuid, Uuid)>>,
}

impl ProductResolver {
    pub fn new(evaluator: RuleEvaluator) -> Self {
        ProductResolver {
            evaluator,
            products: RwLock::new(BTreeMap::new()),
            target_index: RwLock::new(Vec::new()),
        }
    }

    fn rebuild_index(&self, products: &BTreeMap<Uuid, DataProduct>) {
        let mut index = Vec::new();
        for product in products.values() {
            for (target, rule_id) in product.target_index_entries() {
                index.push((target, product.id, rule_id));
            }
        }
        *self.target_index.write() = index;
    }

    pub fn create_product(&self, id: Uuid, manual_assets: BTreeSet<AssetId>) {
        let mut products = self.products.write();
        products.insert(id, DataProduct::new(id, manual_assets));
        self.rebuild_index(&products);
    }

    pub fn resolved_members(&self, product_id: Uuid) -> CoreResult<BTreeSet<AssetId>> {
        let products = self.products.read();
        Ok(products.get(&product_id).map(|p| p.resolved.clone()).unwrap_or_default())
    }

    /// Rule created/updated: compile it, re-execute in bulk against the
    /// current catalog, diff against the rule's prior contribution, and
    /// update the product's resolved set and the target index. A disabled
    /// rule is compiled (so an invalid rule still fails loudly) but never
    /// executed and never contributes targets or matches, so it cannot
    /// affect resolved membership until re-enabled.
    pub fn upsert_rule(&self, product_id: Uuid, rule_id: Uuid, rule: &EnrichmentRule, ctx: &CancellationToken) -> CoreResult<()> {
        let kind = rule.to_kind()?;
        let (targets, last_matched) = if rule.is_enabled {
            let targets = kind.targets();
            let matched = self.evaluator.execute(kind.as_ref(), ctx)?;
            (targets, matched.iter().copied().collect())
        } else {
            (Vec::new(), BTreeSet::new())
        };

        let mut products = self.products.write();
        let Some(product) = products.get_mut(&product_id) else {
            return Ok(());
        };

        product.rules.retain(|r| r.id != rule_id);
        product.rules.push(CompiledRule {
            id: rule_id,
            kind,
            is_enabled: rule.is_enabled,
            targets,
            last_matched,
        });
        Self::recompute_resolved(product);
        self.rebuild_index(&products);
        Ok(())
    }

    pub fn delete_rule(&self, product_id: Uuid, rule_id: Uuid) {
        let mut products = self.products.write();
        if let Some(product) = products.get_mut(&product_id) {
            product.rules.retain(|r| r.id != rule_id);
            Self::recompute_resolved(product);
        }
        self.rebuild_index(&products);
    }

    fn recompute_resolved(product: &mut DataProduct) {
        let mut resolved = product.manual_assets.clone();
        for rule in &product.rules {
            if rule.is_enabled {
                resolved.extend(rule.last_matched.iter().copied());
            }
        }
        product.resolved = resolved;
    }

    /// Asset created/updated: consult the target index for candidate rules
    /// via the asset's signature, then evaluate only those rules
    /// per-asset rather than re-scanning every rule in every product.
    pub fn on_asset_changed(&self, asset: &Asset, ctx: &CancellationToken) -> CoreResult<()> {
        let signature = AssetSignature::of(asset);
        let candidates: Vec<(Uuid, Uuid)> = self
            .target_index
            .read()
            .iter()
            .filter(|(target, _, _)| signature.matches(target))
            .map(|(_, product_id, rule_id)| (*product_id, *rule_id))
            .collect();

        let mut products = self.products.write();
        for (product_id, rule_id) in candidates {
            let Some(product) = products.get_mut(&product_id) else { continue };
            let Some(rule) = product.rules.iter_mut().find(|r| r.id == rule_id) else { continue };
            if !rule.is_enabled {
                continue;
            }
            let is_match = self.evaluator.evaluate_for_asset(rule.kind.as_ref(), ctx, asset.id)?;
            if is_match {
                rule.last_matched.insert(asset.id);
                product.resolved.insert(asset.id);
            } else {
                rule.last_matched.remove(&asset.id);
                if !product.manual_assets.contains(&asset.id)
                    && !product.rules.iter().any(|r| r.last_matched.contains(&asset.id))
                {
                    product.resolved.remove(&asset.id);
                }
            }
        }
        Ok(())
    }

    /// Asset deleted: remove it from every product's resolved set and from
    /// every rule's cached match set, regardless of candidacy.
    pub fn on_asset_deleted(&self, asset_id: AssetId) {
        let mut products = self.products.write();
        for product in products.values_mut() {
            product.manual_assets.remove(&asset_id);
            product.resolved.remove(&asset_id);
            for rule in &mut product.rules {
                rule.last_matched.remove(&asset_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetService;
    use crate::config::ExecutionConfig;
    use crate::relational::RelationalStore;
    use crate::rules::{PatternType, RuleType};
    use crate::testsupport::{InMemoryAssetService, InMemoryRelationalStore};
    use std::collections::BTreeMap as StdBTreeMap;

    fn rule_evaluator(store: Arc<dyn RelationalStore>) -> RuleEvaluator {
        RuleEvaluator::new(store, ExecutionConfig::default())
    }

    fn asset_with(asset_type: &str, provider: &str) -> crate::asset::AssetInput {
        crate::asset::AssetInput {
            name: None,
            mrn: Some(crate::mrn::Mrn::build(asset_type, provider, "ns", &uuid::Uuid::new_v4().to_string())),
            description: None,
            asset_type: asset_type.to_string(),
            providers: vec![provider.to_string()],
            metadata: StdBTreeMap::new(),
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
    fn manual_assets_are_always_resolved_members() {
        let assets = Arc::new(InMemoryAssetService::new());
        let store: Arc<dyn RelationalStore> = Arc::new(InMemoryRelationalStore::new(assets.clone()));
        let resolver = ProductResolver::new(rule_evaluator(store));

        let asset = assets.create(asset_with("table", "bigquery")).unwrap();
        let product_id = Uuid::new_v4();
        resolver.create_product(product_id, BTreeSet::from([asset.id]));

        assert!(resolver.resolved_members(product_id).unwrap().contains(&asset.id));
    }

    #[test]
    fn rule_upsert_adds_query_rule_matches() {
        let assets = Arc::new(InMemoryAssetService::new());
        let store: Arc<dyn RelationalStore> = Arc::new(InMemoryRelationalStore::new(assets.clone()));
        let resolver = ProductResolver::new(rule_evaluator(store));

        let matching = assets.create(asset_with("table", "bigquery")).unwrap();
        let _other = assets.create(asset_with("table", "postgresql")).unwrap();

        let product_id = Uuid::new_v4();
        resolver.create_product(product_id, BTreeSet::new());

        let rule = EnrichmentRule {
            id: Uuid::new_v4(),
            rule_type: RuleType::Query,
            is_enabled: true,
            query_expression: Some("@provider = \"bigquery\"".to_string()),
            metadata_field: None,
            pattern_type: None,
            pattern_value: None,
        };
        let ctx = CancellationToken::new();
        resolver.upsert_rule(product_id, rule.id, &rule, &ctx).unwrap();

        let members = resolver.resolved_members(product_id).unwrap();
        assert!(members.contains(&matching.id));
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn disabled_rule_matches_never_reach_resolved_members() {
        let assets = Arc::new(InMemoryAssetService::new());
        let store: Arc<dyn RelationalStore> = Arc::new(InMemoryRelationalStore::new(assets.clone()));
        let resolver = ProductResolver::new(rule_evaluator(store));

        let matching = assets.create(asset_with("table", "bigquery")).unwrap();

        let product_id = Uuid::new_v4();
        resolver.create_product(product_id, BTreeSet::new());

        let rule = EnrichmentRule {
            id: Uuid::new_v4(),
            rule_type: RuleType::Query,
            is_enabled: false,
            query_expression: Some("@provider = \"bigquery\"".to_string()),
            metadata_field: None,
            pattern_type: None,
            pattern_value: None,
        };
        let ctx = CancellationToken::new();
        resolver.upsert_rule(product_id, rule.id, &rule, &ctx).unwrap();

        let members = resolver.resolved_members(product_id).unwrap();
        assert!(!members.contains(&matching.id));

        // A subsequent asset-change notification must not pull the match in
        // through the target index either, since a disabled rule contributes
        // no targets.
        let changed = assets.create(asset_with("table", "bigquery")).unwrap();
        resolver.on_asset_changed(&changed, &ctx).unwrap();
        assert!(!resolver.resolved_members(product_id).unwrap().contains(&changed.id));
    }

    #[test]
    fn asset_deleted_removes_from_all_products() {
        let assets = Arc::new(InMemoryAssetService::new());
        let store: Arc<dyn RelationalStore> = Arc::new(InMemoryRelationalStore::new(assets.clone()));
        let resolver = ProductResolver::new(rule_evaluator(store));

        let asset = assets.create(asset_with("table", "bigquery")).unwrap();
        let product_id = Uuid::new_v4();
        resolver.create_product(product_id, BTreeSet::from([asset.id]));
        resolver.on_asset_deleted(asset.id);

        assert!(!resolver.resolved_members(product_id).unwrap().contains(&asset.id));
    }

    #[test]
    fn asset_changed_updates_membership_via_target_index() {
        let assets = Arc::new(InMemoryAssetService::new());
        let store: Arc<dyn RelationalStore> = Arc::new(InMemoryRelationalStore::new(assets.clone()));
        let resolver = ProductResolver::new(rule_evaluator(store));

        let product_id = Uuid::new_v4();
        resolver.create_product(product_id, BTreeSet::new());

        let rule = EnrichmentRule {
            id: Uuid::new_v4(),
            rule_type: RuleType::MetadataMatch,
            is_enabled: true,
            query_expression: None,
            metadata_field: Some("owner".to_string()),
            pattern_type: Some(PatternType::Exact),
            pattern_value: Some("data-platform".to_string()),
        };
        let ctx = CancellationToken::new();
        resolver.upsert_rule(product_id, rule.id, &rule, &ctx).unwrap();

        let mut input = asset_with("table", "bigquery");
        input.metadata.insert(
            "owner".to_string(),
            crate::facet::MetadataValue::Scalar(crate::facet::Value::String("data-platform".to_string())),
        );
        let asset = assets.create(input).unwrap();
        resolver.on_asset_changed(&asset, &ctx).unwrap();

        assert!(resolver.resolved_members(product_id).unwrap().contains(&asset.id));
    }
}
