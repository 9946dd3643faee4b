//! # Catalog Core
//!
//! Lineage ingestion, graph traversal, and enrichment-rule evaluation for a
//! data catalog. This crate is a library: it owns no database driver, no
//! HTTP surface, and no auth. Those are collaborators, described here only
//! as trait contracts ([`asset::AssetService`], [`lineage::LineageStore`],
//! [`relational::RelationalStore`]) that a deployment supplies its own
//! implementation of.
//!
//! ## Pipeline
//!
//! ```text
//! OpenLineage RunEvent (JSON)
//!     |
//! [ingest::Ingestor::process_event]   -> provider/type inference, MRN construction
//!     |                                  facet extraction, asset upsert
//!     v
//! [lineage::LineageService]           -> edge creation, BFS traversal, run history
//!     |
//!     v
//! [rules::RuleEvaluator]              -> query/metadata-match rule execution
//!     |                                  over a RelationalStore
//!     v
//! [product::ProductResolver]          -> incremental data-product membership
//! ```
//!
//! ## Module organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `error` | Crate-wide `CoreError` taxonomy |
//! | `mrn` | MRN construction/parsing, `AssetType`/`Provider` vocabulary |
//! | `provider` | Pure producer/namespace -> provider/asset-type inference |
//! | `facet` | OpenLineage facet tree normalization and extraction |
//! | `asset` | `Asset`/`AssetInput` records and the `AssetService` contract |
//! | `lineage` | Lineage edges, BFS traversal, run history, `LineageService` |
//! | `query` | Query-language AST, parser, and SQL predicate builder |
//! | `relational` | The `RelationalStore` collaborator contract |
//! | `rules` | Enrichment rule model and the rule evaluator |
//! | `product` | Data-product membership resolution |
//! | `ingest` | The OpenLineage event ingestor |
//! | `cancel` | Cooperative cancellation and deadlines |
//! | `config` | Hierarchical configuration (`figment`) |
//! | `testsupport` | In-memory reference collaborators, used by tests and the CLIs |

pub mod asset;
pub mod cancel;
pub mod config;
pub mod error;
pub mod facet;
pub mod ingest;
pub mod lineage;
pub mod mrn;
pub mod product;
pub mod provider;
pub mod query;
pub mod relational;
pub mod rules;
pub mod testsupport;

pub use asset::{Asset, AssetId, AssetInput, AssetService};
pub use cancel::{CancelHandle, CancellationToken};
pub use config::{Config, ExecutionConfig, LoggingConfig};
pub use error::{CoreError, CoreResult};
pub use ingest::{Ingestor, ProcessEventOutcome, RunEvent};
pub use lineage::{Direction, EdgeId, LineageEdge, LineageService, Traversal};
pub use mrn::{AssetType, Mrn, Provider};
pub use product::{DataProduct, ProductResolver};
pub use query::{build as build_query, parse as parse_query, Node as QueryNode};
pub use relational::RelationalStore;
pub use rules::{EnrichmentRule, RuleEvaluator, RuleType};
