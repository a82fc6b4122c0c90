//! Context Engine
//!
//! Case-centric context retrieval service. Every query is anchored to a
//! case and answered across five dimensions:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Context Engine                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌───────────────┐   ┌─────────────────────┐     │
//! │  │ HTTP API │──▶│    Builder    │──▶│ WHO WHAT WHERE      │     │
//! │  │          │   │ (orchestrate) │   │ WHEN WHY analyzers  │     │
//! │  └──────────┘   └───────┬───────┘   └──────────┬──────────┘     │
//! │                         │                      │                │
//! │                  ┌──────▼──────┐    ┌──────────▼──────────┐     │
//! │                  │ Tiered cache│    │ GraphRAG + case     │     │
//! │                  │ (mem+shared)│    │ store clients       │     │
//! │                  └─────────────┘    └─────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dimension results are scored individually, combined into an overall
//! context score, and only contexts meeting the completeness threshold
//! are cached.

pub mod analyzer;
pub mod api;
pub mod builder;
pub mod cache;
pub mod clients;
pub mod error;
pub mod health;
pub mod metrics;
pub mod model;

pub use builder::ContextBuilder;
pub use cache::{CacheConfig, CacheManager, SharedCacheBackend};
pub use clients::{CaseStoreClient, CaseStoreConfig, GraphRagClient, GraphRagConfig};
pub use error::{Error, Result};
pub use health::HealthWatcher;
pub use model::{ContextResponse, Dimension, Scope};
