//! Dependency health watcher
//!
//! Background task that polls the GraphRAG service and the case store on a
//! fixed interval, keeps a snapshot for the health endpoint, and updates
//! the dependency health gauge.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::clients::{CaseStoreClient, GraphRagClient};
use crate::metrics;

/// Default poll interval between dependency checks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Point-in-time dependency health
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// healthy when every dependency responds, degraded otherwise
    pub status: &'static str,
    pub graphrag: bool,
    pub case_store: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
}

struct HealthState {
    graphrag: bool,
    case_store: bool,
    last_checked: Option<DateTime<Utc>>,
}

/// Watches downstream dependencies
pub struct HealthWatcher {
    graphrag: Arc<GraphRagClient>,
    store: Arc<CaseStoreClient>,
    state: RwLock<HealthState>,
    interval: Duration,
}

impl HealthWatcher {
    pub fn new(
        graphrag: Arc<GraphRagClient>,
        store: Arc<CaseStoreClient>,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(HealthWatcher {
            graphrag,
            store,
            state: RwLock::new(HealthState {
                // Optimistic until the first poll lands
                graphrag: true,
                case_store: true,
                last_checked: None,
            }),
            interval,
        })
    }

    /// Poll both dependencies once and record the outcome
    pub async fn check_once(&self) {
        let graphrag = self.graphrag.health_check().await;
        let case_store = self.store.health_check().await;

        metrics::set_dependency_health("graphrag", graphrag);
        metrics::set_dependency_health("case_store", case_store);

        let mut state = self.state.write();
        state.graphrag = graphrag;
        state.case_store = case_store;
        state.last_checked = Some(Utc::now());
        drop(state);

        debug!(graphrag, case_store, "dependency health checked");
    }

    /// Run the poll loop forever. Spawn this on the runtime.
    pub async fn run(self: Arc<Self>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "dependency health watcher started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let state = self.state.read();
        let status = if state.graphrag && state.case_store {
            "healthy"
        } else {
            "degraded"
        };
        HealthSnapshot {
            status,
            graphrag: state.graphrag,
            case_store: state.case_store,
            last_checked: state.last_checked,
        }
    }

    pub fn is_healthy(&self) -> bool {
        let state = self.state.read();
        state.graphrag && state.case_store
    }
}
