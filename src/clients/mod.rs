//! Outbound service clients

pub mod casestore;
pub mod graphrag;

pub use casestore::{CaseRow, CaseStoreClient, CaseStoreConfig, GraphEdge, GraphNode};
pub use graphrag::{
    GraphCommunity, GraphEntity, GraphQueryResponse, GraphRagClient, GraphRagConfig,
    GraphRelationship, GraphStats, SearchType,
};
