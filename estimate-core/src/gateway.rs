//! Interface boundary toward the persistence and document collaborators.
//!
//! The core consumes these traits; backends implement them. Autosave and
//! manual save both speak [`EstimateGateway`], and the only duty toward the
//! document collaborator is persisting before rendering so the artifact
//! reflects current state.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::EstimatePayload;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("estimate not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Create/read/update contract the engine needs from persistence.
#[async_trait]
pub trait EstimateGateway: Send + Sync {
    /// Persists a new estimate and returns its assigned id.
    async fn create(&self, payload: &EstimatePayload) -> Result<i64, GatewayError>;

    /// Overwrites an existing estimate.
    async fn update(&self, id: i64, payload: &EstimatePayload) -> Result<(), GatewayError>;

    /// Loads one estimate; used on initial load.
    async fn read(&self, id: i64) -> Result<EstimatePayload, GatewayError>;

    /// Recovers existing estimates when only a project reference is known.
    async fn list_by_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<(i64, EstimatePayload)>, GatewayError>;
}

/// Document-generation collaborator; returns a rendered binary artifact.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, estimate_id: i64) -> Result<Vec<u8>, GatewayError>;
}
