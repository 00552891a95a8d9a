//! Domain service for the out-pass lifecycle.
//!
//! Handlers resolve the caller up front and pass an explicit
//! [`ActingIdentity`] in; the service never reaches into ambient session
//! state.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{GateEvent, OutPassId, PassDecision};
use crate::models::{HostelPageFilter, OutPass, OutPassWithRefs};

/// Errors for out-pass operations.
///
/// Each variant is one kind of the error taxonomy the HTTP layer surfaces
/// with a machine-readable `kind` field.
#[derive(Debug, Error)]
pub enum OutPassError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    InvalidArgument(String),

    #[error("Precondition failed: {0}")]
    FailedPrecondition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OutPassError {
    /// Stable discriminator for API clients.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::FailedPrecondition(_) => "failed_precondition",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<anyhow::Error> for OutPassError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<sea_orm::DbErr> for OutPassError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Internal(err.to_string())
    }
}

/// The authenticated caller, resolved by the HTTP layer before any
/// service call.
#[derive(Debug, Clone)]
pub struct ActingIdentity {
    pub user_id: i32,
    pub username: String,
    pub email: String,
}

/// Raw creation payload as submitted by a hosteler. Validated by the
/// service, not the handler.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateOutPassRequest {
    pub room_number: String,
    pub address: String,
    pub reason: String,
    pub expected_out_time: String,
    pub expected_in_time: String,
}

/// Out-pass lifecycle operations.
#[async_trait]
pub trait OutPassService: Send + Sync {
    /// Creates a pending out-pass for the hosteler behind `identity`.
    ///
    /// Fails `NotFound` when no hosteler (or hostel) is associated with the
    /// identity, `Forbidden` when the hosteler is banned, and
    /// `InvalidArgument` on payload problems. Updates the hosteler's room of
    /// record when the submitted room differs and is not "UNKNOWN". Returns
    /// the created record.
    async fn create_request(
        &self,
        identity: &ActingIdentity,
        payload: CreateOutPassRequest,
    ) -> Result<OutPass, OutPassError>;

    /// Applies a warden decision to a pending request.
    ///
    /// `FailedPrecondition` when the record is not pending; the conditional
    /// update guarantees only one of two concurrent deciders wins.
    async fn decide(&self, id: OutPassId, decision: PassDecision) -> Result<OutPass, OutPassError>;

    /// Records a gate scan. Exit requires an approved pass, entry a pass in
    /// use; each actual-time column is set exactly once.
    async fn record_gate_event(
        &self,
        id: OutPassId,
        event: GateEvent,
    ) -> Result<OutPass, OutPassError>;

    /// One page of a hostel's out-passes with student/hostel projections.
    async fn list_for_hostel(
        &self,
        hostel_id: i32,
        filter: HostelPageFilter,
    ) -> Result<Vec<OutPassWithRefs>, OutPassError>;

    /// A hosteler's own history, most recent first, small fixed page.
    async fn list_for_student(&self, hosteler_id: i32) -> Result<Vec<OutPass>, OutPassError>;

    async fn get_by_id(&self, id: OutPassId) -> Result<OutPassWithRefs, OutPassError>;
}
