//! Approval backend that always accepts the highest-confidence option.
//!
//! Useful for unattended runs and tests; a production embedder would
//! plug in a backend that reaches a human.

use async_trait::async_trait;
use tracing::info;

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::ports::approval::{ApprovalService, DecisionRequest, DecisionResponse};

/// Selects the top-ranked option of every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprovalService;

impl AutoApprovalService {
    /// Create the service.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ApprovalService for AutoApprovalService {
    async fn request_decision(
        &self,
        request: DecisionRequest,
    ) -> OrchestratorResult<DecisionResponse> {
        let top = request.top_option().ok_or_else(|| {
            OrchestratorError::Orchestration(format!(
                "decision request {} has no options",
                request.id
            ))
        })?;
        info!(request_id = %request.id, selected = %top.label, "Auto-approved");
        Ok(DecisionResponse {
            request_id: request.id,
            selected: top.label.clone(),
            confidence: top.confidence,
        })
    }
}
