//! Approval service port - human-in-the-loop escalation for gate failures.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::OrchestratorResult;

/// Responses at or above this confidence are accepted automatically,
/// without a round trip to the approval backend.
pub const AUTO_ACCEPT_CONFIDENCE: f64 = 0.95;

/// One ranked option in a decision request.
#[derive(Debug, Clone)]
pub struct DecisionOption {
    /// Short, stable label (e.g. "proceed", "retry", "abort").
    pub label: String,
    /// Confidence in this option, in [0, 1].
    pub confidence: f64,
}

/// A decision request submitted when a confidence gate fails and
/// escalation is configured.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    /// Request identifier for correlation.
    pub id: Uuid,
    /// The question put to the approver.
    pub question: String,
    /// Ranked options, highest confidence first.
    pub options: Vec<DecisionOption>,
}

impl DecisionRequest {
    /// Build a request, sorting options by descending confidence.
    pub fn new(question: impl Into<String>, mut options: Vec<DecisionOption>) -> Self {
        options.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            options,
        }
    }

    /// The highest-confidence option, if any.
    pub fn top_option(&self) -> Option<&DecisionOption> {
        self.options.first()
    }
}

/// The approver's selection.
#[derive(Debug, Clone)]
pub struct DecisionResponse {
    /// The request this answers.
    pub request_id: Uuid,
    /// Label of the selected option.
    pub selected: String,
    /// Approver confidence in the selection.
    pub confidence: f64,
}

/// Trait for approval backends.
#[async_trait]
pub trait ApprovalService: Send + Sync {
    /// Submit a decision request and block on a response.
    async fn request_decision(
        &self,
        request: DecisionRequest,
    ) -> OrchestratorResult<DecisionResponse>;
}
