//! Third-party e-signature order state.

use crate::services::EngineError;
use serde::{Deserialize, Serialize};

/// Status of a signing ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    Pending,
    Complete,
    Failed,
    Expired,
}

impl SignatureStatus {
    /// Terminal states admit no further transitions; a new ceremony needs
    /// a fresh order.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SignatureStatus::Pending)
    }
}

/// A signing ceremony keyed by the provider's order reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureOrder {
    pub order_ref: String,
    pub status: SignatureStatus,
}

impl SignatureOrder {
    pub fn pending(order_ref: impl Into<String>) -> Self {
        Self {
            order_ref: order_ref.into(),
            status: SignatureStatus::Pending,
        }
    }

    /// Convert a terminal non-success status into the matching error.
    pub fn into_result(self) -> Result<SignatureOrder, EngineError> {
        match self.status {
            SignatureStatus::Failed => Err(EngineError::SignatureFailed(self.order_ref)),
            SignatureStatus::Expired => Err(EngineError::SignatureTimeout(self.order_ref)),
            _ => Ok(self),
        }
    }
}
