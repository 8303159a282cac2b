//! Transient correlation state for the multi-step signup/login flow.

use chrono::{DateTime, Utc};

/// The most recent login submission. OTP verify/resend need the submitted
/// email and device id; the combined signup needs the credentials as well.
#[derive(Debug, Clone)]
pub struct LoginContext {
    pub email: String,
    pub password: String,
    pub device_id: String,
    pub submitted_at: DateTime<Utc>,
}

/// Organization data staged ahead of a combined signup.
#[derive(Debug, Clone)]
pub struct OrgRegistration {
    pub name: String,
    pub organization_number: String,
    pub invoice_email: Option<String>,
}

/// In-memory correlation state owned by the flow orchestrator.
///
/// Never persisted to durable storage; cleared by process restart or an
/// explicit reset (logout).
#[derive(Debug, Clone, Default)]
pub struct PendingRegistration {
    pub login: Option<LoginContext>,
    pub organization: Option<OrgRegistration>,
}

impl PendingRegistration {
    pub fn reset(&mut self) {
        self.login = None;
        self.organization = None;
    }
}
