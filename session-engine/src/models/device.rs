use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Device identity - generated once, persisted for the lifetime of the
/// client install, used to correlate login/OTP/resend requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub device_id: String,
}

impl DeviceIdentity {
    /// Generate a fresh identity. Collision resistance at human scale is
    /// all that is required here, not cryptographic strength.
    pub fn generate() -> Self {
        Self {
            device_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Best-effort human-readable device label. A display hint only, never a
/// security control.
pub fn default_device_label() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}
