use crate::models::PermissionSet;
use serde::Deserialize;

/// Authorization payload for the current session.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPermissionsResponse {
    #[serde(default)]
    pub resources: PermissionSet,
}
