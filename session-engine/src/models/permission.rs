//! RBAC permission set - per-resource action flags keyed by resource id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Actions a grant can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionAction {
    Read,
    Create,
    Update,
    Delete,
}

/// Action flags for one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFlags {
    #[serde(default)]
    pub can_read: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_update: bool,
    #[serde(default)]
    pub can_delete: bool,
}

impl ActionFlags {
    pub fn allows(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::Read => self.can_read,
            PermissionAction::Create => self.can_create,
            PermissionAction::Update => self.can_update,
            PermissionAction::Delete => self.can_delete,
        }
    }
}

/// One resource grant: the route it backs plus its action flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGrant {
    pub route: String,
    pub permissions: ActionFlags,
}

/// Mapping from `resource_id` to grant. The empty map is the valid
/// "not yet loaded" state; all queries against it answer `false`.
pub type PermissionSet = HashMap<String, ResourceGrant>;
