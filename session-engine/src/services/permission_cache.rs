//! Cached RBAC permission set for synchronous authorization checks.
//!
//! Queries are fail-closed: an empty cache, an unknown resource, or an
//! unset action flag all answer `false`. The cache itself never errors on
//! absence.

use std::sync::{Arc, RwLock};

use crate::models::{PermissionAction, PermissionSet};
use crate::services::{AuthApi, EngineError, SessionStore};

pub struct PermissionCache {
    api: Arc<dyn AuthApi>,
    store: SessionStore,
    resources: RwLock<PermissionSet>,
}

impl PermissionCache {
    pub fn new(api: Arc<dyn AuthApi>, store: SessionStore) -> Self {
        Self {
            api,
            store,
            resources: RwLock::new(PermissionSet::new()),
        }
    }

    /// Fetch the authorization payload for the current session and replace
    /// the cached set wholesale. Readers never observe a partial update.
    pub async fn load(&self) -> Result<usize, EngineError> {
        let access_token = self.store.access_token().ok_or_else(|| {
            EngineError::Authentication(anyhow::anyhow!(
                "Cannot load permissions without an access token"
            ))
        })?;

        let payload = self.api.user_permissions(&access_token).await?;
        let count = payload.resources.len();

        let mut resources = self
            .resources
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *resources = payload.resources;

        tracing::info!(resource_count = count, "Permission set loaded");
        Ok(count)
    }

    /// Drop the cached set; subsequent queries answer `false`.
    pub fn clear(&self) {
        let mut resources = self
            .resources
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        resources.clear();
    }

    /// Look up by `resource_id`; absent data denies.
    pub fn has_permission(&self, resource_id: &str, action: PermissionAction) -> bool {
        let resources = self
            .resources
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        resources
            .get(resource_id)
            .map(|grant| grant.permissions.allows(action))
            .unwrap_or(false)
    }

    /// Caller-level guard: a denied query becomes an error.
    pub fn require(&self, resource_id: &str, action: PermissionAction) -> Result<(), EngineError> {
        if self.has_permission(resource_id, action) {
            Ok(())
        } else {
            Err(EngineError::PermissionDenied(format!(
                "{:?} on {}",
                action, resource_id
            )))
        }
    }

    /// Look up by matching `route` rather than resource id.
    pub fn can_read(&self, route: &str) -> bool {
        let resources = self
            .resources
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        resources
            .values()
            .find(|grant| grant.route == route)
            .map(|grant| grant.permissions.can_read)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionFlags, ResourceGrant};

    fn cache_with(resources: PermissionSet) -> PermissionCache {
        use crate::services::{MemoryStore, MockAuthApi};
        let cache = PermissionCache::new(
            Arc::new(MockAuthApi::new()),
            SessionStore::new(Arc::new(MemoryStore::new())),
        );
        *cache.resources.write().unwrap() = resources;
        cache
    }

    fn grant(route: &str, can_read: bool, can_update: bool) -> ResourceGrant {
        ResourceGrant {
            route: route.to_string(),
            permissions: ActionFlags {
                can_read,
                can_create: false,
                can_update,
                can_delete: false,
            },
        }
    }

    #[test]
    fn test_empty_cache_denies_everything() {
        let cache = cache_with(PermissionSet::new());
        assert!(!cache.has_permission("campaigns", PermissionAction::Read));
        assert!(!cache.can_read("/campaigns"));
    }

    #[test]
    fn test_unknown_resource_denies() {
        let mut set = PermissionSet::new();
        set.insert("menus".to_string(), grant("/menus", true, false));
        let cache = cache_with(set);

        assert!(!cache.has_permission("campaigns", PermissionAction::Read));
        assert!(!cache.can_read("/campaigns"));
    }

    #[test]
    fn test_unset_action_flag_denies() {
        let mut set = PermissionSet::new();
        set.insert("menus".to_string(), grant("/menus", true, false));
        let cache = cache_with(set);

        assert!(cache.has_permission("menus", PermissionAction::Read));
        assert!(!cache.has_permission("menus", PermissionAction::Update));
        assert!(!cache.has_permission("menus", PermissionAction::Delete));
    }

    #[test]
    fn test_can_read_matches_by_route() {
        let mut set = PermissionSet::new();
        set.insert("menus".to_string(), grant("/menus", true, true));
        set.insert("vendors".to_string(), grant("/vendors", false, false));
        let cache = cache_with(set);

        assert!(cache.can_read("/menus"));
        assert!(!cache.can_read("/vendors"));
    }

    #[test]
    fn test_require_turns_denial_into_error() {
        let mut set = PermissionSet::new();
        set.insert("menus".to_string(), grant("/menus", true, false));
        let cache = cache_with(set);

        assert!(cache.require("menus", PermissionAction::Read).is_ok());
        assert!(matches!(
            cache.require("menus", PermissionAction::Delete),
            Err(EngineError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_clear_returns_to_fail_closed() {
        let mut set = PermissionSet::new();
        set.insert("menus".to_string(), grant("/menus", true, true));
        let cache = cache_with(set);
        assert!(cache.can_read("/menus"));

        cache.clear();
        assert!(!cache.can_read("/menus"));
    }
}
