//! Client-resident authentication and authorization session engine.
//!
//! Custody of the access/refresh token pair, proactive refresh scheduling
//! against JWT expiry, the multi-step login/OTP/signup flow, a cached RBAC
//! permission set for synchronous authorization checks, and a BankID-style
//! signature order/poll state machine.
//!
//! Tokens are decoded locally without signature verification; decoded
//! claims drive timing and display only. Authorization always goes through
//! the network-loaded permission snapshot.

pub mod config;
pub mod dtos;
pub mod models;
pub mod observability;
pub mod services;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::models::Session;
use crate::services::{
    AuthApi, AuthFlowOrchestrator, BankIdApi, EngineError, FileStore, HttpAuthApi, HttpBankIdApi,
    KeyValueStore, PermissionCache, SessionContext, SessionStore, SignatureCollector,
    TokenLifecycleManager,
};

/// Composition root wiring the store, transport, lifecycle, orchestrator,
/// permission cache, and signature collector together.
pub struct SessionEngine {
    config: EngineConfig,
    store: SessionStore,
    lifecycle: TokenLifecycleManager,
    auth: AuthFlowOrchestrator,
    permissions: Arc<PermissionCache>,
    signatures: SignatureCollector,
    context: SessionContext,
}

impl SessionEngine {
    /// Build an engine from environment configuration with the file-backed
    /// store and HTTP transports.
    pub fn from_env() -> Result<Self, EngineError> {
        let config = EngineConfig::from_env()?;
        let kv: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::open(&config.storage.path).map_err(EngineError::Storage)?);
        let api: Arc<dyn AuthApi> = Arc::new(HttpAuthApi::new(config.api.base_url.clone()));
        let bankid: Arc<dyn BankIdApi> = Arc::new(HttpBankIdApi::new(config.api.base_url.clone()));
        Ok(Self::new(config, kv, api, bankid))
    }

    /// Build an engine from explicit parts. Tests inject in-memory doubles
    /// here.
    pub fn new(
        config: EngineConfig,
        kv: Arc<dyn KeyValueStore>,
        api: Arc<dyn AuthApi>,
        bankid: Arc<dyn BankIdApi>,
    ) -> Self {
        let store = SessionStore::new(kv);
        let context = SessionContext::new();
        let lifecycle = TokenLifecycleManager::new(
            api.clone(),
            store.clone(),
            context.clone(),
            config.refresh.lead_seconds,
        );
        let permissions = Arc::new(PermissionCache::new(api.clone(), store.clone()));
        let auth = AuthFlowOrchestrator::new(
            api,
            store.clone(),
            lifecycle.clone(),
            permissions.clone(),
            context.clone(),
            config.device_label.clone(),
        );
        let signatures = SignatureCollector::new(bankid, config.bankid.environment.clone());

        Self {
            config,
            store,
            lifecycle,
            auth,
            permissions,
            signatures,
            context,
        }
    }

    /// Re-enter a persisted session on startup: validate the stored pair
    /// with the backend. Absent or rejected tokens leave the session
    /// anonymous.
    pub async fn bootstrap(&self) -> bool {
        match self.store.token_pair() {
            Some(pair) => {
                self.auth
                    .verify_token(&pair.access_token, &pair.refresh_token)
                    .await
            }
            None => false,
        }
    }

    pub fn auth(&self) -> &AuthFlowOrchestrator {
        &self.auth
    }

    pub fn permissions(&self) -> &PermissionCache {
        &self.permissions
    }

    pub fn signatures(&self) -> &SignatureCollector {
        &self.signatures
    }

    pub fn lifecycle(&self) -> &TokenLifecycleManager {
        &self.lifecycle
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> Session {
        self.context.snapshot()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Session> {
        self.context.subscribe()
    }
}
