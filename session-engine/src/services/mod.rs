//! Services layer for the session engine.
//!
//! Token custody, refresh scheduling, flow orchestration, permission
//! caching, and signature collection live here.

mod api;
mod auth_flow;
mod context;
mod jwt;
mod permission_cache;
mod signature;
mod store;
mod token_lifecycle;

pub mod error;
pub mod policy;

pub use api::{AuthApi, HttpAuthApi, MockAuthApi};
pub use auth_flow::{AuthFlowOrchestrator, Credentials, LoginOutcome};
pub use context::SessionContext;
pub use error::EngineError;
pub use jwt::TokenInspector;
pub use permission_cache::PermissionCache;
pub use signature::{BankIdApi, HttpBankIdApi, MockBankIdApi, SignatureCollector};
pub use store::{
    FileStore, KeyValueStore, MemoryStore, SessionStore, ACCESS_TOKEN_KEY, DEVICE_ID_KEY,
    REFRESH_TOKEN_KEY,
};
pub use token_lifecycle::TokenLifecycleManager;
