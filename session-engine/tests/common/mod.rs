//! Test helper module for session-engine integration tests.

#![allow(dead_code)]

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::sync::Arc;

use session_engine::config::{
    ApiConfig, BankIdConfig, EngineConfig, Environment, RefreshConfig, StorageConfig,
};
use session_engine::dtos::auth::{
    LoginResponse, RefreshTokenResponse, TokenPairDto, VerifyOtpData, VerifyOtpResponse,
    VerifyTokenResponse,
};
use session_engine::dtos::rbac::UserPermissionsResponse;
use session_engine::models::{ActionFlags, PermissionSet, ResourceGrant, UserDetails};
use session_engine::services::{MemoryStore, MockAuthApi, MockBankIdApi};
use session_engine::SessionEngine;

/// Engine wired with in-memory doubles for every collaborator.
pub struct TestApp {
    pub engine: SessionEngine,
    pub api: Arc<MockAuthApi>,
    pub bankid: Arc<MockBankIdApi>,
    pub kv: Arc<MemoryStore>,
}

pub fn test_config(lead_seconds: i64) -> EngineConfig {
    EngineConfig {
        environment: Environment::Dev,
        service_name: "session-engine-test".to_string(),
        log_level: "debug".to_string(),
        api: ApiConfig {
            base_url: "http://localhost:8080".to_string(),
        },
        refresh: RefreshConfig { lead_seconds },
        storage: StorageConfig {
            path: "unused".to_string(),
        },
        bankid: BankIdConfig {
            environment: "test".to_string(),
        },
        device_label: "test-device".to_string(),
    }
}

pub fn spawn_engine() -> TestApp {
    spawn_engine_with_lead(60)
}

pub fn spawn_engine_with_lead(lead_seconds: i64) -> TestApp {
    let api = Arc::new(MockAuthApi::new());
    let bankid = Arc::new(MockBankIdApi::new());
    let kv = Arc::new(MemoryStore::new());
    let engine = SessionEngine::new(
        test_config(lead_seconds),
        kv.clone(),
        api.clone(),
        bankid.clone(),
    );
    TestApp {
        engine,
        api,
        bankid,
        kv,
    }
}

#[derive(Serialize)]
struct TestClaims {
    exp: i64,
    user_id: String,
}

/// JWT whose `exp` lies `exp_offset_secs` from now. The signature is not
/// checked anywhere in the engine, so any signing key does.
pub fn make_token(exp_offset_secs: i64) -> String {
    let claims = TestClaims {
        exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        user_id: "user_123".to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}

pub fn test_user() -> UserDetails {
    UserDetails {
        id: "user_123".to_string(),
        email: "a@b.com".to_string(),
        name: Some("Test User".to_string()),
        role: Some("admin".to_string()),
    }
}

pub fn otp_required_login() -> LoginResponse {
    LoginResponse {
        success: true,
        requires_verification: true,
        message: None,
    }
}

pub fn otp_success(access: &str, refresh: &str) -> VerifyOtpResponse {
    VerifyOtpResponse {
        success: true,
        data: Some(VerifyOtpData {
            tokens: TokenPairDto {
                access: access.to_string(),
                refresh: refresh.to_string(),
            },
            user: Some(test_user()),
        }),
        message: None,
    }
}

pub fn otp_rejected() -> VerifyOtpResponse {
    VerifyOtpResponse {
        success: false,
        data: None,
        message: Some("Invalid code".to_string()),
    }
}

pub fn refresh_ok(access: &str, refresh: &str) -> RefreshTokenResponse {
    RefreshTokenResponse {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
    }
}

pub fn verify_token_ok(rotated: Option<(&str, &str)>) -> VerifyTokenResponse {
    VerifyTokenResponse {
        valid: true,
        access_token: rotated.map(|(a, _)| a.to_string()),
        refresh_token: rotated.map(|(_, r)| r.to_string()),
        user: Some(test_user()),
    }
}

pub fn permissions_with(entries: &[(&str, &str, bool)]) -> UserPermissionsResponse {
    let mut resources = PermissionSet::new();
    for (resource_id, route, can_read) in entries {
        resources.insert(
            resource_id.to_string(),
            ResourceGrant {
                route: route.to_string(),
                permissions: ActionFlags {
                    can_read: *can_read,
                    can_create: false,
                    can_update: false,
                    can_delete: false,
                },
            },
        );
    }
    UserPermissionsResponse { resources }
}
