//! Authentication backend client.
//!
//! The engine consumes the backend through the `AuthApi` trait so tests can
//! inject an in-memory double; `HttpAuthApi` is the reqwest implementation.
//! Transport timeouts are left to the caller's client configuration.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::dtos::auth::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    RefreshTokenRequest, RefreshTokenResponse, ResendOtpRequest, ResetPasswordRequest,
    SignUpRequest, VerifyOtpRequest, VerifyOtpResponse, VerifyTokenRequest, VerifyTokenResponse,
};
use crate::dtos::rbac::UserPermissionsResponse;
use crate::models::UserDetails;
use crate::services::EngineError;

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_up(&self, req: &SignUpRequest) -> Result<MessageResponse, EngineError>;
    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, EngineError>;
    async fn resend_otp(&self, req: &ResendOtpRequest) -> Result<MessageResponse, EngineError>;
    async fn verify_otp(&self, req: &VerifyOtpRequest) -> Result<VerifyOtpResponse, EngineError>;
    async fn verify_token(
        &self,
        req: &VerifyTokenRequest,
    ) -> Result<VerifyTokenResponse, EngineError>;
    async fn refresh_token(
        &self,
        req: &RefreshTokenRequest,
    ) -> Result<RefreshTokenResponse, EngineError>;
    async fn forgot_password(
        &self,
        req: &ForgotPasswordRequest,
    ) -> Result<MessageResponse, EngineError>;
    async fn reset_password(
        &self,
        req: &ResetPasswordRequest,
    ) -> Result<MessageResponse, EngineError>;
    async fn change_password(
        &self,
        access_token: &str,
        req: &ChangePasswordRequest,
    ) -> Result<MessageResponse, EngineError>;
    async fn logout(&self, access_token: &str) -> Result<(), EngineError>;
    async fn delete_account(&self, access_token: &str) -> Result<(), EngineError>;
    async fn profile_detail(&self, access_token: &str) -> Result<UserDetails, EngineError>;
    async fn user_permissions(
        &self,
        access_token: &str,
    ) -> Result<UserPermissionsResponse, EngineError>;

    /// URL a browser is sent to for OAuth initiation.
    fn google_auth_url(&self) -> String;
}

/// Reqwest-backed client for the authentication backend.
#[derive(Clone)]
pub struct HttpAuthApi {
    client: Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        access_token: Option<&str>,
    ) -> Result<T, EngineError> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        parse_response(path, response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<T, EngineError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(access_token)
            .send()
            .await?;
        parse_response(path, response).await
    }
}

async fn parse_response<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, EngineError> {
    let status = response.status();
    let body = response.text().await?;

    tracing::debug!(path = %path, status = %status, "Backend response");

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| {
            EngineError::Network(anyhow::anyhow!("Malformed response from {}: {}", path, e))
        });
    }

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(EngineError::Authentication(anyhow::anyhow!(
                "{} rejected ({}): {}",
                path,
                status,
                body
            )))
        }
        _ => Err(EngineError::Network(anyhow::anyhow!(
            "{} failed ({}): {}",
            path,
            status,
            body
        ))),
    }
}

async fn expect_success(path: &str, response: reqwest::Response) -> Result<(), EngineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(EngineError::Network(anyhow::anyhow!(
        "{} failed ({}): {}",
        path,
        status,
        body
    )))
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn sign_up(&self, req: &SignUpRequest) -> Result<MessageResponse, EngineError> {
        self.post_json("/api/auth/signup", req, None).await
    }

    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, EngineError> {
        self.post_json("/api/auth/login", req, None).await
    }

    async fn resend_otp(&self, req: &ResendOtpRequest) -> Result<MessageResponse, EngineError> {
        self.post_json("/api/auth/resend-otp", req, None).await
    }

    async fn verify_otp(&self, req: &VerifyOtpRequest) -> Result<VerifyOtpResponse, EngineError> {
        self.post_json("/api/auth/verify-otp", req, None).await
    }

    async fn verify_token(
        &self,
        req: &VerifyTokenRequest,
    ) -> Result<VerifyTokenResponse, EngineError> {
        self.post_json("/api/auth/verify-token", req, None).await
    }

    async fn refresh_token(
        &self,
        req: &RefreshTokenRequest,
    ) -> Result<RefreshTokenResponse, EngineError> {
        self.post_json("/api/auth/refresh-token", req, None).await
    }

    async fn forgot_password(
        &self,
        req: &ForgotPasswordRequest,
    ) -> Result<MessageResponse, EngineError> {
        self.post_json("/api/auth/forgot-password", req, None).await
    }

    async fn reset_password(
        &self,
        req: &ResetPasswordRequest,
    ) -> Result<MessageResponse, EngineError> {
        self.post_json("/api/auth/reset-password", req, None).await
    }

    async fn change_password(
        &self,
        access_token: &str,
        req: &ChangePasswordRequest,
    ) -> Result<MessageResponse, EngineError> {
        self.post_json("/api/auth/change-password", req, Some(access_token))
            .await
    }

    async fn logout(&self, access_token: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .post(self.url("/api/auth/logout"))
            .bearer_auth(access_token)
            .send()
            .await?;
        expect_success("/api/auth/logout", response).await
    }

    async fn delete_account(&self, access_token: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .delete(self.url("/api/profile/delete-account"))
            .bearer_auth(access_token)
            .send()
            .await?;
        expect_success("/api/profile/delete-account", response).await
    }

    async fn profile_detail(&self, access_token: &str) -> Result<UserDetails, EngineError> {
        self.get_json("/api/auth/profile/detail", access_token)
            .await
    }

    async fn user_permissions(
        &self,
        access_token: &str,
    ) -> Result<UserPermissionsResponse, EngineError> {
        self.get_json("/api/rbac/user-permissions", access_token)
            .await
    }

    fn google_auth_url(&self) -> String {
        self.url("/api/auth/google")
    }
}

/// Programmable in-memory backend double used by tests.
///
/// Responses are queued per endpoint; an empty queue falls back to a
/// benign default. Every call is appended to `calls` so tests can assert
/// which network requests were (not) issued.
#[derive(Default)]
pub struct MockAuthApi {
    pub login_responses: std::sync::Mutex<std::collections::VecDeque<Result<LoginResponse, String>>>,
    pub verify_otp_responses:
        std::sync::Mutex<std::collections::VecDeque<Result<VerifyOtpResponse, String>>>,
    pub verify_token_responses:
        std::sync::Mutex<std::collections::VecDeque<Result<VerifyTokenResponse, String>>>,
    pub refresh_responses:
        std::sync::Mutex<std::collections::VecDeque<Result<RefreshTokenResponse, String>>>,
    pub profile_responses: std::sync::Mutex<std::collections::VecDeque<Result<UserDetails, String>>>,
    pub permissions_responses:
        std::sync::Mutex<std::collections::VecDeque<Result<UserPermissionsResponse, String>>>,
    pub calls: std::sync::Mutex<Vec<String>>,
    /// When set, `refresh_token` parks until the notify fires. Lets tests
    /// interleave a logout with an in-flight refresh.
    pub refresh_gate: std::sync::Mutex<Option<std::sync::Arc<tokio::sync::Notify>>>,
}

impl MockAuthApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_login(&self, response: Result<LoginResponse, String>) {
        self.login_responses.lock().unwrap().push_back(response);
    }

    pub fn push_verify_otp(&self, response: Result<VerifyOtpResponse, String>) {
        self.verify_otp_responses.lock().unwrap().push_back(response);
    }

    pub fn push_verify_token(&self, response: Result<VerifyTokenResponse, String>) {
        self.verify_token_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn push_refresh(&self, response: Result<RefreshTokenResponse, String>) {
        self.refresh_responses.lock().unwrap().push_back(response);
    }

    pub fn push_profile(&self, response: Result<UserDetails, String>) {
        self.profile_responses.lock().unwrap().push_back(response);
    }

    pub fn push_permissions(&self, response: Result<UserPermissionsResponse, String>) {
        self.permissions_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn set_refresh_gate(&self, gate: std::sync::Arc<tokio::sync::Notify>) {
        *self.refresh_gate.lock().unwrap() = Some(gate);
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == name)
            .count()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    fn pop<T>(
        queue: &std::sync::Mutex<std::collections::VecDeque<Result<T, String>>>,
    ) -> Option<Result<T, EngineError>> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .map(|r| r.map_err(|msg| EngineError::Authentication(anyhow::anyhow!(msg))))
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn sign_up(&self, _req: &SignUpRequest) -> Result<MessageResponse, EngineError> {
        self.record("sign_up");
        Ok(MessageResponse { message: None })
    }

    async fn login(&self, _req: &LoginRequest) -> Result<LoginResponse, EngineError> {
        self.record("login");
        Self::pop(&self.login_responses).unwrap_or(Ok(LoginResponse {
            success: true,
            requires_verification: true,
            message: None,
        }))
    }

    async fn resend_otp(&self, _req: &ResendOtpRequest) -> Result<MessageResponse, EngineError> {
        self.record("resend_otp");
        Ok(MessageResponse { message: None })
    }

    async fn verify_otp(&self, _req: &VerifyOtpRequest) -> Result<VerifyOtpResponse, EngineError> {
        self.record("verify_otp");
        Self::pop(&self.verify_otp_responses).unwrap_or_else(|| {
            Err(EngineError::Authentication(anyhow::anyhow!(
                "No scripted verify_otp response"
            )))
        })
    }

    async fn verify_token(
        &self,
        _req: &VerifyTokenRequest,
    ) -> Result<VerifyTokenResponse, EngineError> {
        self.record("verify_token");
        Self::pop(&self.verify_token_responses).unwrap_or(Ok(VerifyTokenResponse {
            valid: false,
            access_token: None,
            refresh_token: None,
            user: None,
        }))
    }

    async fn refresh_token(
        &self,
        _req: &RefreshTokenRequest,
    ) -> Result<RefreshTokenResponse, EngineError> {
        self.record("refresh_token");
        let gate = self.refresh_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Self::pop(&self.refresh_responses).unwrap_or_else(|| {
            Err(EngineError::Network(anyhow::anyhow!(
                "No scripted refresh response"
            )))
        })
    }

    async fn forgot_password(
        &self,
        _req: &ForgotPasswordRequest,
    ) -> Result<MessageResponse, EngineError> {
        self.record("forgot_password");
        Ok(MessageResponse { message: None })
    }

    async fn reset_password(
        &self,
        _req: &ResetPasswordRequest,
    ) -> Result<MessageResponse, EngineError> {
        self.record("reset_password");
        Ok(MessageResponse { message: None })
    }

    async fn change_password(
        &self,
        _access_token: &str,
        _req: &ChangePasswordRequest,
    ) -> Result<MessageResponse, EngineError> {
        self.record("change_password");
        Ok(MessageResponse { message: None })
    }

    async fn logout(&self, _access_token: &str) -> Result<(), EngineError> {
        self.record("logout");
        Ok(())
    }

    async fn delete_account(&self, _access_token: &str) -> Result<(), EngineError> {
        self.record("delete_account");
        Ok(())
    }

    async fn profile_detail(&self, _access_token: &str) -> Result<UserDetails, EngineError> {
        self.record("profile_detail");
        Self::pop(&self.profile_responses).unwrap_or(Ok(UserDetails {
            id: "user_mock".to_string(),
            email: "mock@example.com".to_string(),
            name: None,
            role: None,
        }))
    }

    async fn user_permissions(
        &self,
        _access_token: &str,
    ) -> Result<UserPermissionsResponse, EngineError> {
        self.record("user_permissions");
        Self::pop(&self.permissions_responses).unwrap_or(Ok(UserPermissionsResponse {
            resources: Default::default(),
        }))
    }

    fn google_auth_url(&self) -> String {
        "http://mock.local/api/auth/google".to_string()
    }
}
