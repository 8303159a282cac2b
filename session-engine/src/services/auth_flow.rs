//! Login/signup/OTP/OAuth flow orchestration.
//!
//! The orchestrator owns the observable session and the transient
//! correlation state for the multi-step flows. It is the only component
//! that moves the session between anonymous and authenticated.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use validator::Validate;

use crate::dtos::auth::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, OrgRegistrationDto,
    ResendOtpRequest, ResetPasswordRequest, SignUpRequest, VerifyOtpRequest, VerifyTokenRequest,
};
use crate::models::{
    LoginContext, OrgRegistration, PendingRegistration, Session, TokenPair, UserDetails,
};
use crate::services::{
    policy, AuthApi, EngineError, PermissionCache, SessionContext, SessionStore, TokenInspector,
    TokenLifecycleManager,
};

/// Credentials submitted by the caller; device identity is attached by the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Outcome of a credential submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The backend wants an OTP before it hands out tokens.
    OtpRequired,
    /// Accepted without a verification step; no tokens were issued.
    Accepted,
}

pub struct AuthFlowOrchestrator {
    api: Arc<dyn AuthApi>,
    store: SessionStore,
    lifecycle: TokenLifecycleManager,
    permissions: Arc<PermissionCache>,
    context: SessionContext,
    pending: Mutex<PendingRegistration>,
    device_label: String,
}

impl AuthFlowOrchestrator {
    pub fn new(
        api: Arc<dyn AuthApi>,
        store: SessionStore,
        lifecycle: TokenLifecycleManager,
        permissions: Arc<PermissionCache>,
        context: SessionContext,
        device_label: String,
    ) -> Self {
        Self {
            api,
            store,
            lifecycle,
            permissions,
            context,
            pending: Mutex::new(PendingRegistration::default()),
            device_label,
        }
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Session> {
        self.context.subscribe()
    }

    pub fn session(&self) -> Session {
        self.context.snapshot()
    }

    /// Submit credentials together with the device identity and label.
    /// Tokens are not committed here; an OTP verification (or another
    /// authenticated entry path) finishes the flow.
    #[tracing::instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: Credentials) -> Result<LoginOutcome, EngineError> {
        let device_id = self.store.get_or_create_device_id()?;

        let req = LoginRequest {
            email: credentials.email,
            password: credentials.password,
            device_id: device_id.clone(),
            device_label: self.device_label.clone(),
        };
        req.validate()?;

        let resp = self.api.login(&req).await?;
        if !resp.success {
            return Err(EngineError::Authentication(anyhow::anyhow!(resp
                .message
                .unwrap_or_else(|| "Login rejected".to_string()))));
        }

        {
            let mut pending = self.lock_pending();
            pending.login = Some(LoginContext {
                email: req.email,
                password: req.password,
                device_id,
                submitted_at: Utc::now(),
            });
        }

        if resp.requires_verification {
            tracing::info!("Login accepted, awaiting OTP verification");
            Ok(LoginOutcome::OtpRequired)
        } else {
            tracing::info!("Login accepted without verification step");
            Ok(LoginOutcome::Accepted)
        }
    }

    /// Verify the OTP for the pending login. Fails fast without a network
    /// call when no login is pending.
    #[tracing::instrument(skip_all)]
    pub async fn verify_otp(&self, code: &str) -> Result<Session, EngineError> {
        let ctx = self.lock_pending().login.clone().ok_or_else(|| {
            EngineError::MissingContext("OTP verification requires a pending login".to_string())
        })?;

        if !policy::is_valid_otp(code) {
            return Err(EngineError::Authentication(anyhow::anyhow!(
                "OTP code must be 6 digits"
            )));
        }

        let req = VerifyOtpRequest {
            email: ctx.email,
            device_id: ctx.device_id,
            code: code.to_string(),
        };
        req.validate()?;

        let resp = self.api.verify_otp(&req).await?;
        let data = resp.data.ok_or_else(|| {
            EngineError::Authentication(anyhow::anyhow!(resp
                .message
                .unwrap_or_else(|| "OTP verification rejected".to_string())))
        })?;

        let pair = TokenPair::new(data.tokens.access, data.tokens.refresh);
        self.establish_session(pair, data.user).await
    }

    /// Re-issue the OTP against the same device and email. No state change.
    #[tracing::instrument(skip_all)]
    pub async fn resend_otp(&self) -> Result<(), EngineError> {
        let ctx = self.lock_pending().login.clone().ok_or_else(|| {
            EngineError::MissingContext("OTP resend requires a pending login".to_string())
        })?;

        self.api
            .resend_otp(&ResendOtpRequest {
                email: ctx.email,
                device_id: ctx.device_id,
            })
            .await?;
        Ok(())
    }

    /// Stage organization data for a later combined signup.
    pub fn stage_organization(&self, org: OrgRegistration) {
        self.lock_pending().organization = Some(org);
    }

    /// Submit the merged signup payload. Requires both the pending login
    /// data and the staged organization data; does not authenticate by
    /// itself.
    #[tracing::instrument(skip_all)]
    pub async fn complete_sign_up(&self) -> Result<(), EngineError> {
        let (login, org) = {
            let pending = self.lock_pending();
            (pending.login.clone(), pending.organization.clone())
        };

        let login = login.ok_or_else(|| {
            EngineError::MissingContext("Signup completion requires pending login data".to_string())
        })?;
        let org = org.ok_or_else(|| {
            EngineError::MissingContext(
                "Signup completion requires pending organization data".to_string(),
            )
        })?;

        policy::validate_password(&login.password)?;

        let req = SignUpRequest {
            email: login.email,
            password: login.password,
            device_id: login.device_id,
            device_label: self.device_label.clone(),
            organization: OrgRegistrationDto {
                name: org.name,
                organization_number: org.organization_number,
                invoice_email: org.invoice_email,
            },
        };
        req.validate()?;

        self.api.sign_up(&req).await?;
        tracing::info!("Combined signup submitted");
        Ok(())
    }

    /// Tear down the session. Idempotent: logging out while anonymous is a
    /// no-op. The server notification is best-effort.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), EngineError> {
        let access_token = self.store.access_token();
        if !self.context.snapshot().authenticated && access_token.is_none() {
            return Ok(());
        }

        if let Some(token) = access_token {
            if let Err(e) = self.api.logout(&token).await {
                tracing::warn!(error = %e, "Server logout notification failed");
            }
        }

        self.lifecycle.force_logout();
        self.permissions.clear();
        self.lock_pending().reset();
        tracing::info!("Session closed");
        Ok(())
    }

    /// Bootstrap re-entry: validate an externally held pair. Resolves to a
    /// bool on every path; a falsy or erroring response forces logout. Any
    /// pair returned by the backend is authoritative and overwrites the
    /// stored one.
    #[tracing::instrument(skip_all)]
    pub async fn verify_token(&self, access_token: &str, refresh_token: &str) -> bool {
        let req = VerifyTokenRequest {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        };

        match self.api.verify_token(&req).await {
            Ok(resp) if resp.valid => {
                let pair = TokenPair::new(
                    resp.access_token
                        .unwrap_or_else(|| access_token.to_string()),
                    resp.refresh_token
                        .unwrap_or_else(|| refresh_token.to_string()),
                );
                if let Err(e) = self.lifecycle.commit_tokens(&pair) {
                    tracing::warn!(error = %e, "Failed to commit verified tokens");
                    self.lifecycle.force_logout();
                    return false;
                }
                self.context.set_authenticated(resp.user);
                if let Err(e) = self.permissions.load().await {
                    tracing::warn!(error = %e, "Permission load after token verification failed");
                }
                true
            }
            Ok(_) => {
                tracing::info!("Stored tokens rejected by backend");
                self.lifecycle.force_logout();
                self.permissions.clear();
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token verification failed");
                self.lifecycle.force_logout();
                self.permissions.clear();
                false
            }
        }
    }

    /// URL a browser is sent to for OAuth initiation.
    pub fn google_auth_url(&self) -> String {
        self.api.google_auth_url()
    }

    /// OAuth callback: commit the provided pair, then fetch the profile.
    /// A profile-fetch failure rolls the session back to anonymous rather
    /// than leaving it half-authenticated.
    #[tracing::instrument(skip_all)]
    pub async fn handle_google_callback(&self, pair: TokenPair) -> Result<Session, EngineError> {
        self.lifecycle.commit_tokens(&pair)?;

        match self.api.profile_detail(&pair.access_token).await {
            Ok(user) => {
                self.context.set_authenticated(Some(user));
                if let Err(e) = self.permissions.load().await {
                    tracing::warn!(error = %e, "Permission load after OAuth callback failed");
                }
                Ok(self.context.snapshot())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile fetch after OAuth callback failed, rolling back");
                self.lifecycle.force_logout();
                Err(e)
            }
        }
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), EngineError> {
        let req = ForgotPasswordRequest {
            email: email.to_string(),
        };
        req.validate()?;
        self.api.forgot_password(&req).await?;
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), EngineError> {
        policy::validate_password(new_password)?;
        let req = ResetPasswordRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        req.validate()?;
        self.api.reset_password(&req).await?;
        Ok(())
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), EngineError> {
        let access_token = self.require_access_token()?;
        policy::validate_password(new_password)?;
        let req = ChangePasswordRequest {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        req.validate()?;
        self.api.change_password(&access_token, &req).await?;
        Ok(())
    }

    /// Fetch the profile for the current session and refresh the observed
    /// user details.
    pub async fn fetch_profile(&self) -> Result<UserDetails, EngineError> {
        let access_token = self.require_access_token()?;
        let user = self.api.profile_detail(&access_token).await?;
        if self.context.snapshot().authenticated {
            self.context.set_authenticated(Some(user.clone()));
        }
        Ok(user)
    }

    /// Delete the account server-side, then tear the session down locally.
    #[tracing::instrument(skip(self))]
    pub async fn delete_account(&self) -> Result<(), EngineError> {
        let access_token = self.require_access_token()?;
        self.api.delete_account(&access_token).await?;

        self.lifecycle.force_logout();
        self.permissions.clear();
        self.lock_pending().reset();
        tracing::info!("Account deleted, session closed");
        Ok(())
    }

    async fn establish_session(
        &self,
        pair: TokenPair,
        user: Option<UserDetails>,
    ) -> Result<Session, EngineError> {
        // Tokens are committed before the permission reload, so permission
        // queries never observe authorization newer than the token that
        // authorized it.
        self.lifecycle.commit_tokens(&pair)?;
        self.context.set_authenticated(user);

        if let Err(e) = self.permissions.load().await {
            tracing::warn!(error = %e, "Permission load after authentication failed");
        }

        tracing::info!("Session authenticated");
        Ok(self.context.snapshot())
    }

    /// Access token for an authenticated call. Expired or undecodable
    /// tokens fail here instead of producing a doomed network request.
    fn require_access_token(&self) -> Result<String, EngineError> {
        let token = self.store.access_token().ok_or_else(|| {
            EngineError::Authentication(anyhow::anyhow!("No authenticated session"))
        })?;
        TokenInspector::ensure_fresh(&token)?;
        Ok(token)
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, PendingRegistration> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
