//! Request/response contracts for the authentication backend.

use crate::models::UserDetails;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub device_id: String,
    pub device_label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub requires_verification: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResendOtpRequest {
    pub email: String,
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub device_id: String,

    #[validate(length(min = 6, max = 6, message = "OTP code must be 6 digits"))]
    pub code: String,
}

/// Token pair as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPairDto {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOtpData {
    pub tokens: TokenPairDto,
    #[serde(default)]
    pub user: Option<UserDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOtpResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<VerifyOtpData>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyTokenRequest {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    /// When present, the rotated pair is authoritative and replaces the
    /// submitted one.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub device_id: String,
    pub device_label: String,
    pub organization: OrgRegistrationDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrgRegistrationDto {
    pub name: String,
    pub organization_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Generic acknowledgement body.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}
