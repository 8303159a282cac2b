//! Wire contracts for the BankID-style signature provider.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct BankIdSignRequest {
    pub end_user_ip: String,
    pub user_visible_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_non_visible_data: Option<String>,
    pub env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankIdSignResponse {
    pub order_ref: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankIdCollectRequest {
    pub order_ref: String,
    pub env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankIdCollectResponse {
    pub status: String,
    #[serde(default)]
    pub hint_code: Option<String>,
}
