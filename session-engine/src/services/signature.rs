//! BankID-style e-signature ceremonies.
//!
//! `sign` opens an order with the provider; `collect_status` is a single
//! poll driven entirely by the caller. The collector never sleeps, retries,
//! or polls on its own, and terminal order states are sticky: a new attempt
//! needs a fresh order.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::dtos::signature::{
    BankIdCollectRequest, BankIdCollectResponse, BankIdSignRequest, BankIdSignResponse,
};
use crate::models::{SignatureOrder, SignatureStatus};
use crate::services::EngineError;

#[async_trait]
pub trait BankIdApi: Send + Sync {
    async fn sign(&self, req: &BankIdSignRequest) -> Result<BankIdSignResponse, EngineError>;
    async fn collect(&self, req: &BankIdCollectRequest)
        -> Result<BankIdCollectResponse, EngineError>;
}

/// Reqwest-backed client for the signature endpoints.
#[derive(Clone)]
pub struct HttpBankIdApi {
    client: Client,
    base_url: String,
}

impl HttpBankIdApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl BankIdApi for HttpBankIdApi {
    async fn sign(&self, req: &BankIdSignRequest) -> Result<BankIdSignResponse, EngineError> {
        let url = format!("{}/api/agreements/bankid-sign", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = %status, "BankID sign response");

        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(EngineError::SignatureFailed(format!(
                "Sign order rejected ({}): {}",
                status, body
            )))
        }
    }

    async fn collect(
        &self,
        req: &BankIdCollectRequest,
    ) -> Result<BankIdCollectResponse, EngineError> {
        let url = format!("{}/api/agreements/bankid-collect", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = %status, "BankID collect response");

        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(EngineError::Network(anyhow::anyhow!(
                "Collect failed ({}): {}",
                status,
                body
            )))
        }
    }
}

/// Scripted in-memory provider double used by tests.
#[derive(Default)]
pub struct MockBankIdApi {
    pub sign_responses: Mutex<std::collections::VecDeque<Result<BankIdSignResponse, String>>>,
    pub collect_responses: Mutex<std::collections::VecDeque<Result<BankIdCollectResponse, String>>>,
    pub collect_calls: Mutex<u32>,
}

impl MockBankIdApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_sign(&self, response: Result<BankIdSignResponse, String>) {
        self.sign_responses.lock().unwrap().push_back(response);
    }

    pub fn push_collect(&self, response: Result<BankIdCollectResponse, String>) {
        self.collect_responses.lock().unwrap().push_back(response);
    }
}

#[async_trait]
impl BankIdApi for MockBankIdApi {
    async fn sign(&self, _req: &BankIdSignRequest) -> Result<BankIdSignResponse, EngineError> {
        self.sign_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err("No scripted sign response".to_string()))
            .map_err(|msg| EngineError::SignatureFailed(msg))
    }

    async fn collect(
        &self,
        _req: &BankIdCollectRequest,
    ) -> Result<BankIdCollectResponse, EngineError> {
        *self.collect_calls.lock().unwrap() += 1;
        self.collect_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err("No scripted collect response".to_string()))
            .map_err(|msg| EngineError::Network(anyhow::anyhow!(msg)))
    }
}

/// Order book for signing ceremonies. A pure state responder: transitions
/// happen only on explicit `collect_status` calls.
pub struct SignatureCollector {
    api: Arc<dyn BankIdApi>,
    env: String,
    orders: Mutex<HashMap<String, SignatureStatus>>,
}

impl SignatureCollector {
    pub fn new(api: Arc<dyn BankIdApi>, env: impl Into<String>) -> Self {
        Self {
            api,
            env: env.into(),
            orders: Mutex::new(HashMap::new()),
        }
    }

    /// Open a signing ceremony; the returned order starts out `Pending`.
    #[tracing::instrument(skip(self, visible_data, non_visible_data))]
    pub async fn sign(
        &self,
        end_user_ip: &str,
        visible_data: &str,
        non_visible_data: Option<&str>,
    ) -> Result<SignatureOrder, EngineError> {
        // The provider expects the signing texts base64-encoded
        let req = BankIdSignRequest {
            end_user_ip: end_user_ip.to_string(),
            user_visible_data: BASE64.encode(visible_data),
            user_non_visible_data: non_visible_data.map(|s| BASE64.encode(s)),
            env: self.env.clone(),
        };

        let resp = self.api.sign(&req).await?;
        let order = SignatureOrder::pending(resp.order_ref.clone());

        self.lock_orders()
            .insert(resp.order_ref.clone(), SignatureStatus::Pending);
        tracing::info!(order_ref = %resp.order_ref, "Signature order opened");

        Ok(order)
    }

    /// One poll of the provider. Terminal orders answer from the book
    /// without a network call; pending orders poll once and record the
    /// provider's answer.
    #[tracing::instrument(skip(self))]
    pub async fn collect_status(&self, order_ref: &str) -> Result<SignatureOrder, EngineError> {
        let current = self.lock_orders().get(order_ref).copied().ok_or_else(|| {
            EngineError::MissingContext(format!("Unknown signature order {}", order_ref))
        })?;

        if current.is_terminal() {
            return Ok(SignatureOrder {
                order_ref: order_ref.to_string(),
                status: current,
            });
        }

        let req = BankIdCollectRequest {
            order_ref: order_ref.to_string(),
            env: self.env.clone(),
        };
        let resp = self.api.collect(&req).await?;
        let status = map_provider_status(&resp);

        self.lock_orders().insert(order_ref.to_string(), status);
        if status.is_terminal() {
            tracing::info!(order_ref = %order_ref, status = ?status, "Signature order settled");
        }

        Ok(SignatureOrder {
            order_ref: order_ref.to_string(),
            status,
        })
    }

    fn lock_orders(&self) -> std::sync::MutexGuard<'_, HashMap<String, SignatureStatus>> {
        self.orders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn map_provider_status(resp: &BankIdCollectResponse) -> SignatureStatus {
    match resp.status.as_str() {
        "pending" => SignatureStatus::Pending,
        "complete" => SignatureStatus::Complete,
        "failed" => match resp.hint_code.as_deref() {
            Some("expiredTransaction") => SignatureStatus::Expired,
            _ => SignatureStatus::Failed,
        },
        other => {
            tracing::warn!(status = %other, "Unrecognized provider status, treating as failed");
            SignatureStatus::Failed
        }
    }
}
