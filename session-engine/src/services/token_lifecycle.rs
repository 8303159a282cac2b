//! Access-token expiry tracking, proactive refresh scheduling, and the
//! single-flight refresh exchange.
//!
//! One timer is live at most at any moment; arming a new one invalidates
//! the previous handle. A generation counter is bumped on every token
//! commit and on logout, so a refresh that resolves after logout is
//! discarded instead of re-authenticating the session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::dtos::auth::RefreshTokenRequest;
use crate::models::TokenPair;
use crate::services::{AuthApi, EngineError, SessionContext, SessionStore, TokenInspector};

struct TimerHandle {
    id: u64,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
pub struct TokenLifecycleManager {
    api: Arc<dyn AuthApi>,
    store: SessionStore,
    context: SessionContext,
    lead_millis: i64,
    generation: Arc<AtomicU64>,
    refresh_gate: Arc<tokio::sync::Mutex<()>>,
    timer: Arc<Mutex<Option<TimerHandle>>>,
    timer_seq: Arc<AtomicU64>,
}

impl TokenLifecycleManager {
    pub fn new(
        api: Arc<dyn AuthApi>,
        store: SessionStore,
        context: SessionContext,
        lead_seconds: i64,
    ) -> Self {
        Self {
            api,
            store,
            context,
            lead_millis: lead_seconds * 1000,
            generation: Arc::new(AtomicU64::new(0)),
            refresh_gate: Arc::new(tokio::sync::Mutex::new(())),
            timer: Arc::new(Mutex::new(None)),
            timer_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// True when the token is past its deadline or cannot be decoded.
    pub fn is_expired(&self, token: &str) -> bool {
        TokenInspector::is_expired(token)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Persist a fresh pair and arm the next scheduled refresh. The caller
    /// remains responsible for reloading permissions afterwards.
    pub fn commit_tokens(&self, pair: &TokenPair) -> Result<(), EngineError> {
        self.store.store_tokens(pair)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.schedule_refresh();
        Ok(())
    }

    /// Arm a one-shot refresh timer firing `lead` before access-token
    /// expiry; a non-positive delay fires immediately. Any previously
    /// armed timer is invalidated first.
    pub fn schedule_refresh(&self) {
        let mut slot = self
            .timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(prev) = slot.take() {
            prev.handle.abort();
        }

        let Some(access_token) = self.store.access_token() else {
            return;
        };

        // Undecodable tokens are treated as already expired
        let expires_in = TokenInspector::expires_in_millis(&access_token).unwrap_or(0);
        let delay = Duration::from_millis((expires_in - self.lead_millis).max(0) as u64);
        let id = self.timer_seq.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::debug!(delay_ms = delay.as_millis() as u64, "Refresh timer armed");

        let manager = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // A superseded timer bails out even if its abort raced the fire
            {
                let mut slot = manager
                    .timer
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let is_current = slot.as_ref().map(|current| current.id == id).unwrap_or(false);
                if !is_current {
                    return;
                }
                slot.take();
            }

            if manager.store.refresh_token().is_some() {
                if let Err(e) = manager.refresh().await {
                    tracing::warn!(error = %e, "Scheduled refresh did not complete");
                }
            } else {
                tracing::warn!("No refresh token available at refresh time, logging out");
                manager.force_logout();
            }
        });

        *slot = Some(TimerHandle { id, handle });
    }

    /// Exchange the refresh token for a new pair.
    ///
    /// Single-flight: a concurrent caller waits for the in-progress
    /// exchange and shares its outcome instead of issuing a duplicate
    /// network call. Any failure degrades the session to anonymous.
    pub async fn refresh(&self) -> Result<TokenPair, EngineError> {
        let entry_generation = self.generation.load(Ordering::SeqCst);
        let _guard = self.refresh_gate.lock().await;

        if self.generation.load(Ordering::SeqCst) != entry_generation {
            // Another refresh (or a logout) completed while we waited
            return self.store.token_pair().ok_or_else(|| {
                EngineError::Authentication(anyhow::anyhow!("Session closed during refresh"))
            });
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            self.force_logout();
            return Err(EngineError::Authentication(anyhow::anyhow!(
                "No refresh token available"
            )));
        };

        let result = self
            .api
            .refresh_token(&RefreshTokenRequest { refresh_token })
            .await;

        if self.generation.load(Ordering::SeqCst) != entry_generation {
            tracing::debug!("Discarding refresh outcome that resolved after logout");
            return Err(EngineError::Authentication(anyhow::anyhow!(
                "Session closed during refresh"
            )));
        }

        match result {
            Ok(resp) => {
                let pair = TokenPair::new(resp.access_token, resp.refresh_token);
                self.store.store_tokens(&pair)?;
                self.generation.fetch_add(1, Ordering::SeqCst);
                self.schedule_refresh();
                tracing::info!("Access token refreshed");
                Ok(pair)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, degrading to anonymous");
                self.force_logout();
                Err(e)
            }
        }
    }

    /// Cancel the pending timer without touching tokens or session state.
    pub fn cancel_scheduled_refresh(&self) {
        let mut slot = self
            .timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(prev) = slot.take() {
            prev.handle.abort();
        }
    }

    /// Local teardown: cancel the timer, invalidate in-flight refreshes,
    /// clear stored tokens, and mark the session anonymous. Server-side
    /// logout notification is the orchestrator's concern.
    pub fn force_logout(&self) {
        self.cancel_scheduled_refresh();
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.store.clear_tokens() {
            tracing::warn!(error = %e, "Failed to clear tokens during logout");
        }
        self.context.set_anonymous();
    }
}
