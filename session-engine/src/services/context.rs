//! Observable session state shared between the orchestrator and the token
//! lifecycle manager. Consumers subscribe; nothing reads globals.

use crate::models::{Session, UserDetails};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct SessionContext {
    tx: Arc<watch::Sender<Session>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::anonymous());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn set_authenticated(&self, user: Option<UserDetails>) {
        self.tx.send_replace(Session::authenticated(user));
    }

    pub fn set_anonymous(&self) {
        self.tx.send_replace(Session::anonymous());
    }
}
