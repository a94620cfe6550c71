use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::debug;
use uuid::Uuid;

use roam_types::events::GatewayEvent;

/// Who receives a newly persisted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryScope {
    /// Every session of the sender and of the receiver.
    #[default]
    Participants,
    /// Every connected session; each one filters for itself.
    All,
}

impl FromStr for DeliveryScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "participants" => Ok(Self::Participants),
            "all" => Ok(Self::All),
            other => Err(anyhow::anyhow!(
                "unknown delivery scope '{}', expected 'participants' or 'all'",
                other
            )),
        }
    }
}

/// Connection registry plus delivery.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    scope: DeliveryScope,

    /// Broadcast channel: every subscribed session receives every event
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// session_id -> (user_id, targeted sender). A user may hold several sessions.
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

struct SessionHandle {
    user_id: Uuid,
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DeliveryScope::default())
    }
}

impl Dispatcher {
    pub fn new(scope: DeliveryScope) -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                scope,
                broadcast_tx,
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to broadcast events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all subscribed sessions. Returns how many receivers it reached.
    pub fn broadcast(&self, event: GatewayEvent) -> usize {
        self.inner.broadcast_tx.send(event).unwrap_or(0)
    }

    /// Register a session for `user_id`. Returns (session_id, receiver).
    pub async fn register(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .sessions
            .write()
            .await
            .insert(session_id, SessionHandle { user_id, tx });
        (session_id, rx)
    }

    pub async fn unregister(&self, session_id: Uuid) {
        self.inner.sessions.write().await.remove(&session_id);
    }

    pub async fn send_to_session(&self, session_id: Uuid, event: GatewayEvent) -> bool {
        let sessions = self.inner.sessions.read().await;
        sessions
            .get(&session_id)
            .is_some_and(|handle| handle.tx.send(event).is_ok())
    }

    /// Send to every session of `user_id`. Returns how many sessions got it.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) -> usize {
        self.send_to_users(&[user_id], event).await
    }

    async fn send_to_users(&self, user_ids: &[Uuid], event: GatewayEvent) -> usize {
        let sessions = self.inner.sessions.read().await;
        sessions
            .values()
            .filter(|handle| user_ids.contains(&handle.user_id))
            .filter(|handle| handle.tx.send(event.clone()).is_ok())
            .count()
    }

    /// Deliver an event according to the configured scope. Events without
    /// participants are broadcast in either scope.
    pub async fn deliver(&self, event: GatewayEvent) -> usize {
        let delivered = match (self.inner.scope, event.participants()) {
            (DeliveryScope::Participants, Some(users)) => self.send_to_users(&users, event).await,
            _ => self.broadcast(event),
        };
        debug!("Delivered event to {} session(s)", delivered);
        delivered
    }

    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    pub async fn sessions_for(&self, user_id: Uuid) -> Vec<Uuid> {
        self.inner
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, handle)| handle.user_id == user_id)
            .map(|(id, _)| *id)
            .collect()
    }
}
