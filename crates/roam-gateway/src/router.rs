use std::sync::Arc;

use tracing::{debug, error, info};
use uuid::Uuid;

use roam_db::{Database, StoreError};
use roam_types::events::{GatewayEvent, SendMessage};
use roam_types::models::{ChatMessage, ChatSummary, ChatThread};

use crate::dispatcher::Dispatcher;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Persists chat messages and hands them to the dispatcher.
#[derive(Clone)]
pub struct MessageRouter {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl MessageRouter {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run a store call off the async runtime.
    pub async fn blocking<F, T>(&self, f: F) -> Result<T, RouterError>
    where
        F: FnOnce(&Database) -> roam_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        Ok(tokio::task::spawn_blocking(move || f(&*db)).await??)
    }

    /// Persist the message (creating the thread if needed), then deliver it.
    /// Delivery only happens after the write has committed.
    pub async fn send_message(&self, send: SendMessage) -> Result<ChatMessage, RouterError> {
        let SendMessage {
            sender_id,
            receiver_id,
            message,
            match_ref,
        } = send;

        let appended = self
            .blocking(move |db| db.append_message(sender_id, receiver_id, &message, match_ref.as_ref()))
            .await?;

        if appended.thread_created {
            info!(
                "Created thread {} for {} and {}",
                appended.message.thread_id, sender_id, receiver_id
            );
        }
        debug!(
            "Stored message {} (#{}) in thread {}",
            appended.message.id, appended.message.seq, appended.message.thread_id
        );

        self.dispatcher
            .deliver(GatewayEvent::ReceiveMessage(appended.message.clone()))
            .await;

        Ok(appended.message)
    }

    /// Fire-and-forget variant used by the realtime path: failures are
    /// logged and the sender gets nothing back.
    pub async fn dispatch_send(&self, send: SendMessage) {
        let (sender_id, receiver_id) = (send.sender_id, send.receiver_id);
        if let Err(e) = self.send_message(send).await {
            error!(
                "Dropping message from {} to {}: {}",
                sender_id, receiver_id, e
            );
        }
    }

    pub async fn fetch_messages(&self, a: Uuid, b: Uuid) -> Result<ChatThread, RouterError> {
        self.blocking(move |db| db.get_thread(a, b)).await
    }

    pub async fn fetch_chat_summaries(&self, user_id: Uuid) -> Result<Vec<ChatSummary>, RouterError> {
        self.blocking(move |db| db.chat_summaries(user_id)).await
    }

    pub async fn mark_read(&self, message_ids: Vec<Uuid>) -> Result<usize, RouterError> {
        self.blocking(move |db| db.mark_read(&message_ids)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DeliveryScope;

    fn router(scope: DeliveryScope) -> MessageRouter {
        let db = Arc::new(Database::open_in_memory().unwrap());
        MessageRouter::new(db, Dispatcher::new(scope))
    }

    fn send(sender_id: Uuid, receiver_id: Uuid, message: &str) -> SendMessage {
        SendMessage {
            sender_id,
            receiver_id,
            message: message.to_string(),
            match_ref: None,
        }
    }

    #[tokio::test]
    async fn send_persists_then_reaches_receiver() {
        let router = router(DeliveryScope::Participants);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (_, mut b_rx) = router.dispatcher().register(b).await;

        let stored = router.send_message(send(a, b, "hi")).await.unwrap();

        match b_rx.recv().await.unwrap() {
            GatewayEvent::ReceiveMessage(msg) => {
                assert_eq!(msg, stored);
                assert_eq!(msg.receiver_id, b);
                assert!(!msg.is_read);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let thread = router.fetch_messages(b, a).await.unwrap();
        assert_eq!(thread.messages, vec![stored]);
    }

    #[tokio::test]
    async fn conversation_scenario() {
        let router = router(DeliveryScope::All);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let hi = router.send_message(send(a, b, "hi")).await.unwrap();
        router.send_message(send(b, a, "hello")).await.unwrap();

        let thread = router.fetch_messages(a, b).await.unwrap();
        let bodies: Vec<&str> = thread.messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["hi", "hello"]);

        let inbox = router.fetch_chat_summaries(b).await.unwrap();
        assert_eq!(inbox[0].last_message.as_deref(), Some("hello"));
        assert_eq!(inbox[0].unread_count, 1);

        assert_eq!(router.mark_read(vec![hi.id]).await.unwrap(), 1);
        assert_eq!(router.fetch_chat_summaries(b).await.unwrap()[0].unread_count, 0);
    }

    #[tokio::test]
    async fn concurrent_first_sends_share_one_thread() {
        let router = router(DeliveryScope::Participants);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let router = router.clone();
                let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
                tokio::spawn(async move { router.send_message(send(from, to, "race")).await.unwrap() })
            })
            .collect();

        let mut thread_ids = Vec::new();
        for task in tasks {
            thread_ids.push(task.await.unwrap().thread_id);
        }
        thread_ids.dedup();
        assert_eq!(thread_ids.len(), 1);
        assert_eq!(router.fetch_messages(a, b).await.unwrap().messages.len(), 8);
    }

    #[tokio::test]
    async fn failed_send_is_dropped_silently() {
        let router = router(DeliveryScope::All);
        let a = Uuid::new_v4();
        let mut rx = router.dispatcher().subscribe();

        router.dispatch_send(send(a, a, "to myself")).await;

        assert!(rx.try_recv().is_err());
        assert!(matches!(
            router.fetch_messages(a, Uuid::new_v4()).await,
            Err(RouterError::Store(StoreError::NotFound(_)))
        ));
    }
}
