use uuid::Uuid;

use roam_types::events::GatewayEvent;

/// Per-connection state. Lives only as long as the WebSocket; after a
/// reconnect the client re-syncs through the chat summaries endpoint.
#[derive(Debug)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: Uuid,
    new_message: bool,
}

impl Session {
    pub fn new(session_id: Uuid, user_id: Uuid) -> Self {
        Self {
            session_id,
            user_id,
            new_message: false,
        }
    }

    pub fn has_new_message(&self) -> bool {
        self.new_message
    }

    /// Inspect an event on its way to the client. A message addressed to
    /// this user raises the badge; the badge event is returned only on the
    /// transition so the client is not spammed.
    pub fn on_delivered(&mut self, event: &GatewayEvent) -> Option<GatewayEvent> {
        match event {
            GatewayEvent::ReceiveMessage(msg) if msg.receiver_id == self.user_id => {
                if self.new_message {
                    None
                } else {
                    self.new_message = true;
                    Some(GatewayEvent::NewMessageBadge { pending: true })
                }
            }
            _ => None,
        }
    }

    /// The user opened the inbox.
    pub fn open_inbox(&mut self) -> Option<GatewayEvent> {
        if std::mem::replace(&mut self.new_message, false) {
            Some(GatewayEvent::NewMessageBadge { pending: false })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use roam_types::models::ChatMessage;

    fn message(sender_id: Uuid, receiver_id: Uuid) -> GatewayEvent {
        GatewayEvent::ReceiveMessage(ChatMessage {
            id: Uuid::new_v4(),
            thread_id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            body: "hi".into(),
            is_read: false,
            seq: 1,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn badge_raised_once_for_own_messages() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut session = Session::new(Uuid::new_v4(), me);

        assert!(session.on_delivered(&message(me, other)).is_none());
        assert!(!session.has_new_message());

        assert!(matches!(
            session.on_delivered(&message(other, me)),
            Some(GatewayEvent::NewMessageBadge { pending: true })
        ));
        assert!(session.on_delivered(&message(other, me)).is_none());
        assert!(session.has_new_message());
    }

    #[test]
    fn messages_between_others_are_ignored() {
        let mut session = Session::new(Uuid::new_v4(), Uuid::new_v4());
        assert!(session.on_delivered(&message(Uuid::new_v4(), Uuid::new_v4())).is_none());
        assert!(!session.has_new_message());
    }

    #[test]
    fn opening_inbox_clears_badge() {
        let me = Uuid::new_v4();
        let mut session = Session::new(Uuid::new_v4(), me);
        assert!(session.open_inbox().is_none());

        session.on_delivered(&message(Uuid::new_v4(), me));
        assert!(matches!(
            session.open_inbox(),
            Some(GatewayEvent::NewMessageBadge { pending: false })
        ));
        assert!(!session.has_new_message());
        assert!(session.open_inbox().is_none());
    }
}
