use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, info, warn};
use uuid::Uuid;

use roam_types::api::Claims;
use roam_types::events::{GatewayCommand, GatewayEvent};

use crate::router::MessageRouter;
use crate::session::Session;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

type SharedSession = Arc<Mutex<Session>>;

/// Handle a single WebSocket connection: Identify handshake, then the
/// event loop until either side goes away.
pub async fn handle_connection(socket: WebSocket, router: MessageRouter, jwt_secret: String) {
    let (mut sender, mut receiver) = socket.split();

    // Step 1: Wait for Identify command with JWT
    let Some(user_id) = wait_for_identify(&mut receiver, &jwt_secret).await else {
        warn!("WebSocket client failed to identify, closing");
        return;
    };

    // Step 2: Register the session and send Ready
    let dispatcher = router.dispatcher().clone();
    let (session_id, mut user_rx) = dispatcher.register(user_id).await;
    info!(
        "{} connected to gateway (session {}, {} open for this user)",
        user_id,
        session_id,
        dispatcher.sessions_for(user_id).await.len()
    );

    let ready = GatewayEvent::Ready { user_id, session_id };
    if !send_event(&mut sender, &ready).await {
        dispatcher.unregister(session_id).await;
        return;
    }

    let session: SharedSession = Arc::new(Mutex::new(Session::new(session_id, user_id)));
    let send_session = session.clone();

    let mut broadcast_rx = dispatcher.subscribe();

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward broadcasts + targeted events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Broadcast receiver lagged by {} messages", n);
                            continue;
                        }
                        Err(_) => break,
                    };
                    if !forward(&mut sender, &send_session, event).await {
                        break;
                    }
                }
                result = user_rx.recv() => {
                    let Some(event) = result else { break };
                    if !forward(&mut sender, &send_session, event).await {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let recv_router = router.clone();
    let recv_session = session.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(text.as_str()) {
                    Ok(cmd) => handle_command(&recv_router, &recv_session, user_id, cmd).await,
                    Err(e) => {
                        let raw: String = text.as_str().chars().take(200).collect();
                        warn!("{} bad command: {} -- raw: {}", user_id, e, raw);
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister(session_id).await;
    info!(
        "{} disconnected from gateway (session {}, {} session(s) remain)",
        user_id,
        session_id,
        dispatcher.session_count().await
    );
}

/// Verify an Identify token and return the user it names.
pub fn verify_token(token: &str, jwt_secret: &str) -> Option<Uuid> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims.sub)
}

async fn wait_for_identify(receiver: &mut SplitStream<WebSocket>, jwt_secret: &str) -> Option<Uuid> {
    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(text.as_str())
                {
                    return verify_token(&token, jwt_secret);
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify).await.ok().flatten()
}

async fn handle_command(router: &MessageRouter, session: &SharedSession, user_id: Uuid, cmd: GatewayCommand) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::SendMessage(send) => {
            if send.sender_id != user_id {
                warn!(
                    "{} tried to send as {}, dropping message",
                    user_id, send.sender_id
                );
                return;
            }

            // Each send is its own task: a disconnect does not cancel a
            // write that is already under way.
            let router = router.clone();
            tokio::spawn(async move { router.dispatch_send(send).await });
        }

        GatewayCommand::OpenInbox => {
            let (session_id, cleared) = {
                let mut session = lock(session);
                (session.session_id, session.open_inbox())
            };
            if let Some(event) = cleared {
                debug!("{} opened inbox, clearing badge", user_id);
                router.dispatcher().send_to_session(session_id, event).await;
            }
        }
    }
}

/// Send an event, plus the badge change it triggers for this session.
async fn forward(
    sender: &mut SplitSink<WebSocket, Message>,
    session: &SharedSession,
    event: GatewayEvent,
) -> bool {
    for frame in outgoing(session, event) {
        if !send_event(sender, &frame).await {
            return false;
        }
    }
    true
}

/// The frames one delivered event turns into for this session.
fn outgoing(session: &SharedSession, event: GatewayEvent) -> Vec<GatewayEvent> {
    let badge = lock(session).on_delivered(&event);
    std::iter::once(event).chain(badge).collect()
}

async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &GatewayEvent) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to serialize gateway event: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}

fn lock(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
