//! Connection lifecycle and inbound event dispatch.
//!
//! A connection authenticates before the upgrade, joins its personal channel,
//! is marked online, then loops over inbound frames until close. Per-action
//! failures go back to the acting connection as `error` frames; only a failed
//! online-mark tears the connection down.

use crate::error::AppError;
use crate::middleware::auth::{verify_token, AuthUser};
use crate::services::message::DEFAULT_HISTORY_LIMIT;
use crate::state::AppState;
use crate::websocket::events::ServerEvent;
use crate::websocket::message_types::ClientEvent;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Identity for one live connection, fixed at authentication time.
#[derive(Debug, Clone)]
pub struct ConnContext {
    pub conn_id: Uuid,
    pub user: AuthUser,
}

fn authenticate(
    state: &AppState,
    params: &WsParams,
    headers: &HeaderMap,
) -> Result<AuthUser, AppError> {
    let token = params.token.clone().or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    });
    match token {
        None => Err(AppError::Unauthenticated),
        Some(token) => verify_token(&state.config.jwt_secret, &token),
    }
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // A failed verification refuses the upgrade; no handler ever runs.
    let user = match authenticate(&state, &params, &headers) {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "websocket connection rejected");
            return e.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(state, user, socket))
}

async fn handle_socket(state: AppState, user: AuthUser, mut socket: WebSocket) {
    let ctx = ConnContext {
        conn_id: Uuid::new_v4(),
        user,
    };

    let mut rx = state.registry.register(ctx.conn_id).await;
    // Personal channel: any component can reach this user by id without
    // knowing which connections they hold.
    state.registry.join(ctx.conn_id, ctx.user.id).await;

    if let Err(e) = state.presence.mark_online(ctx.user.id).await {
        // The identity no longer maps to a user row; do not leave a
        // half-established connection behind.
        tracing::warn!(user_id = %ctx.user.id, error = %e, "presence update failed, closing connection");
        state.registry.unregister(ctx.conn_id).await;
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    state
        .router
        .broadcast_others(
            ctx.conn_id,
            &ServerEvent::UserStatusChange {
                user_id: ctx.user.id,
                is_online: true,
                last_seen: None,
            },
        )
        .await;
    tracing::info!(user_id = %ctx.user.id, username = %ctx.user.username, "connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&state, &ctx, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by the framework
                    Some(Err(_)) => break,
                }
            }
        }
    }

    // Disconnect path: best effort, the peer is already gone.
    state.registry.unregister(ctx.conn_id).await;
    match state.presence.mark_offline(ctx.user.id).await {
        Ok(last_seen) => {
            state
                .router
                .broadcast_others(
                    ctx.conn_id,
                    &ServerEvent::UserStatusChange {
                        user_id: ctx.user.id,
                        is_online: false,
                        last_seen: Some(last_seen),
                    },
                )
                .await;
        }
        Err(e) => {
            tracing::debug!(user_id = %ctx.user.id, error = %e, "offline mark failed on disconnect");
        }
    }
    tracing::info!(user_id = %ctx.user.id, "disconnected");
}

async fn handle_frame(state: &AppState, ctx: &ConnContext, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(user_id = %ctx.user.id, error = %e, "ignoring malformed client frame");
            return;
        }
    };

    if let Err(e) = dispatch(state, ctx, event).await {
        if e.status_code() >= 500 {
            tracing::error!(user_id = %ctx.user.id, error = %e, "event handler failed");
        }
        // Report to the acting client only; the connection stays up. The
        // message goes through the same mapping as HTTP responses so server
        // error detail stays in the logs.
        let (_, body) = crate::middleware::error_handling::map_error(&e);
        state
            .router
            .emit_to_conn(
                ctx.conn_id,
                &ServerEvent::Error {
                    message: body.message,
                },
            )
            .await;
    }
}

/// Typed event router: one arm per inbound event kind, checked for
/// exhaustiveness at compile time.
pub async fn dispatch(
    state: &AppState,
    ctx: &ConnContext,
    event: ClientEvent,
) -> Result<(), AppError> {
    match event {
        ClientEvent::JoinConversation { recipient_id } => {
            handle_join(state, ctx, recipient_id).await
        }
        ClientEvent::SendMessage {
            conversation_id,
            message,
            recipient_id,
            reply_to_id,
        } => handle_send(state, ctx, conversation_id, &message, recipient_id, reply_to_id).await,
        ClientEvent::DeleteMessage { message_id, .. } => {
            let record = state.messages.delete_message(ctx.user.id, message_id).await?;
            state.router.fan_out_deleted_message(&record).await;
            Ok(())
        }
        ClientEvent::MarkAsRead {
            conversation_id,
            recipient_id,
        } => handle_mark_read(state, ctx, conversation_id, recipient_id).await,
        ClientEvent::Typing {
            conversation_id,
            recipient_id,
        } => {
            // Pure relay; the server keeps no typing state.
            state
                .router
                .emit_to_room(
                    recipient_id,
                    &ServerEvent::UserTyping {
                        conversation_id,
                        user_id: ctx.user.id,
                    },
                )
                .await;
            Ok(())
        }
        ClientEvent::StopTyping {
            conversation_id,
            recipient_id,
        } => {
            state
                .router
                .emit_to_room(
                    recipient_id,
                    &ServerEvent::UserStopTyping {
                        conversation_id,
                        user_id: ctx.user.id,
                    },
                )
                .await;
            Ok(())
        }
    }
}

async fn handle_join(
    state: &AppState,
    ctx: &ConnContext,
    recipient_id: Uuid,
) -> Result<(), AppError> {
    let conversation = state
        .conversations
        .resolve_or_create(ctx.user.id, recipient_id)
        .await?;

    state.registry.join(ctx.conn_id, conversation.id).await;

    state
        .router
        .emit_to_conn(
            ctx.conn_id,
            &ServerEvent::ConversationJoined {
                conversation_id: conversation.id,
            },
        )
        .await;

    let messages = state
        .messages
        .history(conversation.id, DEFAULT_HISTORY_LIMIT)
        .await?;
    state
        .router
        .emit_to_conn(ctx.conn_id, &ServerEvent::LoadHistory { messages })
        .await;

    tracing::debug!(user_id = %ctx.user.id, conversation_id = %conversation.id, "joined conversation");
    Ok(())
}

async fn handle_send(
    state: &AppState,
    ctx: &ConnContext,
    conversation_id: Uuid,
    message: &str,
    recipient_id: Uuid,
    reply_to_id: Option<Uuid>,
) -> Result<(), AppError> {
    let record = state
        .messages
        .create_message(ctx.user.id, conversation_id, message, reply_to_id)
        .await?;
    state.router.fan_out_new_message(&record, recipient_id).await;
    Ok(())
}

async fn handle_mark_read(
    state: &AppState,
    ctx: &ConnContext,
    conversation_id: Uuid,
    recipient_id: Uuid,
) -> Result<(), AppError> {
    if !state
        .conversations
        .is_participant(conversation_id, ctx.user.id)
        .await?
    {
        return Err(AppError::Forbidden);
    }

    state.reads.mark_read(conversation_id, ctx.user.id).await?;

    // Privacy contract: a private reader's receipt is suppressed even though
    // the read state was just persisted.
    if !state.profiles.is_private(ctx.user.id).await? {
        state
            .router
            .emit_to_room(
                recipient_id,
                &ServerEvent::MessagesRead {
                    conversation_id,
                    reader_id: ctx.user.id,
                },
            )
            .await;
    }
    Ok(())
}
