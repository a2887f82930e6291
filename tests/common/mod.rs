//! Shared fixtures for integration tests
//!
//! Update payloads are built from raw Telegram JSON, the same shape the
//! webhook receives; handlers are free functions matching the tree's
//! handler signature.

#![allow(dead_code)]

use chrono::Utc;
use futures_util::future::BoxFuture;
use serde_json::json;
use teloxide::types::Update;
use trellis::{BotInstance, BotTemplate, Context, HandlerResult, RouterVerdict};

/// A private-chat text message update.
pub fn message_update(update_id: u32, chat_id: i64, user_id: u64, first_name: &str, text: &str) -> Update {
    // Deserialize via a string: teloxide's Update does not round-trip through
    // serde_json::from_value (RawValue/flatten limitation) and silently
    // degrades to UpdateKind::Error.
    from_json(json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "date": 1700000000,
            "chat": {"id": chat_id, "type": "private", "first_name": first_name},
            "from": {"id": user_id, "is_bot": false, "first_name": first_name},
            "text": text
        }
    }))
    .expect("valid update JSON")
}

/// An update with a chat but no sending user (a channel post).
pub fn anonymous_update(update_id: u32) -> Update {
    from_json(json!({
        "update_id": update_id,
        "channel_post": {
            "message_id": update_id,
            "date": 1700000000,
            "chat": {"id": -1001234, "type": "channel", "title": "announcements"},
            "text": "hello"
        }
    }))
    .expect("valid update JSON")
}

fn from_json(value: serde_json::Value) -> serde_json::Result<Update> {
    serde_json::from_str(&value.to_string())
}

pub fn template() -> BotTemplate {
    let now = Utc::now();
    BotTemplate { data: json!({"greeting": "hi"}), update_dt: now, create_dt: now }
}

pub fn instance(id: i64, token: &str) -> BotInstance {
    let now = Utc::now();
    BotInstance {
        id,
        token: token.to_string(),
        data: json!({}),
        update_dt: now,
        create_dt: now,
    }
}

/// `start` node: greet, remember we ran, move to `await_name`.
pub fn visit_start<'a>(_u: &'a Update, cx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        if let Some(user) = cx.user_mut() {
            user.store.insert("visited".to_string(), json!("start"));
        }
        cx.set_state("await_name");
        Ok(())
    })
}

/// `await_name` node: record the visit and stay put.
pub fn visit_await_name<'a>(_u: &'a Update, cx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        if let Some(user) = cx.user_mut() {
            user.store.insert("visited".to_string(), json!("await_name"));
        }
        Ok(())
    })
}

/// Node that records which instance token the session was bound to.
pub fn record_token<'a>(_u: &'a Update, cx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        let token = cx.instance().map(|i| i.token.clone()).unwrap_or_default();
        if let Some(user) = cx.user_mut() {
            user.store.insert("token".to_string(), json!(token));
        }
        Ok(())
    })
}

/// Node that appends one entry to a `trail` array in the store bag.
pub fn append_trail<'a>(_u: &'a Update, cx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        if let Some(user) = cx.user_mut() {
            let trail = user.store.entry("trail".to_string()).or_insert_with(|| json!([]));
            if let Some(list) = trail.as_array_mut() {
                list.push(json!(list.len()));
            }
        }
        Ok(())
    })
}

/// Node that always fails with an application error.
pub fn exploding_node<'a>(_u: &'a Update, _cx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move { Err(anyhow::anyhow!("node exploded")) })
}

/// Router that redirects `/reset` messages back to `start`.
pub fn reset_router<'a>(update: &'a Update, _cx: &'a mut Context) -> BoxFuture<'a, RouterVerdict> {
    Box::pin(async move {
        let is_reset = matches!(
            &update.kind,
            teloxide::types::UpdateKind::Message(msg) if msg.text() == Some("/reset")
        );
        Ok(is_reset.then(|| "start".to_string()))
    })
}
