//! Minimal embedding example: a two-step name-asking bot.
//!
//! Environment:
//! - `BOT_TOKEN`  — Telegram bot token (required)
//! - `TRELLIS_DB` — SQLite path (defaults to trellis.sqlite)
//! - `RUST_LOG`   — log filter, e.g. `info`

use std::sync::Arc;

use futures_util::future::BoxFuture;
use teloxide::prelude::*;
use teloxide::types::{Update, UpdateKind};
use trellis::{config, Context, HandlerResult, RouterVerdict, SingleBotEngine, SqliteStore};

fn message_text(update: &Update) -> Option<&str> {
    match &update.kind {
        UpdateKind::Message(msg) => msg.text(),
        _ => None,
    }
}

fn start<'a>(update: &'a Update, cx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        if let (Some(bot), Some(chat)) = (cx.bot().cloned(), update.chat()) {
            bot.send_message(chat.id, "Hi! What's your name?").await?;
        }
        cx.set_state("await_name");
        Ok(())
    })
}

fn await_name<'a>(update: &'a Update, cx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        let name = message_text(update)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| "stranger".to_string());

        if let Some(user) = cx.user_mut() {
            user.store.insert("name".to_string(), serde_json::json!(name));
        }
        if let (Some(bot), Some(chat)) = (cx.bot().cloned(), update.chat()) {
            bot.send_message(chat.id, format!("Nice to meet you, {name}!")).await?;
        }
        cx.set_state("start");
        Ok(())
    })
}

fn handle_error<'a>(update: &'a Update, cx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        log::warn!("No node for state {:?}, resetting conversation", cx.state());
        if let (Some(bot), Some(chat)) = (cx.bot().cloned(), update.chat()) {
            bot.send_message(chat.id, "Something went sideways, let's start over.").await?;
        }
        cx.set_state("start");
        Ok(())
    })
}

/// Global /start command resets the conversation from any state.
fn command_router<'a>(update: &'a Update, _cx: &'a mut Context) -> BoxFuture<'a, RouterVerdict> {
    Box::pin(async move {
        let is_start = message_text(update).is_some_and(|text| text.trim() == "/start");
        Ok(is_start.then(|| "start".to_string()))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    trellis::core::init_logger();

    let token = std::env::var("BOT_TOKEN")?;
    let store = Arc::new(SqliteStore::open(&config::DATABASE_PATH)?);

    let engine = SingleBotEngine::new(token, store);
    engine.tree().register_router(command_router);
    engine.tree().register_node("start", start);
    engine.tree().register_node("await_name", await_name);
    engine.tree().register_node("handle_error", handle_error);

    engine.start_polling().await?;
    Ok(())
}
