//! Single-tenant bot engine
//!
//! One process, one bot, one literal token fixed at construction. No
//! template or instance records and no per-event credential lookup —
//! otherwise identical in shape to the multi-tenant engine.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::Update;

use crate::core::config;
use crate::core::error::EngineResult;
use crate::lock::UserLocks;
use crate::session::Session;
use crate::storage::UserStore;
use crate::tree::EngineTree;

pub struct SingleBotEngine {
    tree: Arc<EngineTree>,
    token: String,
    users: Arc<dyn UserStore>,
    locks: Option<UserLocks>,
}

impl SingleBotEngine {
    pub fn new(token: impl Into<String>, users: Arc<dyn UserStore>) -> Self {
        Self {
            tree: Arc::new(EngineTree::new()),
            token: token.into(),
            users,
            locks: None,
        }
    }

    /// Serialize updates per user identity; see
    /// [`BotEngine::with_user_locks`](crate::engine::BotEngine::with_user_locks).
    pub fn with_user_locks(mut self) -> Self {
        self.locks = Some(UserLocks::new());
        self
    }

    /// The routing tree; register nodes and routers on it during bootstrap.
    pub fn tree(&self) -> &Arc<EngineTree> {
        &self.tree
    }

    /// Process one raw inbound update.
    pub async fn process_update(&self, update: Update) -> EngineResult<()> {
        Session {
            tree: &self.tree,
            users: self.users.as_ref(),
            locks: self.locks.as_ref(),
            bot: Bot::new(self.token.clone()),
            template: None,
            instance: None,
        }
        .run(&update)
        .await
    }

    /// Long-poll loop. Development tool only: no backoff, no concurrency,
    /// no recovery beyond per-event logging.
    pub async fn start_polling(&self) -> EngineResult<()> {
        log::warn!("Polling is intended for development purposes only");

        let bot = Bot::new(self.token.clone());
        let mut offset: i32 = 0;
        loop {
            let updates = bot
                .get_updates()
                .offset(offset)
                .timeout(config::polling::READ_TIMEOUT_SECS)
                .send()
                .await?;

            if updates.is_empty() {
                tokio::time::sleep(config::polling::idle_interval()).await;
                continue;
            }

            if let Some(last) = updates.last() {
                offset = last.id.as_offset();
            }

            for update in updates {
                if let Err(e) = self.process_update(update).await {
                    log::error!("Failed to process update: {}", e);
                }
            }
        }
    }
}
