//! Multi-tenant bot engine
//!
//! One process serves many bot instances. The shared template record is
//! loaded once at construction and cached for the process lifetime; the
//! per-event instance record (which carries the bot token) is re-loaded on
//! *every* update so a rotated credential takes effect immediately. These
//! are two deliberately distinct caching policies — do not collapse them.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::Update;

use crate::core::config;
use crate::core::error::{EngineError, EngineResult};
use crate::lock::UserLocks;
use crate::session::Session;
use crate::storage::{BotTemplate, InstanceStore, TemplateStore, UserStore};
use crate::tree::EngineTree;

pub struct BotEngine {
    tree: Arc<EngineTree>,
    template: BotTemplate,
    instances: Arc<dyn InstanceStore>,
    users: Arc<dyn UserStore>,
    locks: Option<UserLocks>,
}

impl BotEngine {
    /// Build an engine over the given stores.
    ///
    /// Fails fast with [`EngineError::TemplateNotFound`] when the singleton
    /// template record is absent — a deployment without one is
    /// mis-provisioned and must not start serving.
    pub async fn new(
        templates: Arc<dyn TemplateStore>,
        instances: Arc<dyn InstanceStore>,
        users: Arc<dyn UserStore>,
    ) -> EngineResult<Self> {
        let template = templates
            .find_singleton()
            .await?
            .ok_or(EngineError::TemplateNotFound)?;

        Ok(Self {
            tree: Arc::new(EngineTree::new()),
            template,
            instances,
            users,
            locks: None,
        })
    }

    /// Serialize updates per user identity with a keyed lock.
    ///
    /// Off by default: the reference behavior holds no lock across the
    /// read-dispatch-write sequence, so concurrent updates for one user are
    /// last-write-wins. Enable this to trade that race for per-user
    /// queueing.
    pub fn with_user_locks(mut self) -> Self {
        self.locks = Some(UserLocks::new());
        self
    }

    /// The routing tree; register nodes and routers on it during bootstrap.
    pub fn tree(&self) -> &Arc<EngineTree> {
        &self.tree
    }

    /// Process one raw inbound update for the given instance.
    ///
    /// Resolves the instance (every time — see module docs), binds the
    /// session, drives the tree, persists the outcome. Any error aborts the
    /// update before persistence and propagates to the caller; isolating
    /// per-event failures is the update source's job.
    pub async fn process_update(&self, instance_id: i64, update: Update) -> EngineResult<()> {
        let instance = self
            .instances
            .find_by_id(instance_id)
            .await?
            .ok_or(EngineError::InstanceNotFound(instance_id))?;
        let bot = Bot::new(instance.token.clone());

        Session {
            tree: &self.tree,
            users: self.users.as_ref(),
            locks: self.locks.as_ref(),
            bot,
            template: Some(&self.template),
            instance: Some(instance),
        }
        .run(&update)
        .await
    }

    /// Long-poll loop for one instance. Development tool only: no backoff,
    /// no concurrency, no recovery beyond per-event logging.
    pub async fn start_polling(&self, instance_id: i64) -> EngineResult<()> {
        log::warn!("Polling is intended for development purposes only");

        let instance = self
            .instances
            .find_by_id(instance_id)
            .await?
            .ok_or(EngineError::InstanceNotFound(instance_id))?;
        let bot = Bot::new(instance.token);

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
                // process_update re-resolves the instance for each event,
                // so a rotated token is picked up mid-batch
                if let Err(e) = self.process_update(instance_id, update).await {
                    log::error!("Failed to process update: {}", e);
                }
            }
        }
    }
}
