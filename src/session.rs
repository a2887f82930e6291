//! Session binding shared by both engine flavors
//!
//! One update's session: resolve the sending identity, find or create the
//! user record, build the Context, drive the tree, persist the outcome. The
//! multi-tenant and single-tenant engines differ only in what they pass in
//! here (template/instance vs. nothing).

use chrono::Utc;
use teloxide::types::Update;
use teloxide::Bot;

use crate::context::Context;
use crate::core::error::EngineResult;
use crate::lock::UserLocks;
use crate::storage::{BotInstance, BotTemplate, BotUser, UserKey, UserPatch, UserStore};
use crate::tree::{EngineTree, START_NODE};

pub(crate) struct Session<'a> {
    pub tree: &'a EngineTree,
    pub users: &'a dyn UserStore,
    pub locks: Option<&'a UserLocks>,
    pub bot: Bot,
    pub template: Option<&'a BotTemplate>,
    pub instance: Option<BotInstance>,
}

impl Session<'_> {
    /// Process one update end to end.
    ///
    /// Without `locks` there is no mutual exclusion between the user read
    /// and the write-back: two concurrent updates for the same identity
    /// race and the later write wins.
    pub(crate) async fn run(self, update: &Update) -> EngineResult<()> {
        let (chat, from) = match (update.chat(), update.from()) {
            (Some(chat), Some(from)) => (chat, from),
            _ => {
                log::debug!("update {} has no chat/user identity, dropping", update.id.0);
                return Ok(());
            }
        };

        let key = UserKey {
            instance_id: self.instance.as_ref().map(|i| i.id),
            chat_id: chat.id.0,
            user_id: from.id.0,
        };

        let _guard = match self.locks {
            Some(locks) => Some(locks.acquire(&key).await),
            None => None,
        };

        let user = match self.users.find_by_key(&key).await? {
            Some(user) if user.blocked => {
                log::debug!("user {} in chat {} is blocked, dropping update", key.user_id, key.chat_id);
                return Ok(());
            }
            Some(user) => user,
            None => {
                let created = self.users.insert(BotUser::new(&key, from)).await?;
                log::info!(
                    "created user {} for chat {} / user {}",
                    created.id,
                    key.chat_id,
                    key.user_id
                );
                created
            }
        };

        let user_id = user.id;
        let mut cx = Context::new();
        cx.set_bot(self.bot)?;
        if let Some(template) = self.template {
            cx.set_template(template.clone())?;
        }
        if let Some(instance) = self.instance {
            cx.set_instance(instance)?;
        }
        // Empty persisted state means "start fresh", not a literal state name
        if !user.state.is_empty() {
            cx.set_state(user.state.clone());
        }
        cx.set_user(user)?;

        self.tree.process(update, &mut cx).await?;

        // Only reached on successful dispatch; a failed update persists nothing
        let patch = UserPatch {
            state: cx.state().unwrap_or(START_NODE).to_owned(),
            store: cx.user().map(|u| u.store.clone()).unwrap_or_default(),
            update_dt: Utc::now(),
        };
        self.users.update(user_id, patch).await?;
        Ok(())
    }
}
