//! Per-update dispatch context
//!
//! One `Context` is built per inbound update and dropped once the update is
//! persisted; it is never stored. Identity fields (bot, template, instance,
//! user) are write-once — a second assignment is a programming error and
//! fails with [`EngineError::AlreadySet`] rather than silently rebinding the
//! session mid-dispatch.

use teloxide::Bot;

use crate::core::error::{EngineError, EngineResult};
use crate::storage::{BotInstance, BotTemplate, BotUser};

#[derive(Default)]
pub struct Context {
    bot: Option<Bot>,
    template: Option<BotTemplate>,
    instance: Option<BotInstance>,
    user: Option<BotUser>,
    state: Option<String>,
    is_output: bool,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bot(&mut self, bot: Bot) -> EngineResult<()> {
        if self.bot.is_some() {
            return Err(EngineError::AlreadySet("bot"));
        }
        self.bot = Some(bot);
        Ok(())
    }

    pub fn set_template(&mut self, template: BotTemplate) -> EngineResult<()> {
        if self.template.is_some() {
            return Err(EngineError::AlreadySet("template"));
        }
        self.template = Some(template);
        Ok(())
    }

    pub fn set_instance(&mut self, instance: BotInstance) -> EngineResult<()> {
        if self.instance.is_some() {
            return Err(EngineError::AlreadySet("instance"));
        }
        self.instance = Some(instance);
        Ok(())
    }

    pub fn set_user(&mut self, user: BotUser) -> EngineResult<()> {
        if self.user.is_some() {
            return Err(EngineError::AlreadySet("user"));
        }
        self.user = Some(user);
        Ok(())
    }

    pub fn bot(&self) -> Option<&Bot> {
        self.bot.as_ref()
    }

    pub fn template(&self) -> Option<&BotTemplate> {
        self.template.as_ref()
    }

    pub fn instance(&self) -> Option<&BotInstance> {
        self.instance.as_ref()
    }

    pub fn user(&self) -> Option<&BotUser> {
        self.user.as_ref()
    }

    /// Mutable user access for handlers updating the `store` scratch bag.
    pub fn user_mut(&mut self) -> Option<&mut BotUser> {
        self.user.as_mut()
    }

    /// Current conversation state; `None` until seeded or defaulted.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn set_state(&mut self, state: impl Into<String>) {
        self.state = Some(state.into());
    }

    /// Whether this cycle explicitly assigned a state (default-start, router
    /// redirect, or forced transition), as opposed to inheriting one.
    pub fn is_output(&self) -> bool {
        self.is_output
    }

    pub fn set_is_output(&mut self, value: bool) {
        self.is_output = value;
    }
}
