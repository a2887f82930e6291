//! The routing state machine
//!
//! An [`EngineTree`] holds an ordered chain of routers and a map from state
//! name to node. Routers run before every dispatch and may redirect the
//! update to a different state; when several redirect, the last one wins.
//! The node bound to the final state then handles the update; an unknown
//! state falls back to the reserved `handle_error` node.
//!
//! Registries are populated during application bootstrap and are read-only
//! by convention once the bot starts serving. Handlers are plain functions
//! (or non-capturing closures) of the shape
//! `fn(&Update, &mut Context) -> BoxFuture<'_, HandlerResult>`:
//!
//! ```
//! use futures_util::future::BoxFuture;
//! use teloxide::types::Update;
//! use trellis::{Context, EngineTree, HandlerResult};
//!
//! fn start<'a>(_update: &'a Update, cx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
//!     Box::pin(async move {
//!         cx.set_state("await_name");
//!         Ok(())
//!     })
//! }
//!
//! let tree = EngineTree::new();
//! tree.register_node("start", start);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::future::BoxFuture;
use teloxide::types::Update;

use crate::context::Context;
use crate::core::error::{EngineError, EngineResult};

/// State a fresh conversation starts in.
pub const START_NODE: &str = "start";

/// Reserved fallback node for unresolved states.
pub const ERROR_NODE: &str = "handle_error";

/// What a node returns. Errors are opaque to the engine and propagate to the
/// update source.
pub type HandlerResult = anyhow::Result<()>;

/// What a router returns: `Some(state)` redirects the dispatch, `None`
/// leaves the current state alone.
pub type RouterVerdict = anyhow::Result<Option<String>>;

/// Handler bound to a named conversation state.
pub type NodeFn =
    dyn for<'a> Fn(&'a Update, &'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync;

/// Interceptor run before every node dispatch.
pub type RouterFn =
    dyn for<'a> Fn(&'a Update, &'a mut Context) -> BoxFuture<'a, RouterVerdict> + Send + Sync;

#[derive(Default)]
pub struct EngineTree {
    routers: RwLock<Vec<Arc<RouterFn>>>,
    nodes: RwLock<HashMap<String, Arc<NodeFn>>>,
}

impl EngineTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `name`. Re-registering a name replaces the prior
    /// binding — last registration wins.
    pub fn register_node<F>(&self, name: impl Into<String>, handler: F)
    where
        F: for<'a> Fn(&'a Update, &'a mut Context) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        let prior = self
            .nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::new(handler));
        if prior.is_some() {
            log::debug!("node `{}` re-registered; previous binding replaced", name);
        }
    }

    /// Append `handler` to the router chain. Routers run in registration
    /// order on every update.
    pub fn register_router<F>(&self, handler: F)
    where
        F: for<'a> Fn(&'a Update, &'a mut Context) -> BoxFuture<'a, RouterVerdict>
            + Send
            + Sync
            + 'static,
    {
        self.routers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    /// Drive one update through the router chain and into its node.
    ///
    /// An unset state defaults to [`START_NODE`] before any router runs.
    /// Every router sees the update; a redirect from a later router
    /// overrides an earlier one.
    pub async fn process(&self, update: &Update, cx: &mut Context) -> EngineResult<()> {
        if cx.state().is_none() {
            cx.set_state(START_NODE);
            cx.set_is_output(true);
        }

        let routers: Vec<Arc<RouterFn>> = self
            .routers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for router in routers {
            if let Some(next) = router(update, cx).await.map_err(EngineError::Handler)? {
                cx.set_is_output(true);
                cx.set_state(next);
            }
        }

        self.execute_node(update, cx).await
    }

    /// Force an immediate jump to `name`, bypassing the router chain.
    ///
    /// Used by a node to chain into another node within the same update
    /// cycle.
    pub async fn run(&self, name: &str, update: &Update, cx: &mut Context) -> EngineResult<()> {
        cx.set_state(name);
        cx.set_is_output(true);
        self.execute_node(update, cx).await
    }

    async fn execute_node(&self, update: &Update, cx: &mut Context) -> EngineResult<()> {
        let state = cx.state().unwrap_or(START_NODE).to_owned();

        // Clone the handler out so the registry lock is not held across await
        let node = {
            let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
            nodes.get(&state).or_else(|| nodes.get(ERROR_NODE)).cloned()
        };

        match node {
            Some(node) => node(update, cx).await.map_err(EngineError::Handler),
            None => Err(EngineError::DispatchUnresolved { state }),
        }
    }
}
