//! Ordered message routing.
//!
//! The routing table is an explicit list of (guards, handler) pairs,
//! scanned top to bottom. The first route whose guards all pass runs its
//! handler; the handler then decides the dispatch outcome:
//!
//! * `Flow::Stop` — the update is handled, scanning ends.
//! * `Flow::Continue` — the handler declined (e.g. a stateful text
//!   handler saw a menu button); scanning resumes below that route.
//! * `Err(_)` — the failure is logged, the user gets a generic notice
//!   and scanning ends. Handlers mutate state only after their risky
//!   work succeeds, so a failed route leaves the conversation where it
//!   was.
//!
//! Global commands sit above stateful routes in the table, which is what
//! makes a menu press win over any in-progress flow.

use std::future::Future;
use std::pin::Pin;

use teloxide::prelude::*;

use crate::core::error::AppResult;
use crate::telegram::guard::{matches_all, Guard, GuardInput};
use crate::telegram::handlers::types::{Event, HandlerDeps};

/// What a handler tells the router to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Update handled, stop scanning
    Stop,
    /// Handler declined, keep scanning below this route
    Continue,
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = AppResult<Flow>> + Send>>;
pub type HandlerFn = fn(Bot, Event, HandlerDeps) -> HandlerFuture;

/// One row of the routing table.
pub struct Route {
    pub name: &'static str,
    pub guards: &'static [Guard],
    pub handler: HandlerFn,
}

/// The ordered routing table.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Name of the first route at or after `from` whose guards pass.
    /// Test seam: route selection without running handlers.
    pub fn select(&self, input: &GuardInput, from: usize) -> Option<(usize, &'static str)> {
        self.routes
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, route)| matches_all(route.guards, input))
            .map(|(idx, route)| (idx, route.name))
    }

    /// Routes one update. At most one handler accepts it.
    pub async fn dispatch(&self, bot: Bot, event: Event, deps: HandlerDeps) {
        let input = GuardInput {
            text: event.text.clone(),
            state: deps.states.state(event.user_id),
            is_admin: deps.is_admin(event.user_id).await,
            is_private: event.is_private,
        };

        let mut from = 0;
        while let Some((idx, name)) = self.select(&input, from) {
            let handler = self.routes[idx].handler;
            match handler(bot.clone(), event.clone(), deps.clone()).await {
                Ok(Flow::Stop) => return,
                Ok(Flow::Continue) => {
                    log::debug!("Route {} declined, rescanning", name);
                    from = idx + 1;
                }
                Err(e) => {
                    log::error!("Route {} failed for {}: {}", name, event.user_id, e);
                    let notice = e.user_message();
                    if let Err(send_err) = bot.send_message(event.chat_id, notice).await {
                        log::warn!("Could not notify {}: {}", event.user_id, send_err);
                    }
                    return;
                }
            }
        }
        log::debug!("No route accepted update from {}", event.user_id);
    }
}
