//! Dialogue state machine and action executor.
//!
//! One call to [`step`] applies a single turn to a working copy of a user's
//! context:
//!
//! ```text
//! current_state ──find_state──┬─ found ─────────────────────────┐
//!                             └─ missing ─▶ "welcome" (recover) ─┤
//!                                             └─ missing ─▶ fallback
//!                                                               v
//!                            transition_for(intent) ── none ─▶ fallback
//!                                      │
//!                                      v
//!                      run transition actions (in order)
//!                      enter next_state if it resolves
//!                        └─ state changed? run its entry actions
//!                      render last response, or fallback if empty
//! ```
//!
//! The machine never fails: every dead end produces the model's fallback text.
//! Since it only mutates the working copy, the caller decides when (and
//! whether) the result becomes visible to the next turn.

use super::template::render;
use crate::{Action, ConversationContext, INITIAL_STATE, RuleModel, State};
use thiserror::Error;

/// What a turn did, for traces and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub intent: String,
    /// State the context was in before the turn (as stored).
    pub from_state: String,
    /// State the context is in after the turn.
    pub to_state: String,
    /// A transition for the intent was found and taken.
    pub matched: bool,
    /// The stored state no longer existed and the turn restarted from `welcome`.
    pub recovered: bool,
    /// The reply is the model's fallback text.
    pub fallback: bool,
    pub actions: Vec<ActionRecord>,
}

/// An action as it was applied during a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRecord {
    Response { content: String },
    SetContext { key: String, value: String },
    Skipped { kind: String },
}

#[derive(Debug, Error)]
#[error("state '{0}' is not declared in the rule model")]
struct UnresolvedState(String);

fn resolve_state<'m>(model: &'m RuleModel, name: &str) -> Result<&'m State, UnresolvedState> {
    model.find_state(name).ok_or_else(|| UnresolvedState(name.to_string()))
}

/// Apply one turn for `intent` to `ctx` and return the reply text.
pub(crate) fn step(model: &RuleModel, intent: &str, ctx: &mut ConversationContext) -> (String, TurnOutcome) {
    let mut outcome = TurnOutcome {
        intent: intent.to_string(),
        from_state: ctx.current_state.clone(),
        to_state: ctx.current_state.clone(),
        matched: false,
        recovered: false,
        fallback: true,
        actions: Vec::new(),
    };

    let state = match resolve_state(model, &ctx.current_state) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(error = %err, "recovering conversation to the initial state");
            match model.find_state(INITIAL_STATE) {
                Some(state) => {
                    ctx.current_state = state.name.clone();
                    outcome.recovered = true;
                    outcome.to_state = state.name.clone();
                    state
                }
                None => return (model.fallback().to_string(), outcome),
            }
        }
    };

    let Some(transition) = state.transition_for(intent) else {
        return (model.fallback().to_string(), outcome);
    };
    outcome.matched = true;

    let mut response = None;
    execute(&transition.actions, ctx, &mut response, &mut outcome.actions);

    if let Some(next) = transition.next_state.as_deref().and_then(|name| model.find_state(name)) {
        if next.name != ctx.current_state {
            ctx.current_state = next.name.clone();
            execute(&next.entry_actions, ctx, &mut response, &mut outcome.actions);
        }
    }
    outcome.to_state = ctx.current_state.clone();

    let reply = match response {
        Some(content) if !content.is_empty() => render(content, ctx, model.metadata()).into_owned(),
        _ => return (model.fallback().to_string(), outcome),
    };
    outcome.fallback = false;
    (reply, outcome)
}

/// Run `actions` in order. `response` keeps the last response content seen.
fn execute<'m>(
    actions: &'m [Action],
    ctx: &mut ConversationContext,
    response: &mut Option<&'m str>,
    applied: &mut Vec<ActionRecord>,
) {
    for action in actions {
        match action {
            Action::Response { content } => {
                *response = Some(content.as_str());
                applied.push(ActionRecord::Response { content: content.clone() });
            }
            Action::SetContext { key, value } => {
                ctx.slots.insert(key.clone(), value.clone());
                applied.push(ActionRecord::SetContext { key: key.clone(), value: value.clone() });
            }
            Action::Unrecognized { kind } => {
                tracing::warn!(%kind, state = %ctx.current_state, "ignoring unrecognized action");
                applied.push(ActionRecord::Skipped { kind: kind.clone() });
            }
        }
    }
}
