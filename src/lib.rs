extern crate self as colloquy;

#[macro_use]
mod macros;
mod api;
mod engine;
mod rules;

pub use api::{Engine, TurnResult};
pub use engine::{
    ActionRecord, ContextLease, ContextStore, IntentMatch, TurnMetrics, TurnOutcome, detect, detect_with_trace,
};
pub use rules::{
    Action, ConfigError, IntentRule, LoadOptions, Metadata, PatternError, RuleFormat, RuleModel, State, Transition,
};

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// State every new conversation starts in, and the recovery target when a
/// context points at a state the current rule model no longer declares.
pub const INITIAL_STATE: &str = "welcome";

/// Intent label returned when no intent rule matches.
pub const UNKNOWN_INTENT: &str = "unknown";

// --- Conversation context ---------------------------------------------------

/// Per-user conversation state.
///
/// Contexts are owned by the [`ContextStore`]; callers only ever see clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationContext {
    /// Name of the dialogue state the user is in.
    pub current_state: String,
    /// Slots captured by `set_context` actions.
    pub slots: BTreeMap<String, String>,
    /// Time of the most recent processed turn.
    pub last_active_at: DateTime<Utc>,
}

impl ConversationContext {
    /// A fresh context in [`INITIAL_STATE`] with no slots.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(now: DateTime<Utc>) -> Self {
        ConversationContext { current_state: INITIAL_STATE.to_string(), slots: BTreeMap::new(), last_active_at: now }
    }

    pub fn slot(&self, key: &str) -> Option<&str> {
        self.slots.get(key).map(String::as_str)
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new()
    }
}
