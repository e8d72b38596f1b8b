use super::error::PatternError;
use regex::Regex;
use std::collections::HashMap;

/// Free-form information about the bot, available to response templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub bot_name: Option<String>,
    pub version: Option<String>,
}

impl Metadata {
    /// Look up a metadata field by its rule-source key.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "bot_name" => self.bot_name.as_deref(),
            "version" => self.version.as_deref(),
            _ => None,
        }
    }
}

/// An intent with its compiled patterns.
///
/// Patterns are matched against lower-cased input, in declared order.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub name: String,
    /// Higher values are tried first; equal priorities keep declaration order.
    pub priority: i32,
    pub patterns: Vec<Regex>,
}

/// A side effect attached to a transition or to a state's entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Set the outgoing reply. Later responses in the same turn win.
    Response { content: String },
    /// Write `value` into the user's slot `key`.
    SetContext { key: String, value: String },
    /// An action type this engine does not know. Skipped at run time.
    Unrecognized { kind: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub intent: String,
    pub next_state: Option<String>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub name: String,
    pub transitions: Vec<Transition>,
    pub entry_actions: Vec<Action>,
}

impl State {
    /// First transition declared for `intent`, if any.
    pub fn transition_for(&self, intent: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.intent == intent)
    }
}

/// Immutable rule model shared by all turns.
#[derive(Debug, Clone)]
pub struct RuleModel {
    pub(super) metadata: Metadata,
    pub(super) intents: Vec<IntentRule>,
    pub(super) states: Vec<State>,
    pub(super) state_index: HashMap<String, usize>,
    pub(super) fallback: String,
    pub(super) pattern_errors: Vec<PatternError>,
}

impl RuleModel {
    /// Case-sensitive exact lookup of a state by name.
    pub fn find_state(&self, name: &str) -> Option<&State> {
        self.state_index.get(name).map(|&idx| &self.states[idx])
    }

    /// Intent rules in matching order.
    pub fn intents(&self) -> &[IntentRule] {
        &self.intents
    }

    /// States in declaration order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Patterns that were skipped because they did not compile.
    pub fn pattern_errors(&self) -> &[PatternError] {
        &self.pattern_errors
    }
}
