use crate::engine::{self, ContextStore, TurnMetrics, TurnOutcome};
use crate::{ConfigError, ConversationContext, RuleModel, UNKNOWN_INTENT};
use chrono::Utc;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// The message-processing entry point.
///
/// An `Engine` is shared (by reference or `Arc`) between all sessions. Each
/// call to [`Engine::process_message`] is one turn for one user; turns for
/// different users run in parallel, turns for the same user are serialized.
///
/// # Example
/// ```
/// use colloquy::{Engine, RuleModel};
///
/// let rules = RuleModel::from_yaml_str(r#"
/// intent_detection:
///   regex_patterns:
///     - intent: greeting
///       patterns: ["hello"]
/// dialogue_flow:
///   states:
///     - name: welcome
///       transitions:
///         - intent: greeting
///           next_state: welcome
///           actions:
///             - type: response
///               content: "hi there"
/// error_handling:
///   default_fallback: "Sorry, I did not get that."
/// "#).unwrap();
///
/// let engine = Engine::new(rules);
/// assert_eq!(engine.process_message("alice", "Hello!"), "hi there");
/// assert_eq!(engine.process_message("alice", "asdf"), "Sorry, I did not get that.");
/// ```
#[derive(Debug)]
pub struct Engine {
    rules: RwLock<Arc<RuleModel>>,
    store: ContextStore,
}

/// Result of [`Engine::process_message_verbose`].
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub reply: String,
    /// The intent pattern that matched, if any.
    pub pattern: Option<String>,
    pub outcome: TurnOutcome,
    pub metrics: TurnMetrics,
}

impl Engine {
    pub fn new(rules: RuleModel) -> Self {
        Engine { rules: RwLock::new(Arc::new(rules)), store: ContextStore::new() }
    }

    /// Load rules from a file and build an engine around them.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        RuleModel::from_path(path).map(Self::new)
    }

    /// The rule model new turns will use.
    pub fn rules(&self) -> Arc<RuleModel> {
        Arc::clone(&self.rules.read())
    }

    /// Swap in a new rule model. Turns already running finish on the model
    /// they started with.
    pub fn reload(&self, rules: RuleModel) {
        *self.rules.write() = Arc::new(rules);
        tracing::info!("rule model reloaded");
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Snapshot of a user's stored context.
    pub fn context(&self, user: &str) -> Option<ConversationContext> {
        self.store.get(user)
    }

    /// Run one turn for `user` and return the reply. Always returns a reply.
    pub fn process_message(&self, user: &str, text: &str) -> String {
        self.process_message_verbose(user, text).reply
    }

    /// Like [`Engine::process_message`], with the turn's outcome and timings.
    pub fn process_message_verbose(&self, user: &str, text: &str) -> TurnResult {
        let start = Instant::now();
        let rules = self.rules();

        let hit = engine::detect_with_trace(text, &rules);
        let intent = hit.map_or(UNKNOWN_INTENT, |m| m.intent);
        let pattern = hit.map(|m| m.pattern.to_string());
        let detect = start.elapsed();

        let lease = self.store.lock(user);
        let mut ctx = lease.get_or_create();

        let step_start = Instant::now();
        let (reply, outcome) = engine::step(&rules, intent, &mut ctx);
        let transition = step_start.elapsed();

        ctx.last_active_at = Utc::now();
        lease.commit(ctx);

        let metrics = TurnMetrics { total: start.elapsed(), detect, transition };
        tracing::debug!(
            %user,
            intent = %outcome.intent,
            from = %outcome.from_state,
            to = %outcome.to_state,
            fallback = outcome.fallback,
            elapsed = ?metrics.total,
            "processed turn"
        );

        TurnResult { reply, pattern, outcome, metrics }
    }
}
