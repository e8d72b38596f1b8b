//! Dialogue engine internals.
//!
//! A turn is a short pipeline over three collaborators: the shared, immutable
//! [`RuleModel`](crate::RuleModel), the per-user [`ContextStore`], and the
//! state machine that applies one transition to a working copy of a context.
//!
//! ```text
//! text ── detect (detector.rs) ──▶ intent
//!                                     │
//! ContextStore::lock (store.rs) ──▶ working copy of ConversationContext
//!                                     │
//!                          step (machine.rs)
//!                            - resolve current state (recover to "welcome")
//!                            - pick first transition for the intent
//!                            - run actions, enter next state
//!                            - render reply (template.rs)
//!                                     │
//!                                     v
//!                       ContextLease::commit + reply
//! ```
//!
//! ## Responsibilities by module
//!
//! - `detector.rs`: first-match intent detection over compiled patterns.
//! - `store.rs`: per-user locking and storage of conversation contexts.
//! - `machine.rs`: transition selection, action execution and state advance.
//! - `template.rs`: `${name}` placeholder rendering for response text.
//! - `metrics.rs`: per-turn timings.
//!
//! ## Failure policy
//!
//! Nothing on the turn path returns an error. Every unmatched or invalid
//! situation degrades to the model's fallback text, and problems are reported
//! through `tracing`.

#[path = "engine/detector.rs"]
mod detector;
#[path = "engine/machine.rs"]
mod machine;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/store.rs"]
mod store;
#[path = "engine/template.rs"]
mod template;

#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use detector::{IntentMatch, detect, detect_with_trace};
pub use machine::{ActionRecord, TurnOutcome};
pub(crate) use machine::step;
pub use metrics::TurnMetrics;
pub use store::{ContextLease, ContextStore};
