//! Rule model and loader.
//!
//! The rule model is the *static* side of the engine: intents with their
//! compiled patterns, the dialogue graph, and the fallback reply. It is built
//! once from an external rule source and then shared read-only by every turn.
//!
//! ```text
//! YAML / JSON ── serde ──▶ raw document (loader.rs)
//!                              │  validate + compile patterns + convert actions
//!                              v
//!                          RuleModel (model.rs)
//! ```
//!
//! Failures while reading or validating the source are [`ConfigError`]s and
//! are meant to stop the process at startup. A single pattern that does not
//! compile is a [`PatternError`]: it is logged, recorded on the model, and
//! only that pattern is skipped, unless [`LoadOptions::strict_patterns`] is set.

#[path = "rules/error.rs"]
mod error;
#[path = "rules/loader.rs"]
mod loader;
#[path = "rules/model.rs"]
mod model;

pub use error::{ConfigError, PatternError};
pub use loader::{LoadOptions, RuleFormat};
pub use model::{Action, IntentRule, Metadata, RuleModel, State, Transition};
