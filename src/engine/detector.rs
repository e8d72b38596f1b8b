//! Intent detection.
//!
//! Input is case-folded once, then intent rules are scanned in model order
//! and each rule's patterns in declared order. The first pattern that matches
//! decides the intent. Detection holds no state, so the same model and text
//! always yield the same label.
//!
//! Patterns are compiled when the model is loaded; patterns that failed to
//! compile never reach this module.

use crate::{RuleModel, UNKNOWN_INTENT};

/// Which rule and pattern produced an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentMatch<'m> {
    pub intent: &'m str,
    /// Position of the rule in [`RuleModel::intents`].
    pub rule_index: usize,
    pub pattern: &'m str,
}

/// Map `text` to an intent label, or [`UNKNOWN_INTENT`] when nothing matches.
pub fn detect<'m>(text: &str, model: &'m RuleModel) -> &'m str {
    detect_with_trace(text, model).map_or(UNKNOWN_INTENT, |m| m.intent)
}

pub fn detect_with_trace<'m>(text: &str, model: &'m RuleModel) -> Option<IntentMatch<'m>> {
    let normalized = text.to_lowercase();

    for (rule_index, rule) in model.intents().iter().enumerate() {
        if let Some(re) = rule.patterns.iter().find(|re| re.is_match(&normalized)) {
            return Some(IntentMatch { intent: &rule.name, rule_index, pattern: re.as_str() });
        }
    }

    None
}
