//! Rule source parsing, validation and pattern compilation.
//!
//! The source is deserialized into a loose "raw" document first (every field
//! optional, unknown keys ignored) so that older and newer rule files load
//! alike. Conversion into [`RuleModel`] then:
//!
//! - validates structure (fallback text, names, duplicate states),
//! - compiles every pattern once, recording failures as [`PatternError`]s,
//! - sorts intents by priority (stable, so equal priorities keep file order),
//! - turns raw actions into the [`Action`] sum type.

use super::error::{ConfigError, PatternError};
use super::model::{Action, IntentRule, Metadata, RuleModel, State, Transition};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Serialization format of a rule source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleFormat {
    #[default]
    Yaml,
    Json,
}

impl RuleFormat {
    /// `.json` files are JSON; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => RuleFormat::Json,
            _ => RuleFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Fail the whole load on the first pattern that does not compile.
    pub strict_patterns: bool,
}

// --- Raw document -------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRules {
    metadata: RawMetadata,
    intent_detection: RawIntentDetection,
    dialogue_flow: RawDialogueFlow,
    error_handling: RawErrorHandling,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetadata {
    bot_name: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIntentDetection {
    regex_patterns: Vec<RawIntentRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIntentRule {
    intent: String,
    patterns: Vec<String>,
    priority: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDialogueFlow {
    states: Vec<RawState>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawState {
    name: String,
    transitions: Vec<RawTransition>,
    entry_actions: Vec<RawAction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTransition {
    intent: String,
    next_state: Option<String>,
    actions: Vec<RawAction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    content: Option<String>,
    key: Option<String>,
    value: Option<Value>,
    params: BTreeMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawErrorHandling {
    default_fallback: String,
}

// --- Loading ------------------------------------------------------------------

impl RuleModel {
    /// Parse and validate a rule source with default [`LoadOptions`].
    pub fn load(source: &str, format: RuleFormat) -> Result<Self, ConfigError> {
        Self::load_with(source, format, &LoadOptions::default())
    }

    pub fn load_with(source: &str, format: RuleFormat, options: &LoadOptions) -> Result<Self, ConfigError> {
        let raw: RawRules = match format {
            RuleFormat::Yaml => serde_yaml::from_str(source)?,
            RuleFormat::Json => serde_json::from_str(source)?,
        };
        build(raw, options)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        Self::load(source, RuleFormat::Yaml)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Self::load(source, RuleFormat::Json)
    }

    /// Read a rule file; the format follows the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_path_with(path, &LoadOptions::default())
    }

    pub fn from_path_with(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source =
            fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let model = Self::load_with(&source, RuleFormat::from_path(path), options)?;

        tracing::info!(
            path = %path.display(),
            intents = model.intents.len(),
            states = model.states.len(),
            "loaded rule model"
        );
        Ok(model)
    }
}

fn build(raw: RawRules, options: &LoadOptions) -> Result<RuleModel, ConfigError> {
    let fallback = raw.error_handling.default_fallback;
    if fallback.trim().is_empty() {
        return Err(ConfigError::Invalid("error_handling.default_fallback cannot be empty".to_string()));
    }

    let mut pattern_errors = Vec::new();
    let mut intents = Vec::with_capacity(raw.intent_detection.regex_patterns.len());
    for rule in raw.intent_detection.regex_patterns {
        intents.push(compile_intent(rule, options, &mut pattern_errors)?);
    }
    intents.sort_by_key(|rule| Reverse(rule.priority));

    let mut states = Vec::with_capacity(raw.dialogue_flow.states.len());
    let mut state_index = HashMap::new();
    for raw_state in raw.dialogue_flow.states {
        let state = convert_state(raw_state)?;
        if state_index.insert(state.name.clone(), states.len()).is_some() {
            return Err(ConfigError::Invalid(format!("state '{}' is declared more than once", state.name)));
        }
        states.push(state);
    }

    for state in &states {
        for transition in &state.transitions {
            if let Some(next) = &transition.next_state {
                if !state_index.contains_key(next) {
                    tracing::warn!(
                        state = %state.name,
                        intent = %transition.intent,
                        next_state = %next,
                        "transition targets an undeclared state; it will not change state"
                    );
                }
            }
        }
    }

    Ok(RuleModel {
        metadata: Metadata { bot_name: raw.metadata.bot_name, version: raw.metadata.version },
        intents,
        states,
        state_index,
        fallback,
        pattern_errors,
    })
}

fn compile_intent(
    rule: RawIntentRule,
    options: &LoadOptions,
    errors: &mut Vec<PatternError>,
) -> Result<IntentRule, ConfigError> {
    if rule.intent.trim().is_empty() {
        return Err(ConfigError::Invalid("intent name cannot be empty".to_string()));
    }

    let mut patterns = Vec::with_capacity(rule.patterns.len());
    for pattern in rule.patterns {
        match Regex::new(&pattern) {
            Ok(re) => patterns.push(re),
            Err(err) => {
                let error = PatternError { intent: rule.intent.clone(), pattern, message: err.to_string() };
                if options.strict_patterns {
                    return Err(error.into());
                }
                tracing::warn!(%error, "skipping intent pattern");
                errors.push(error);
            }
        }
    }

    Ok(IntentRule { name: rule.intent, priority: rule.priority, patterns })
}

fn convert_state(raw: RawState) -> Result<State, ConfigError> {
    if raw.name.trim().is_empty() {
        return Err(ConfigError::Invalid("state name cannot be empty".to_string()));
    }

    let mut transitions = Vec::with_capacity(raw.transitions.len());
    for transition in raw.transitions {
        if transition.intent.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("state '{}' has a transition without an intent", raw.name)));
        }
        transitions.push(Transition {
            intent: transition.intent,
            next_state: transition.next_state.filter(|name| !name.is_empty()),
            actions: convert_actions(&raw.name, transition.actions),
        });
    }

    let entry_actions = convert_actions(&raw.name, raw.entry_actions);
    Ok(State { name: raw.name, transitions, entry_actions })
}

fn convert_actions(state: &str, raw: Vec<RawAction>) -> Vec<Action> {
    raw.into_iter().filter_map(|action| convert_action(state, action)).collect()
}

fn convert_action(state: &str, raw: RawAction) -> Option<Action> {
    match raw.kind.as_str() {
        "response" => Some(Action::Response { content: raw.content.unwrap_or_default() }),
        "set_context" => {
            let key = raw.key.unwrap_or_default();
            if key.is_empty() {
                tracing::warn!(%state, "dropping set_context action without a key");
                return None;
            }
            let value = raw.value.as_ref().or_else(|| raw.params.get("value")).map(scalar_text).unwrap_or_default();
            Some(Action::SetContext { key, value })
        }
        _ => Some(Action::Unrecognized { kind: raw.kind }),
    }
}

/// Text form of a scalar parameter; strings are taken without quotes.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
