//! Input Resolver & Transform Engine (C4, spec §4.4).
//!
//! Grounded on the teacher's `send` (per-destination routing decisions)
//! and `command` (structured per-node write decisions), generalized into
//! a strategy-per-`NodeType` trait object map plus a pure rule pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use dipeo_core::compiled::{ExecutableDiagram, TransformRuleKind};
use dipeo_core::envelope::Envelope;
use dipeo_core::ids::NodeId;
use serde_json::Value;
use tracing::warn;

use crate::error::RuntimeError;
use crate::token::TokenManager;

/// One compile-time-resolved transformation step, applied to a value in
/// order. Pure — `(value, config) -> value` — and logged best-effort on
/// failure rather than aborting the firing (spec §4.4 contract).
pub trait TransformRule: Send + Sync {
    fn apply(&self, value: Value) -> Value;
}

struct VariableExtract {
    key_path: String,
}
impl TransformRule for VariableExtract {
    fn apply(&self, value: Value) -> Value {
        let mut current = &value;
        for segment in self.key_path.split('.') {
            match current.get(segment) {
                Some(next) => current = next,
                None => return value,
            }
        }
        current.clone()
    }
}

struct FormatString {
    template: String,
}
impl TransformRule for FormatString {
    fn apply(&self, value: Value) -> Value {
        let rendered = as_display_string(&value);
        Value::String(self.template.replace("{value}", &rendered))
    }
}

fn as_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

struct ContentTypeConvert;
impl TransformRule for ContentTypeConvert {
    fn apply(&self, value: Value) -> Value {
        match &value {
            Value::String(s) => {
                let trimmed = s.trim_start();
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    serde_json::from_str(s).unwrap_or(value)
                } else {
                    value
                }
            }
            _ => value,
        }
    }
}

struct ExtractToolResults;
impl TransformRule for ExtractToolResults {
    fn apply(&self, value: Value) -> Value {
        value.get("tool_results").cloned().unwrap_or(value)
    }
}

struct BranchOnCondition;
impl TransformRule for BranchOnCondition {
    fn apply(&self, value: Value) -> Value {
        value
    }
}

/// A rule that accepts per-edge parameters at apply time (the `Custom`
/// variant's `params`), as opposed to the five built-ins, which bake
/// their configuration in at compile time via `TransformRuleKind`.
pub trait CustomRule: Send + Sync {
    fn apply(&self, value: Value, params: &Value) -> Value;
}

/// Registry of named transformation rules (spec §4.4: "rules are
/// registered in a rule registry, allowing custom rules via plugin;
/// registry is freezable to prevent runtime modification"). Starts
/// pre-populated, under their `snake_case` names, with the built-ins that
/// take no compile-time configuration (`content_type_convert`,
/// `extract_tool_results`, `branch_on_condition`; `VariableExtract`/
/// `FormatString` apply directly since their parameters are baked into
/// `TransformRuleKind` at compile time) and accepts further [`register`]
/// calls until [`freeze`] is called, mirroring the teacher's "registry
/// frozen before first execution" idiom used for node executor
/// registration. Calling [`register`] after freezing is a programming
/// error, not a silently ignored one.
///
/// [`register`]: RuleRegistry::register
/// [`freeze`]: RuleRegistry::freeze
pub struct RuleRegistry {
    rules: HashMap<String, Arc<dyn CustomRule>>,
    frozen: bool,
}

struct BuiltinRule<F>(F);
impl<F: Fn(Value) -> Value + Send + Sync> CustomRule for BuiltinRule<F> {
    fn apply(&self, value: Value, _params: &Value) -> Value {
        (self.0)(value)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        let mut rules: HashMap<String, Arc<dyn CustomRule>> = HashMap::new();
        rules.insert("content_type_convert".into(), Arc::new(BuiltinRule(|v| ContentTypeConvert.apply(v))));
        rules.insert("extract_tool_results".into(), Arc::new(BuiltinRule(|v| ExtractToolResults.apply(v))));
        rules.insert("branch_on_condition".into(), Arc::new(BuiltinRule(|v| BranchOnCondition.apply(v))));
        Self { rules, frozen: false }
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named rule. Panics if the registry is already frozen —
    /// plugin registration only ever happens at startup, before any
    /// diagram runs.
    pub fn register(&mut self, name: impl Into<String>, rule: Arc<dyn CustomRule>) {
        assert!(!self.frozen, "cannot register rule '{}': registry is frozen", name.into());
        self.rules.insert(name.into(), rule);
    }

    /// Consume `self`, returning a read-only `Arc`-shared registry that
    /// rejects further registration.
    pub fn freeze(mut self) -> Arc<Self> {
        self.frozen = true;
        Arc::new(self)
    }

    fn apply_one(&self, kind: &TransformRuleKind, value: Value) -> Value {
        match kind {
            TransformRuleKind::VariableExtract { key_path } => VariableExtract { key_path: key_path.clone() }.apply(value),
            TransformRuleKind::FormatString { template } => FormatString { template: template.clone() }.apply(value),
            TransformRuleKind::ContentTypeConvert => self.dispatch("content_type_convert", value, &Value::Null),
            TransformRuleKind::ExtractToolResults => self.dispatch("extract_tool_results", value, &Value::Null),
            TransformRuleKind::BranchOnCondition => self.dispatch("branch_on_condition", value, &Value::Null),
            TransformRuleKind::Custom { name, params } => self.dispatch(name, value, params),
        }
    }

    fn dispatch(&self, name: &str, value: Value, params: &Value) -> Value {
        match self.rules.get(name) {
            Some(rule) => rule.apply(value, params),
            None => {
                warn!(rule = name, "no rule registered under this name, leaving value unchanged");
                value
            }
        }
    }

    /// Apply an edge's ordered rule list to one value, best-effort: a
    /// rule that fails (panics are not caught; transform rules here are
    /// pure functions that cannot fail) simply leaves the value as-is.
    pub fn apply_all(&self, rules: &[TransformRuleKind], value: Value) -> Value {
        rules.iter().fold(value, |acc, kind| self.apply_one(kind, acc))
    }
}

/// Smart output extraction (spec §4.4): prefer `outputs.<port>`, fall back
/// to `value`, else the port is absent.
fn extract_port(source_output: &Value, port: &str) -> Option<Value> {
    if let Some(v) = source_output.get("outputs").and_then(|o| o.get(port)) {
        return Some(v.clone());
    }
    if let Some(v) = source_output.get("value") {
        return Some(v.clone());
    }
    if port == "default" {
        return Some(source_output.clone());
    }
    None
}

/// Resolves inputs for one node firing: reads tokens from the
/// [`TokenManager`], applies the edge's transform rules, and produces the
/// `map<port, Envelope>` contract requires.
pub struct InputResolver {
    rules: Arc<RuleRegistry>,
}

impl InputResolver {
    pub fn new(rules: Arc<RuleRegistry>) -> Self {
        Self { rules }
    }

    pub fn resolve(
        &self,
        diagram: &ExecutableDiagram,
        tokens: &TokenManager,
        node: &NodeId,
    ) -> Result<HashMap<String, Envelope>, RuntimeError> {
        let raw = tokens.consume_inbound(node);
        let mut resolved = HashMap::with_capacity(raw.len());

        for edge in diagram.edges_into(node) {
            let Some(envelope) = raw.get(&edge.target_input_port) else { continue };

            let extracted = extract_port(&envelope.body, &edge.source_output_port).unwrap_or_else(|| envelope.body.clone());
            let transformed = self.rules.apply_all(&edge.transform_rules, extracted);

            if transformed != envelope.body {
                let original = envelope.body.clone();
                let delivered = envelope.with_body(transformed).with_representation("untransformed", original);
                resolved.insert(edge.target_input_port.clone(), delivered);
            } else {
                resolved.insert(edge.target_input_port.clone(), envelope.clone());
            }
        }

        if resolved.is_empty() && !raw.is_empty() {
            warn!(node = %node, "input resolution produced no ports from non-empty token set");
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn variable_extract_walks_dotted_key_path() {
        let rule = VariableExtract { key_path: "a.b".to_string() };
        assert_eq!(rule.apply(json!({"a": {"b": 42}})), json!(42));
    }

    #[test]
    fn variable_extract_is_a_noop_on_missing_path() {
        let rule = VariableExtract { key_path: "missing".to_string() };
        assert_eq!(rule.apply(json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn content_type_convert_parses_json_looking_strings() {
        let rule = ContentTypeConvert;
        assert_eq!(rule.apply(json!("{\"x\": 1}")), json!({"x": 1}));
        assert_eq!(rule.apply(json!("plain text")), json!("plain text"));
    }

    #[test]
    fn content_type_convert_is_idempotent_on_already_parsed_values() {
        let rule = ContentTypeConvert;
        let once = rule.apply(json!("{\"x\": 1}"));
        let twice = rule.apply(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn extract_port_prefers_outputs_then_falls_back_to_value() {
        let source = json!({"value": "fallback", "outputs": {"port_a": "direct"}});
        assert_eq!(extract_port(&source, "port_a"), Some(json!("direct")));
        assert_eq!(extract_port(&source, "port_b"), Some(json!("fallback")));
    }

    #[test]
    fn registry_applies_rules_in_order() {
        let registry = RuleRegistry::new().freeze();
        let rules = vec![
            TransformRuleKind::VariableExtract { key_path: "a".to_string() },
            TransformRuleKind::FormatString { template: "got {value}".to_string() },
        ];
        let out = registry.apply_all(&rules, json!({"a": "x"}));
        assert_eq!(out, json!("got x"));
    }

    struct Double;
    impl CustomRule for Double {
        fn apply(&self, value: Value, _params: &Value) -> Value {
            value.as_i64().map(|n| json!(n * 2)).unwrap_or(value)
        }
    }

    #[test]
    fn custom_rule_is_reachable_once_registered() {
        let mut registry = RuleRegistry::new();
        registry.register("double", Arc::new(Double));
        let registry = registry.freeze();

        let rules = vec![TransformRuleKind::Custom { name: "double".to_string(), params: Value::Null }];
        assert_eq!(registry.apply_all(&rules, json!(21)), json!(42));
    }

    #[test]
    fn unregistered_custom_rule_leaves_value_unchanged() {
        let registry = RuleRegistry::new().freeze();
        let rules = vec![TransformRuleKind::Custom { name: "nope".to_string(), params: Value::Null }];
        assert_eq!(registry.apply_all(&rules, json!(21)), json!(21));
    }

    #[test]
    #[should_panic(expected = "registry is frozen")]
    fn registering_after_freeze_panics() {
        // `freeze` consumes `self` into an `Arc`, so the type system
        // already stops ordinary callers from reaching `register` past
        // that point; this exercises the internal guard directly.
        let mut registry = RuleRegistry::new();
        registry.frozen = true;
        registry.register("late", Arc::new(Double));
    }
}
