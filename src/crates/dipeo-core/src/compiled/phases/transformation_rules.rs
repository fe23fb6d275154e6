//! Phase 3 — TRANSFORMATION_RULES: pre-compute the ordered list of
//! transformation rules each edge applies at runtime (spec §4.1, §4.4).
//!
//! Rules are derived from the arrow's `data` (authoring-time overrides)
//! and its resolved content type; no closures are produced here, only
//! serialisable [`TransformRuleKind`] tags the runtime interprets.

use serde_json::Value;

use crate::compiled::phases::connection_resolution::ResolvedEdge;
use crate::compiled::types::TransformRuleKind;
use crate::domain::{ContentType, DomainDiagram};

/// Build the rule list for one resolved edge by reading the corresponding
/// arrow's `data` object for optional rule configuration.
fn rules_for(edge: &ResolvedEdge, arrow_data: &Value) -> Vec<TransformRuleKind> {
    let mut rules = Vec::new();

    if let Some(key_path) = arrow_data.get("extract_variable").and_then(Value::as_str) {
        rules.push(TransformRuleKind::VariableExtract { key_path: key_path.to_string() });
    }

    if let Some(template) = arrow_data.get("format_string").and_then(Value::as_str) {
        rules.push(TransformRuleKind::FormatString { template: template.to_string() });
    }

    if edge.content_type == ContentType::Object {
        rules.push(TransformRuleKind::ContentTypeConvert);
    }

    if arrow_data.get("extract_tool_results").and_then(Value::as_bool).unwrap_or(false) {
        rules.push(TransformRuleKind::ExtractToolResults);
    }

    if edge.runtime_hints.is_conditional_branch {
        rules.push(TransformRuleKind::BranchOnCondition);
    }

    if let Some(custom_rules) = arrow_data.get("custom_rules").and_then(Value::as_array) {
        for entry in custom_rules {
            let Some(name) = entry.get("name").and_then(Value::as_str) else { continue };
            let params = entry.get("params").cloned().unwrap_or(Value::Null);
            rules.push(TransformRuleKind::Custom { name: name.to_string(), params });
        }
    }

    rules
}

pub fn run(diagram: &DomainDiagram, edges: &[ResolvedEdge]) -> Vec<Vec<TransformRuleKind>> {
    edges
        .iter()
        .map(|edge| {
            let data = diagram.arrows.get(&edge.id).map(|a| &a.data);
            match data {
                Some(d) => rules_for(edge, d),
                None => Vec::new(),
            }
        })
        .collect()
}
