//! Phase 2 — CONNECTION_RESOLUTION: derive each edge's output/input port
//! names, attach content type, and verify condition-branch wiring
//! (spec §4.1).

use crate::compiled::types::{Diagnostic, RuntimeHints};
use crate::domain::{ContentType, DataType, DomainDiagram, DomainHandle, HandleLabel, NodeType};
use crate::ids::{ArrowId, NodeId};

/// Content type an arrow takes on when the author left it unspecified,
/// inferred from the source handle's declared data type.
fn default_content_type(source: &DomainHandle) -> ContentType {
    match source.data_type {
        DataType::String => ContentType::RawText,
        DataType::Object | DataType::Array => ContentType::Object,
        DataType::Any => ContentType::Generic,
        DataType::Number | DataType::Boolean => ContentType::Variable,
    }
}

/// An arrow after port names and hints have been derived, still missing
/// its transformation rules (added by the next phase).
#[derive(Clone, Debug)]
pub struct ResolvedEdge {
    pub id: ArrowId,
    pub source_node: NodeId,
    pub target_node: NodeId,
    pub source_output_port: String,
    pub target_input_port: String,
    pub content_type: ContentType,
    pub runtime_hints: RuntimeHints,
}

fn label_str(label: HandleLabel) -> &'static str {
    match label {
        HandleLabel::Default => "default",
        HandleLabel::First => "first",
        HandleLabel::CondTrue => "condtrue",
        HandleLabel::CondFalse => "condfalse",
        HandleLabel::Success => "success",
        HandleLabel::Error => "error",
        HandleLabel::Results => "results",
    }
}

pub fn run(diagram: &DomainDiagram) -> (Vec<ResolvedEdge>, Vec<Diagnostic>) {
    let mut edges = Vec::with_capacity(diagram.arrows.len());
    let mut diags = Vec::new();

    for arrow in diagram.arrows.values() {
        let (Some(source), Some(target)) = (diagram.handles.get(&arrow.source), diagram.handles.get(&arrow.target))
        else {
            // Already reported by STRUCTURAL; skip to avoid duplicate diagnostics.
            continue;
        };

        let source_node_type = diagram.nodes.get(&source.node_id).map(|n| n.node_type);

        if matches!(source.label, HandleLabel::CondTrue | HandleLabel::CondFalse)
            && source_node_type != Some(NodeType::Condition)
        {
            diags.push(
                Diagnostic::error(
                    "E_BRANCH_WITHOUT_CONDITION_PARENT",
                    "condtrue/condfalse source handle has no CONDITION node parent",
                )
                .at_arrow(arrow.id.clone()),
            );
        }

        let content_type = arrow.content_type.unwrap_or_else(|| default_content_type(source));

        let runtime_hints = RuntimeHints {
            is_conditional_branch: matches!(source.label, HandleLabel::CondTrue | HandleLabel::CondFalse),
            is_first_only: target.label == HandleLabel::First || label_str(target.label).ends_with("_first"),
            is_conversation_state: content_type == ContentType::ConversationState,
        };

        edges.push(ResolvedEdge {
            id: arrow.id.clone(),
            source_node: source.node_id.clone(),
            target_node: target.node_id.clone(),
            source_output_port: label_str(source.label).to_string(),
            target_input_port: label_str(target.label).to_string(),
            content_type,
            runtime_hints,
        });
    }

    (edges, diags)
}
