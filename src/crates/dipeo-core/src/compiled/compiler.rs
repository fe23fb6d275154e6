//! The `Compiler`: drives the fixed five-phase pipeline over a
//! [`DomainDiagram`] and produces an [`ExecutableDiagram`] plus a
//! [`CompilationResult`] (spec §4.1).
//!
//! Mirrors the teacher's "builder drives an ordered phase list, collects
//! diagnostics" shape, generalized from one validation pass to five.

use crate::compiled::phases::{connection_resolution, indexing, node_factory, structural, transformation_rules};
use crate::compiled::types::{CompilationResult, ExecutableDiagram, ExecutableEdge, ExecutableNode};
use crate::domain::DomainDiagram;

/// Stateless; holds no configuration today but gives future compiler
/// options (e.g. early-stop-after-structural for pure validation use) a
/// home without changing the call site.
#[derive(Default)]
pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile `diagram`. Returns `None` for the executable diagram when
    /// STRUCTURAL reports any error — later phases are skipped in that
    /// case (spec §4.1 failure semantics).
    pub fn compile(&self, diagram: &DomainDiagram) -> (Option<ExecutableDiagram>, CompilationResult) {
        let mut result = CompilationResult::default();

        result.extend(structural::run(diagram));
        if !result.is_valid() {
            return (None, result);
        }

        let (resolved_edges, connection_diags) = connection_resolution::run(diagram);
        result.extend(connection_diags);
        if !result.is_valid() {
            return (None, result);
        }

        let rule_lists = transformation_rules::run(diagram, &resolved_edges);

        let (node_configs, factory_diags) = node_factory::run(diagram);
        result.extend(factory_diags);
        if !result.is_valid() {
            return (None, result);
        }

        let (index, index_diags) = indexing::run(diagram, &resolved_edges);
        result.extend(index_diags);

        let edges: Vec<ExecutableEdge> = resolved_edges
            .into_iter()
            .zip(rule_lists)
            .map(|(edge, transform_rules)| ExecutableEdge {
                id: edge.id,
                source_node: edge.source_node,
                target_node: edge.target_node,
                source_output_port: edge.source_output_port,
                target_input_port: edge.target_input_port,
                content_type: edge.content_type,
                transform_rules,
                runtime_hints: edge.runtime_hints,
            })
            .collect();

        let nodes = node_configs
            .into_iter()
            .map(|(id, config)| {
                let node_type = diagram.nodes[&id].node_type;
                let topological_rank = index.topological_rank.get(&id).copied().unwrap_or(u32::MAX);
                (id.clone(), ExecutableNode { id, node_type, config, topological_rank })
            })
            .collect();

        let executable = ExecutableDiagram {
            nodes,
            edges,
            incoming_by_node: index.incoming_by_node,
            outgoing_by_node: index.outgoing_by_node,
            start_nodes: index.start_nodes,
            parent_of_condition: index.parent_of_condition,
            metadata: diagram.metadata.clone(),
        };

        (Some(executable), result)
    }
}
