//! Execution Engine (C5, spec §4.5): the main loop that drives a diagram
//! from its start nodes to a terminal condition, one firing at a time.
//!
//! Grounded on the teacher's `pregel::loop_impl::PregelLoop` (the async
//! superstep loop driving ready tasks to completion) and `pregel::executor`
//! for the bounded concurrent fan-out shape.

use std::collections::HashMap;
use std::sync::Arc;

use dipeo_core::compiled::ExecutableDiagram;
use dipeo_core::domain::{ContentType, NodeType};
use dipeo_core::envelope::Envelope;
use dipeo_core::ids::{ExecutionId, NodeId};
use dipeo_core::node_types::{ConditionType, NodeConfig};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::RuntimeError;
use crate::handler::{ExecutionContext, HandlerRegistry, ServiceRegistry};
use crate::resolve::InputResolver;
use crate::retry::RetryPolicy;
use crate::state::{NodeStatus, StateTracker};
use crate::token::TokenManager;

/// Why the main loop stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Every endpoint fired and no ready nodes remain.
    Completed,
    /// No ready nodes and none running: the diagram stalled.
    Quiescent,
    /// Cancellation was requested and honored.
    Cancelled,
    /// An `INTERNAL` error aborted the whole execution.
    Fatal(RuntimeError),
}

/// Tunables for one run of the engine; everything else is derived from
/// the compiled diagram.
#[derive(Clone)]
pub struct EngineConfig {
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { concurrency: 1, retry: RetryPolicy::default() }
    }
}

/// Node ordering policy tie-break (spec §4.5): lower topological rank
/// first, then fewer prior executions, then lexicographic `NodeId`.
fn pick_next<'a>(ready: &'a [NodeId], diagram: &ExecutableDiagram, state: &StateTracker) -> &'a NodeId {
    ready
        .iter()
        .min_by_key(|id| {
            let rank = diagram.nodes.get(*id).map(|n| n.topological_rank).unwrap_or(u32::MAX);
            let count = state.execution_count(id);
            (rank, count, (*id).clone())
        })
        .expect("ready set is non-empty")
}

/// One pending handler dispatch awaited concurrently with others.
struct Dispatch {
    node: NodeId,
    epoch: u64,
    result: Result<HashMap<String, Envelope>, RuntimeError>,
}

/// Drives one diagram execution to completion against a [`HandlerRegistry`].
pub struct Engine {
    diagram: Arc<ExecutableDiagram>,
    tokens: TokenManager,
    state: StateTracker,
    resolver: InputResolver,
    handlers: HandlerRegistry,
    services: ServiceRegistry,
    execution_id: ExecutionId,
    variables: Value,
    cancellation: CancellationToken,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        diagram: Arc<ExecutableDiagram>,
        resolver: InputResolver,
        handlers: HandlerRegistry,
        services: ServiceRegistry,
        execution_id: ExecutionId,
        variables: Value,
        cancellation: CancellationToken,
        config: EngineConfig,
    ) -> Self {
        let state = StateTracker::new();
        let tokens = TokenManager::new(diagram.clone(), state.clone());
        Self { diagram, tokens, state, resolver, handlers, services, execution_id, variables, cancellation, config }
    }

    pub fn state(&self) -> &StateTracker {
        &self.state
    }

    /// Run until a terminal condition is reached. Takes `&self`: every
    /// field the loop mutates (`state`, `tokens`) is interior-mutable, so
    /// concurrent in-flight handler futures can borrow the engine
    /// immutably while earlier dispatches are still being awaited.
    pub async fn run(&self) -> Termination {
        for node in &self.diagram.start_nodes {
            self.seed_start_node(node).await;
        }

        let concurrency = self.config.concurrency.max(1);
        let mut in_flight: FuturesUnordered<_> = FuturesUnordered::new();

        loop {
            if self.cancellation.is_cancelled() {
                self.drain_cancelled(&mut in_flight).await;
                return Termination::Cancelled;
            }

            let ready = self.ready_nodes();

            if ready.is_empty() && in_flight.is_empty() {
                self.mark_unreached_nodes_skipped();
                return if self.all_endpoints_fired() { Termination::Completed } else { Termination::Quiescent };
            }

            if !ready.is_empty() && in_flight.len() < concurrency {
                let node = pick_next(&ready, &self.diagram, &self.state).clone();
                if let Some(dispatch) = self.dispatch_one(&node) {
                    in_flight.push(dispatch);
                }
                continue;
            }

            match in_flight.next().await {
                Some(completed) => {
                    if let Some(fatal) = self.finish_dispatch(completed) {
                        self.drain_cancelled(&mut in_flight).await;
                        return Termination::Fatal(fatal);
                    }
                }
                None => continue,
            }
        }
    }

    async fn seed_start_node(&self, node: &NodeId) {
        self.state.transition_to_running(node, self.tokens.current_epoch());
        let envelope = Envelope::new(self.variables.clone(), node.clone(), self.execution_id.clone(), ContentType::Variable);
        let mut outputs = HashMap::new();
        outputs.insert("default".to_string(), envelope.clone());
        self.state.transition_to_completed(node, Some(envelope));
        self.tokens.emit_outputs(node, &outputs, self.tokens.current_epoch());
    }

    fn ready_nodes(&self) -> Vec<NodeId> {
        self.diagram
            .nodes
            .keys()
            .filter(|id| !self.diagram.start_nodes.contains(*id))
            .filter(|id| !matches!(self.state.get(id).status, NodeStatus::MaxiterReached | NodeStatus::Aborted))
            .filter(|id| self.tokens.has_new_inputs(id, None))
            .cloned()
            .collect()
    }

    /// A branch the scheduler never reached (e.g. the sibling of a
    /// condition's taken branch) is reported as `SKIPPED` rather than
    /// left `PENDING` forever once the execution has gone terminal.
    fn mark_unreached_nodes_skipped(&self) {
        for id in self.diagram.nodes.keys() {
            if self.state.execution_count(id) == 0 && !self.diagram.start_nodes.contains(id) {
                self.state.transition_to_skipped(id, "never became ready before execution went terminal");
            }
        }
    }

    fn all_endpoints_fired(&self) -> bool {
        self.diagram
            .nodes
            .values()
            .filter(|n| n.node_type == NodeType::Endpoint)
            .all(|n| self.state.execution_count(&n.id) > 0)
    }

    fn dispatch_one<'a>(&'a self, node: &NodeId) -> Option<impl std::future::Future<Output = Dispatch> + 'a> {
        let config = self.diagram.nodes.get(node)?.config.clone();
        let node_type = self.diagram.nodes.get(node)?.node_type;
        let inputs = match self.resolver.resolve(&self.diagram, &self.tokens, node) {
            Ok(inputs) => inputs,
            Err(e) => {
                self.state.transition_to_failed(node, e.clone());
                return None;
            }
        };

        let epoch = self.tokens.current_epoch();
        self.state.transition_to_running(node, epoch);

        let handler = self.handlers.get(&node_type);
        let ctx = ExecutionContext {
            execution_id: self.execution_id.clone(),
            node_id: node.clone(),
            epoch,
            variables: self.variables.clone(),
            services: self.services.clone(),
            cancellation: self.cancellation.clone(),
        };
        let retry = self.config.retry;
        let node = node.clone();

        Some(async move {
            let Some(handler) = handler else {
                return Dispatch {
                    node: node.clone(),
                    epoch,
                    result: Err(RuntimeError::Internal(format!("no handler registered for node '{node}'"))),
                };
            };

            let mut attempt = 1u32;
            loop {
                match handler.execute(&config, inputs.clone(), &ctx).await {
                    Ok(outputs) => return Dispatch { node, epoch, result: Ok(outputs) },
                    Err(e) if e.is_retryable() && retry.should_retry(attempt) => {
                        tokio::time::sleep(retry.delay_for(attempt)).await;
                        attempt += 1;
                    }
                    Err(e) => return Dispatch { node, epoch, result: Err(e) },
                }
            }
        })
    }

    fn finish_dispatch(&self, dispatch: Dispatch) -> Option<RuntimeError> {
        let Dispatch { node, epoch, result } = dispatch;
        match result {
            Ok(outputs) => {
                self.handle_condition_completion(&node, &outputs);
                let default_output = outputs.get("default").or_else(|| outputs.values().next()).cloned();
                self.state.transition_to_completed(&node, default_output);
                self.tokens.emit_outputs(&node, &outputs, epoch);
                None
            }
            Err(e) => {
                error!(node = %node, error = %e, "node firing failed");
                self.state.transition_to_failed(&node, e.clone());
                if e.is_fatal() {
                    Some(e)
                } else {
                    None
                }
            }
        }
    }

    /// Loop-control bookkeeping for `CONDITION` nodes (spec §4.5):
    /// `DETECT_MAX_ITERATIONS` permanently routes to `condfalse` and
    /// parks loop-body nodes once the limit is reached.
    fn handle_condition_completion(&self, node: &NodeId, outputs: &HashMap<String, Envelope>) {
        let Some(executable_node) = self.diagram.nodes.get(node) else { return };
        let NodeConfig::Condition { condition } = &executable_node.config else { return };

        if let ConditionType::DetectMaxIterations { max_iterations } = condition {
            let count = self.state.execution_count(node);
            if count >= *max_iterations && outputs.contains_key("condfalse") {
                info!(node = %node, max_iterations, "max iterations reached, parking loop body");
                // Park only the nodes reached via the `condtrue` (loop-back)
                // edge — `parent_of_condition` also maps the `condfalse`
                // target, which is the exit path and must still complete.
                let loop_body: Vec<NodeId> = self
                    .diagram
                    .edges_out_of(node)
                    .filter(|e| e.source_output_port == "condtrue")
                    .map(|e| e.target_node.clone())
                    .collect();
                for child in loop_body {
                    self.state.transition_to_maxiter(&child);
                }
            }
        }
    }

    async fn drain_cancelled(&self, in_flight: &mut FuturesUnordered<impl std::future::Future<Output = Dispatch>>) {
        warn!(execution_id = %self.execution_id, "cancellation requested, awaiting in-flight handlers");
        while let Some(dispatch) = in_flight.next().await {
            self.state.transition_to_failed(&dispatch.node, RuntimeError::Cancelled { node: dispatch.node.clone() });
        }
    }
}
