//! One [`Handler`] per [`NodeType`] (spec §6), wired into a
//! [`HandlerRegistry`] by [`build_registry`].
//!
//! These are the "in-memory/stub adapters sufficient for the scenarios in
//! spec §8" the composition root owns — each is clearly documented where
//! it cuts a corner a real deployment would fill in with a concrete
//! adapter (an LLM client, a sandboxed code runner, a real shell sandbox).
//! `START` has no entry here: the engine seeds start nodes directly
//! (`Engine::seed_start_node`) and never looks one up in the registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dipeo_core::{ConditionType, ContentType, DomainPerson, Envelope, NodeConfig, NodeType};
use dipeo_runtime::handler::{ExecutionContext, Handler};
use dipeo_runtime::{HandlerRegistry, RuntimeError};
use serde_json::{json, Value};

fn output(key: &str, body: Value, ctx: &ExecutionContext) -> HashMap<String, Envelope> {
    let mut outputs = HashMap::new();
    outputs.insert(
        key.to_string(),
        Envelope::new(body, ctx.node_id.clone(), ctx.execution_id.clone(), ContentType::Generic),
    );
    outputs
}

fn merged_body(inputs: &HashMap<String, Envelope>) -> Value {
    if inputs.len() == 1 {
        return inputs.values().next().unwrap().body.clone();
    }
    let map = inputs.iter().map(|(k, v)| (k.clone(), v.body.clone())).collect();
    Value::Object(map)
}

/// `ENDPOINT` collects its inputs as the diagram's final output; it does
/// no transformation of its own.
struct EndpointHandler;

#[async_trait]
impl Handler for EndpointHandler {
    async fn execute(
        &self,
        _config: &NodeConfig,
        inputs: HashMap<String, Envelope>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, Envelope>, RuntimeError> {
        Ok(output("default", merged_body(&inputs), ctx))
    }
}

/// `PERSON_JOB` calls [`dipeo_core::ports::LlmService`] when one is wired.
///
/// The node only carries a `person_id`; the full [`DomainPerson`] record
/// (model, service, system prompt) lives on the diagram, not on
/// `ExecutionContext`. Lacking that plumbing, this stub synthesizes a
/// minimal `DomainPerson` from the id alone — good enough to exercise a
/// configured `LlmService`, not a substitute for resolving the real
/// person record.
struct PersonJobHandler;

#[async_trait]
impl Handler for PersonJobHandler {
    async fn execute(
        &self,
        config: &NodeConfig,
        inputs: HashMap<String, Envelope>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, Envelope>, RuntimeError> {
        let NodeConfig::PersonJob { person_id, .. } = config else {
            return Err(RuntimeError::Internal("PersonJobHandler invoked for a non-PERSON_JOB node".into()));
        };

        let llm = ctx
            .services
            .llm
            .as_ref()
            .ok_or_else(|| RuntimeError::Internal("no LlmService configured for this execution".into()))?;

        let person = DomainPerson {
            id: dipeo_core::PersonId::from(person_id.as_str()),
            model: "unspecified".to_string(),
            service: "unspecified".to_string(),
            api_key_id: None,
            system_prompt: None,
        };

        let messages: Vec<Value> = inputs.values().map(|e| e.body.clone()).collect();

        let envelope = llm
            .chat(&person, &messages, &[])
            .await
            .map_err(|e| RuntimeError::ExternalService { node: ctx.node_id.clone(), message: e.to_string(), retryable: true })?;

        let mut outputs = HashMap::new();
        outputs.insert("default".to_string(), envelope);
        Ok(outputs)
    }
}

/// `CONDITION` routes to exactly one of `condtrue`/`condfalse` (spec §3
/// invariant 5). Evaluation is intentionally minimal — a full expression
/// language is out of scope for this composition root:
///
/// - `DETECT_MAX_ITERATIONS` counts firings per node itself (the engine's
///   own count, kept by its state tracker, isn't exposed through
///   [`ExecutionContext`]) and switches to `condfalse` once the count
///   reaches `max_iterations`.
/// - `CHECK_NODES_EXECUTED` treats "executed" as "this firing received an
///   input produced by that node".
/// - `CUSTOM` treats `expression` as a key into the execution's variables
///   and checks it for truthiness (non-empty string/array/object,
///   non-zero number, `true`).
#[derive(Default)]
struct ConditionHandler {
    fired: parking_lot::Mutex<HashMap<dipeo_core::NodeId, u32>>,
}

#[async_trait]
impl Handler for ConditionHandler {
    async fn execute(
        &self,
        config: &NodeConfig,
        inputs: HashMap<String, Envelope>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, Envelope>, RuntimeError> {
        let NodeConfig::Condition { condition } = config else {
            return Err(RuntimeError::Internal("ConditionHandler invoked for a non-CONDITION node".into()));
        };

        let branch_true = match condition {
            ConditionType::DetectMaxIterations { max_iterations } => {
                let count = {
                    let mut fired = self.fired.lock();
                    let count = fired.entry(ctx.node_id.clone()).or_insert(0);
                    *count += 1;
                    *count
                };
                count < *max_iterations
            }
            ConditionType::CheckNodesExecuted { nodes } => {
                nodes.iter().all(|n| inputs.values().any(|e| &e.produced_by == n))
            }
            ConditionType::Custom { expression } => is_truthy(ctx.variables.get(expression)),
        };

        let key = if branch_true { "condtrue" } else { "condfalse" };
        Ok(output(key, merged_body(&inputs), ctx))
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// `CODE_JOB` only executes `language = "json"` bodies (the code string is
/// parsed as a JSON literal and returned verbatim); every other language
/// is explicitly out of scope for this stub and fails with a retryable
/// `Internal` error rather than silently no-opping.
struct CodeJobHandler;

#[async_trait]
impl Handler for CodeJobHandler {
    async fn execute(
        &self,
        config: &NodeConfig,
        _inputs: HashMap<String, Envelope>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, Envelope>, RuntimeError> {
        let NodeConfig::CodeJob { language, code } = config else {
            return Err(RuntimeError::Internal("CodeJobHandler invoked for a non-CODE_JOB node".into()));
        };

        if language != "json" {
            return Err(RuntimeError::HandlerFailed {
                node: ctx.node_id.clone(),
                message: format!("code execution for language '{language}' is not wired in this composition root"),
                retryable: false,
                attempt: 1,
            });
        }

        let value: Value = serde_json::from_str(code).map_err(|e| RuntimeError::HandlerFailed {
            node: ctx.node_id.clone(),
            message: format!("invalid JSON literal: {e}"),
            retryable: false,
            attempt: 1,
        })?;

        Ok(output("default", value, ctx))
    }
}

/// `API_JOB` has no wired HTTP client in this composition root (spec §1
/// scope keeps concrete transports out); it fails clearly rather than
/// pretending to make a request.
struct ApiJobHandler;

#[async_trait]
impl Handler for ApiJobHandler {
    async fn execute(
        &self,
        config: &NodeConfig,
        _inputs: HashMap<String, Envelope>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, Envelope>, RuntimeError> {
        let NodeConfig::ApiJob { url, method } = config else {
            return Err(RuntimeError::Internal("ApiJobHandler invoked for a non-API_JOB node".into()));
        };
        Err(RuntimeError::HandlerFailed {
            node: ctx.node_id.clone(),
            message: format!("no HTTP client configured for this execution ({method} {url})"),
            retryable: false,
            attempt: 1,
        })
    }
}

/// `SHELL_JOB` runs `config.command` through `/bin/sh -c` (or `cmd /C` on
/// Windows) and returns its captured stdout. This is a real, functioning
/// adapter — shelling out needs no service port.
struct ShellJobHandler;

#[async_trait]
impl Handler for ShellJobHandler {
    async fn execute(
        &self,
        config: &NodeConfig,
        _inputs: HashMap<String, Envelope>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, Envelope>, RuntimeError> {
        let NodeConfig::ShellJob { command } = config else {
            return Err(RuntimeError::Internal("ShellJobHandler invoked for a non-SHELL_JOB node".into()));
        };

        let mut cmd = if cfg!(windows) {
            let mut c = tokio::process::Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = tokio::process::Command::new("sh");
            c.arg("-c").arg(command);
            c
        };

        let result = cmd.output().await.map_err(|e| RuntimeError::HandlerFailed {
            node: ctx.node_id.clone(),
            message: format!("failed to spawn shell: {e}"),
            retryable: true,
            attempt: 1,
        })?;

        if !result.status.success() {
            return Err(RuntimeError::HandlerFailed {
                node: ctx.node_id.clone(),
                message: format!(
                    "command exited with {}: {}",
                    result.status,
                    String::from_utf8_lossy(&result.stderr)
                ),
                retryable: false,
                attempt: 1,
            });
        }

        let stdout = String::from_utf8_lossy(&result.stdout).to_string();
        Ok(output("default", json!({ "stdout": stdout }), ctx))
    }
}

/// `DB_READ` has no wired database in this composition root; it fails
/// clearly rather than returning fabricated rows.
struct DbReadHandler;

#[async_trait]
impl Handler for DbReadHandler {
    async fn execute(
        &self,
        config: &NodeConfig,
        _inputs: HashMap<String, Envelope>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, Envelope>, RuntimeError> {
        let NodeConfig::DbRead { query } = config else {
            return Err(RuntimeError::Internal("DbReadHandler invoked for a non-DB_READ node".into()));
        };
        Err(RuntimeError::HandlerFailed {
            node: ctx.node_id.clone(),
            message: format!("no database configured for this execution (query: {query})"),
            retryable: false,
            attempt: 1,
        })
    }
}

/// `TEMPLATE_RENDER` delegates to [`dipeo_core::ports::TemplateRenderer`]
/// when one is wired, passing the merged inputs as template variables.
struct TemplateRenderHandler;

#[async_trait]
impl Handler for TemplateRenderHandler {
    async fn execute(
        &self,
        config: &NodeConfig,
        inputs: HashMap<String, Envelope>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, Envelope>, RuntimeError> {
        let NodeConfig::TemplateRender { template } = config else {
            return Err(RuntimeError::Internal("TemplateRenderHandler invoked for a non-TEMPLATE_RENDER node".into()));
        };

        let renderer = ctx
            .services
            .templates
            .as_ref()
            .ok_or_else(|| RuntimeError::Internal("no TemplateRenderer configured for this execution".into()))?;

        let mut vars = match ctx.variables.clone() {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        for (k, v) in &inputs {
            vars.insert(k.clone(), v.body.clone());
        }

        let rendered = renderer
            .render(template, &Value::Object(vars))
            .await
            .map_err(|e| RuntimeError::HandlerFailed {
                node: ctx.node_id.clone(),
                message: e.to_string(),
                retryable: false,
                attempt: 1,
            })?;

        Ok(output("default", Value::String(rendered), ctx))
    }
}

/// `SUB_DIAGRAM` delegates to [`dipeo_core::ports::SubdiagramExecutor`].
struct SubDiagramHandler;

#[async_trait]
impl Handler for SubDiagramHandler {
    async fn execute(
        &self,
        config: &NodeConfig,
        inputs: HashMap<String, Envelope>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, Envelope>, RuntimeError> {
        let NodeConfig::SubDiagram { diagram_id } = config else {
            return Err(RuntimeError::Internal("SubDiagramHandler invoked for a non-SUB_DIAGRAM node".into()));
        };

        let executor = ctx
            .services
            .subdiagrams
            .as_ref()
            .ok_or_else(|| RuntimeError::Internal("no SubdiagramExecutor configured for this execution".into()))?;

        let envelope = executor
            .run(&dipeo_core::DiagramId::from(diagram_id.as_str()), merged_body(&inputs))
            .await
            .map_err(|e| RuntimeError::ExternalService { node: ctx.node_id.clone(), message: e.to_string(), retryable: false })?;

        let mut outputs = HashMap::new();
        outputs.insert("default".to_string(), envelope);
        Ok(outputs)
    }
}

/// `HOOK` is a side-channel notification point (spec's lifecycle hooks):
/// it logs the named event and passes its inputs through unchanged.
struct HookHandler;

#[async_trait]
impl Handler for HookHandler {
    async fn execute(
        &self,
        config: &NodeConfig,
        inputs: HashMap<String, Envelope>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, Envelope>, RuntimeError> {
        let NodeConfig::Hook { event } = config else {
            return Err(RuntimeError::Internal("HookHandler invoked for a non-HOOK node".into()));
        };
        tracing::info!(node = %ctx.node_id, event, "hook fired");
        Ok(if inputs.is_empty() { output("default", Value::Null, ctx) } else { inputs })
    }
}

/// Build the registry the composition root hands to `Engine::new`. Every
/// `NodeType` except `START` gets an entry; `START` is seeded directly by
/// the engine and never looked up.
pub fn build_registry() -> HandlerRegistry {
    let mut map: HashMap<NodeType, Arc<dyn Handler>> = HashMap::new();
    map.insert(NodeType::Endpoint, Arc::new(EndpointHandler));
    map.insert(NodeType::PersonJob, Arc::new(PersonJobHandler));
    map.insert(NodeType::Condition, Arc::new(ConditionHandler::default()));
    map.insert(NodeType::CodeJob, Arc::new(CodeJobHandler));
    map.insert(NodeType::ApiJob, Arc::new(ApiJobHandler));
    map.insert(NodeType::ShellJob, Arc::new(ShellJobHandler));
    map.insert(NodeType::DbRead, Arc::new(DbReadHandler));
    map.insert(NodeType::TemplateRender, Arc::new(TemplateRenderHandler));
    map.insert(NodeType::SubDiagram, Arc::new(SubDiagramHandler));
    map.insert(NodeType::Hook, Arc::new(HookHandler));
    HandlerRegistry::new(map)
}
