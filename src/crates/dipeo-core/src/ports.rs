//! Narrow service port interfaces (spec §6). Concrete adapters (a real
//! LLM client, filesystem, database) are out of scope; the `dipeo` binary
//! wires stub/in-memory implementations sufficient for the scenarios in
//! spec §8.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::DomainPerson;
use crate::envelope::Envelope;
use crate::error::CoreError;
use crate::ids::{ApiKeyId, DiagramId, ExecutionId};

/// `LLMService.chat(person, messages, tools) -> Envelope`
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn chat(&self, person: &DomainPerson, messages: &[Value], tools: &[Value]) -> Result<Envelope, CoreError>;
}

/// `FileSystem.read(path) / .write(path, bytes)`
#[async_trait]
pub trait FileSystemPort: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>, CoreError>;
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), CoreError>;
}

/// `APIKeyStore.get(id) -> secret`
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn get(&self, id: &ApiKeyId) -> Result<String, CoreError>;
}

/// `ParserService.parse(source, language, patterns) -> AST`
///
/// The AST is left as an opaque `Value` — this port's concrete grammar
/// (TypeScript AST parsing) is explicitly out of scope (spec §1).
#[async_trait]
pub trait ParserService: Send + Sync {
    async fn parse(&self, source: &str, language: &str, patterns: &[String]) -> Result<Value, CoreError>;
}

/// `TemplateRenderer.render(template, vars) -> string`
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    async fn render(&self, template: &str, vars: &Value) -> Result<String, CoreError>;
}

/// `MessageStore.append(event) / .query(execution_id, range)`
///
/// The event type itself lives in `dipeo_events` (the crate that owns the
/// event taxonomy); this port is generic over a serialized event payload
/// to avoid a dependency cycle between `dipeo-core` and `dipeo-events`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, execution_id: &ExecutionId, sequence_no: u64, event_json: Value) -> Result<(), CoreError>;
    async fn query(&self, execution_id: &ExecutionId, from_seq: u64, to_seq: u64) -> Result<Vec<Value>, CoreError>;
}

/// `SubdiagramExecutor.run(diagram_id, inputs) -> Envelope`
#[async_trait]
pub trait SubdiagramExecutor: Send + Sync {
    async fn run(&self, diagram_id: &DiagramId, inputs: Value) -> Result<Envelope, CoreError>;
}
