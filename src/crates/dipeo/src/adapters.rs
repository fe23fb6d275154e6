//! In-process adapters for the [`dipeo_core::ports`] traits, wired by
//! [`build_services`] into the [`dipeo_runtime::handler::ServiceRegistry`]
//! the engine hands to every handler.
//!
//! None of these reach out to a real LLM provider, database, or HTTP
//! client — spec §1 keeps concrete transports out of scope, and this
//! composition root only needs adapters sufficient to exercise the
//! scenarios in spec §8. Each stub says so in its own doc comment; the
//! filesystem, API key, and template adapters are real.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use dipeo_core::ports::{ApiKeyStore, FileSystemPort, LlmService, ParserService, SubdiagramExecutor, TemplateRenderer};
use dipeo_core::{ApiKeyId, ContentType, CoreError, DiagramId, DomainPerson, Envelope, ExecutionId, NodeId};
use dipeo_runtime::handler::ServiceRegistry;

/// Returns a single canned reply; stands in for a real model call.
pub struct StubLlmService;

#[async_trait]
impl LlmService for StubLlmService {
    async fn chat(&self, person: &DomainPerson, messages: &[Value], _tools: &[Value]) -> Result<Envelope, CoreError> {
        let last_user_message = messages.last().cloned().unwrap_or(Value::Null);
        let body = serde_json::json!({
            "role": "assistant",
            "person_id": person.id.as_str(),
            "content": format!("stub response to: {last_user_message}"),
        });
        Ok(Envelope::new(body, NodeId::from("llm-stub"), ExecutionId::from("stub"), ContentType::Object))
    }
}

/// Reads and writes real files relative to the process's working
/// directory.
pub struct LocalFileSystem;

#[async_trait]
impl FileSystemPort for LocalFileSystem {
    async fn read(&self, path: &str) -> Result<Vec<u8>, CoreError> {
        tokio::fs::read(path).await.map_err(|e| CoreError::validation(format!("failed to read '{path}': {e}")))
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), CoreError> {
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| CoreError::validation(format!("failed to write '{path}': {e}")))
    }
}

/// Looks up `DIPEO_APIKEY_<ID>` in the process environment. Real, but
/// deliberately simple — no encrypted-at-rest store.
pub struct EnvApiKeyStore;

#[async_trait]
impl ApiKeyStore for EnvApiKeyStore {
    async fn get(&self, id: &ApiKeyId) -> Result<String, CoreError> {
        let var_name = format!("DIPEO_APIKEY_{}", id.as_str().to_uppercase().replace('-', "_"));
        std::env::var(&var_name)
            .map_err(|_| CoreError::validation(format!("no API key found in environment variable '{var_name}'")))
    }
}

/// Returns the source text unparsed, wrapped as a JSON string. Genuine
/// AST parsing (spec §1) is out of scope for this composition root.
pub struct PassthroughParser;

#[async_trait]
impl ParserService for PassthroughParser {
    async fn parse(&self, source: &str, _language: &str, _patterns: &[String]) -> Result<Value, CoreError> {
        Ok(Value::String(source.to_string()))
    }
}

/// Renders `{{key}}` placeholders against a flat JSON object of
/// variables. No conditionals, loops, or filters — a template engine
/// proper is out of scope here.
pub struct SimpleTemplateRenderer {
    placeholder: Regex,
}

impl SimpleTemplateRenderer {
    pub fn new() -> Self {
        Self { placeholder: Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("static pattern") }
    }
}

impl Default for SimpleTemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateRenderer for SimpleTemplateRenderer {
    async fn render(&self, template: &str, vars: &Value) -> Result<String, CoreError> {
        let mut missing = Vec::new();
        let rendered = self
            .placeholder
            .replace_all(template, |caps: &regex::Captures| {
                let key = &caps[1];
                match vars.get(key) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => {
                        missing.push(key.to_string());
                        String::new()
                    }
                }
            })
            .into_owned();

        if missing.is_empty() {
            Ok(rendered)
        } else {
            Err(CoreError::validation(format!("template references undefined variable(s): {}", missing.join(", "))))
        }
    }
}

/// Not wired: sub-diagram execution needs a diagram loader and a second
/// `Engine` instance, which this composition root does not yet set up
/// recursively. Fails clearly rather than silently no-opping.
pub struct UnwiredSubdiagramExecutor;

#[async_trait]
impl SubdiagramExecutor for UnwiredSubdiagramExecutor {
    async fn run(&self, diagram_id: &DiagramId, _inputs: Value) -> Result<Envelope, CoreError> {
        Err(CoreError::validation(format!("sub-diagram execution is not wired in this composition root (diagram '{diagram_id}')")))
    }
}

/// Assemble the [`ServiceRegistry`] the CLI hands to the engine. Every
/// port gets an adapter; callers that never reach a `PERSON_JOB`,
/// `SUB_DIAGRAM`, or `TEMPLATE_RENDER` node never notice the stubs.
pub fn build_services() -> ServiceRegistry {
    ServiceRegistry {
        llm: Some(Arc::new(StubLlmService)),
        filesystem: Some(Arc::new(LocalFileSystem)),
        api_keys: Some(Arc::new(EnvApiKeyStore)),
        parser: Some(Arc::new(PassthroughParser)),
        templates: Some(Arc::new(SimpleTemplateRenderer::new())),
        subdiagrams: Some(Arc::new(UnwiredSubdiagramExecutor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_llm_service_echoes_the_last_message() {
        let llm = StubLlmService;
        let person = DomainPerson { id: dipeo_core::PersonId::from("p1"), model: "x".into(), service: "x".into(), api_key_id: None, system_prompt: None };
        let messages = vec![serde_json::json!("hello")];
        let envelope = llm.chat(&person, &messages, &[]).await.unwrap();
        assert!(envelope.body["content"].as_str().unwrap().contains("hello"));
    }

    #[tokio::test]
    async fn template_renderer_substitutes_known_variables() {
        let renderer = SimpleTemplateRenderer::new();
        let rendered = renderer.render("hello {{name}}", &serde_json::json!({"name": "world"})).await.unwrap();
        assert_eq!(rendered, "hello world");
    }

    #[tokio::test]
    async fn template_renderer_rejects_undefined_variables() {
        let renderer = SimpleTemplateRenderer::new();
        let err = renderer.render("hello {{missing}}", &serde_json::json!({})).await.unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn unwired_subdiagram_executor_fails_clearly() {
        let executor = UnwiredSubdiagramExecutor;
        let err = executor.run(&DiagramId::from("d1"), Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("not wired"));
    }
}
