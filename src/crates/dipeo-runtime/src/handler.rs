//! The `Handler` contract (leaf collaborators, spec §4.6): the engine
//! never knows what a node "does", only how to resolve its inputs, hand
//! them to its handler, and route the handler's outputs onward.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dipeo_core::envelope::Envelope;
use dipeo_core::ids::{ExecutionId, NodeId};
use dipeo_core::node_types::NodeConfig;
use dipeo_core::ports::{ApiKeyStore, FileSystemPort, LlmService, ParserService, SubdiagramExecutor, TemplateRenderer};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;

/// Shared, read-only service handles a handler may reach for. Optional:
/// a composition root wires only the adapters its diagrams need, and a
/// handler that needs an absent one fails with [`RuntimeError::Internal`].
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    pub llm: Option<Arc<dyn LlmService>>,
    pub filesystem: Option<Arc<dyn FileSystemPort>>,
    pub api_keys: Option<Arc<dyn ApiKeyStore>>,
    pub parser: Option<Arc<dyn ParserService>>,
    pub templates: Option<Arc<dyn TemplateRenderer>>,
    pub subdiagrams: Option<Arc<dyn SubdiagramExecutor>>,
}

/// Everything a handler needs besides its own resolved inputs: identity
/// of the current firing, variable scope, services, and a cooperative
/// cancellation signal.
pub struct ExecutionContext {
    pub execution_id: ExecutionId,
    pub node_id: NodeId,
    pub epoch: u64,
    pub variables: Value,
    pub services: ServiceRegistry,
    pub cancellation: CancellationToken,
}

impl ExecutionContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// One node type's execution behavior. Implementors are pure with
/// respect to scheduling — they never touch the token manager or state
/// tracker, only `inputs` and `ctx.services`.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn execute(
        &self,
        config: &NodeConfig,
        inputs: HashMap<String, Envelope>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, Envelope>, RuntimeError>;
}

/// Maps a [`dipeo_core::domain::NodeType`] to its [`Handler`]. Built once
/// at startup by the composition root and shared read-only across every
/// execution.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<HashMap<dipeo_core::domain::NodeType, Arc<dyn Handler>>>,
}

impl HandlerRegistry {
    pub fn new(handlers: HashMap<dipeo_core::domain::NodeType, Arc<dyn Handler>>) -> Self {
        Self { handlers: Arc::new(handlers) }
    }

    pub fn get(&self, node_type: &dipeo_core::domain::NodeType) -> Option<Arc<dyn Handler>> {
        self.handlers.get(node_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dipeo_core::domain::NodeType;

    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        async fn execute(
            &self,
            _config: &NodeConfig,
            inputs: HashMap<String, Envelope>,
            _ctx: &ExecutionContext,
        ) -> Result<HashMap<String, Envelope>, RuntimeError> {
            Ok(inputs)
        }
    }

    #[tokio::test]
    async fn registry_looks_up_a_handler_by_node_type() {
        let mut map: HashMap<dipeo_core::domain::NodeType, Arc<dyn Handler>> = HashMap::new();
        map.insert(NodeType::CodeJob, Arc::new(Echo));
        let registry = HandlerRegistry::new(map);

        assert!(registry.get(&NodeType::CodeJob).is_some());
        assert!(registry.get(&NodeType::Start).is_none());
    }
}
