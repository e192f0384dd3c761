//! The HMCP agent: JSON-RPC dispatch and the sampling extension.
//!
//! An [`AgentServer`] answers `initialize`, `ping` and
//! `sampling/createMessage`. Sampling is delegated to a [`SamplingHandler`]
//! registered with [`AgentServer::with_sampling_handler`]; without one every
//! sampling request is refused with `INVALID_REQUEST`.

use std::sync::Arc;

use async_trait::async_trait;
use hmcp_auth::AuthContext;
use serde_json::{Map, Value, json};

use crate::config::AgentConfig;
use crate::protocol::{
    CreateMessageParams, CreateMessageResult, EmptyResult, HMCP_EXTENSION_VERSION,
    Implementation, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    LATEST_PROTOCOL_VERSION, RequestId, ServerCapabilities, ServerResult, methods,
};

/// Who is asking for a completion.
#[derive(Debug, Clone)]
pub struct SamplingContext {
    pub request_id: RequestId,
    pub auth: AuthContext,
}

/// Produces completions for `sampling/createMessage`.
#[async_trait]
pub trait SamplingHandler: Send + Sync {
    async fn create_message(
        &self,
        context: &SamplingContext,
        params: CreateMessageParams,
    ) -> Result<CreateMessageResult, JsonRpcError>;
}

/// Refuses every sampling request.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSampling;

#[async_trait]
impl SamplingHandler for UnsupportedSampling {
    async fn create_message(
        &self,
        _context: &SamplingContext,
        _params: CreateMessageParams,
    ) -> Result<CreateMessageResult, JsonRpcError> {
        Err(JsonRpcError::invalid_request("Sampling not supported"))
    }
}

pub struct AgentServer {
    info: Implementation,
    instructions: Option<String>,
    sampling: Arc<dyn SamplingHandler>,
}

impl std::fmt::Debug for AgentServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentServer")
            .field("info", &self.info)
            .field("instructions", &self.instructions)
            .finish_non_exhaustive()
    }
}

impl AgentServer {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            info: Implementation {
                name: config.name.clone(),
                version: config.version.clone(),
            },
            instructions: config.instructions.clone(),
            sampling: Arc::new(UnsupportedSampling),
        }
    }

    /// Replaces the sampling handler.
    pub fn with_sampling_handler(mut self, handler: Arc<dyn SamplingHandler>) -> Self {
        self.sampling = handler;
        self
    }

    pub fn info(&self) -> &Implementation {
        &self.info
    }

    /// Capabilities with the HMCP extension under `experimental.hmcp`.
    pub fn capabilities(&self) -> ServerCapabilities {
        let mut experimental = Map::new();
        experimental.insert(
            "hmcp".to_string(),
            json!({ "sampling": true, "version": HMCP_EXTENSION_VERSION }),
        );
        ServerCapabilities { experimental }
    }

    pub fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: self.capabilities(),
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        }
    }

    /// Dispatches one request on behalf of an authorized caller.
    pub async fn handle(&self, request: JsonRpcRequest, auth: AuthContext) -> JsonRpcResponse {
        let id = request.id.clone();
        if let Err(e) = request.validate() {
            return JsonRpcResponse::error(Some(id), e);
        }

        let result = match request.method.as_str() {
            methods::INITIALIZE => Ok(ServerResult::Initialize(self.initialize_result())),
            methods::PING => Ok(ServerResult::Empty(EmptyResult {})),
            methods::CREATE_MESSAGE => self.create_message(id.clone(), request.params, auth).await,
            other => {
                tracing::debug!(method = %other, "Unknown method");
                Err(JsonRpcError::method_not_found(other))
            }
        };

        match result {
            Ok(result) => JsonRpcResponse::result(id, result),
            Err(error) => JsonRpcResponse::error(Some(id), error),
        }
    }

    async fn create_message(
        &self,
        request_id: RequestId,
        params: Option<Value>,
        auth: AuthContext,
    ) -> Result<ServerResult, JsonRpcError> {
        let params: CreateMessageParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;

        tracing::debug!(
            client_id = %auth.client_id,
            request_id = %request_id,
            messages = params.messages.len(),
            "Sampling request"
        );

        let context = SamplingContext { request_id, auth };
        self.sampling
            .create_message(&context, params)
            .await
            .map(ServerResult::CreateMessage)
    }
}
