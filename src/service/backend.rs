use async_trait::async_trait;
use serde_json::Value;

use crate::{errors::HandlerError, rpc::context::CallContext};

/// The computation behind the model service methods: model reconstruction,
/// flux balance analysis, gap filling and reconciliation. Lives outside this
/// crate; the catalogue only routes calls to it.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn invoke(
        &self,
        ctx: &CallContext,
        method: &str,
        input: Value,
    ) -> Result<Value, HandlerError>;
}

/// Backend for deployments without a model engine attached.
#[derive(Debug, Default)]
pub struct UnimplementedBackend;

impl UnimplementedBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelBackend for UnimplementedBackend {
    async fn invoke(
        &self,
        ctx: &CallContext,
        method: &str,
        _input: Value,
    ) -> Result<Value, HandlerError> {
        ctx.log_info("no model engine configured");
        Err(anyhow::anyhow!("{method} is not implemented by this deployment").into())
    }
}
