//! Request dispatch
//!
//! Drives each request record through lookup, authentication, argument
//! binding and invocation, and turns every failure along the way into an
//! error envelope. Nothing escapes this boundary as a fault: handler panics
//! are caught here as well.

use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tracing::{debug, warn};

use crate::{
    auth::{authenticate, IdentityProvider},
    errors::{panic_message, RpcError},
    rpc::{
        audit::redact_audit_params,
        context::CallContext,
        registry::MethodRegistry,
        request::{self, Params, ParsedEntry, ParsedPayload, ProtocolVersion, RequestRecord},
        response::{ResponseBody, ResponseEnvelope},
    },
};

pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
    identity: Arc<dyn IdentityProvider>,
    service_name: String,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<MethodRegistry>,
        identity: Arc<dyn IdentityProvider>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            identity,
            service_name: service_name.into(),
        }
    }

    /// Full pipeline for one HTTP body. `None` means there is nothing to
    /// send back (notifications only).
    pub async fn handle_body(
        &self,
        raw: &[u8],
        base: &CallContext,
        token: Option<&str>,
    ) -> Option<ResponseBody> {
        match request::parse(raw) {
            Ok(payload) => self.handle_payload(payload, base, token).await,
            Err(err) => Some(ResponseBody::Single(ResponseEnvelope::failure(
                &err,
                None,
                ProtocolVersion::Version("1.1".into()),
            ))),
        }
    }

    pub async fn handle_payload(
        &self,
        payload: ParsedPayload,
        base: &CallContext,
        token: Option<&str>,
    ) -> Option<ResponseBody> {
        match payload {
            ParsedPayload::Single(entry) => self
                .handle_entry(entry, base, token)
                .await
                .map(ResponseBody::Single),
            ParsedPayload::Batch(entries) => {
                let mut responses = Vec::with_capacity(entries.len());
                for entry in entries {
                    if let Some(response) = self.handle_entry(entry, base, token).await {
                        responses.push(response);
                    }
                }
                (!responses.is_empty()).then_some(ResponseBody::Batch(responses))
            }
        }
    }

    async fn handle_entry(
        &self,
        entry: ParsedEntry,
        base: &CallContext,
        token: Option<&str>,
    ) -> Option<ResponseEnvelope> {
        match entry {
            Ok(record) => self.handle_request(record, base, token).await,
            Err(rejected) => {
                debug!(error = %rejected.error, "rejected malformed request");
                Some(ResponseEnvelope::failure(
                    &rejected.error,
                    rejected.id,
                    rejected.version,
                ))
            }
        }
    }

    /// Handles one call. Notifications are executed but never answered.
    pub async fn handle_request(
        &self,
        record: RequestRecord,
        base: &CallContext,
        token: Option<&str>,
    ) -> Option<ResponseEnvelope> {
        let RequestRecord {
            method,
            params,
            id,
            version,
        } = record;
        let notification = id.is_none();

        let outcome = self
            .dispatch(&method, params, &version, id.clone(), base, token)
            .await;

        if notification {
            return None;
        }

        Some(match outcome {
            Ok(result) => ResponseEnvelope::success(result, id, version),
            Err(err) => ResponseEnvelope::failure(&err, id, version),
        })
    }

    async fn dispatch(
        &self,
        method: &str,
        params: Params,
        version: &ProtocolVersion,
        call_id: Option<serde_json::Value>,
        base: &CallContext,
        token: Option<&str>,
    ) -> Result<serde_json::Value, RpcError> {
        let entry = self.registry.lookup(method)?;
        let (module, short_name) = entry.split_name();
        let mut ctx = base.for_call(module, short_name, call_id);

        if let Err(err) = authenticate(
            self.identity.as_ref(),
            &self.service_name,
            entry.auth,
            token,
            &mut ctx,
        )
        .await
        {
            warn!(
                method = %method,
                client_ip = ctx.client_ip.as_deref().unwrap_or("-"),
                reason = err.name(),
                "authentication failure"
            );
            return Err(err);
        }

        let args = match params {
            Params::Named(_) if !version.supports_named_params() => {
                return Err(RpcError::Keyword {
                    version: version.display(),
                })
            }
            params => {
                debug!(
                    method = %method,
                    params = %redact_audit_params(&params),
                    "binding call params"
                );
                entry.signature.bind(params)?
            }
        };

        ctx.log_info("start method");
        let outcome = AssertUnwindSafe(entry.handler.call(&ctx, args))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.into_rpc_error()),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                Err(RpcError::server(
                    "An unexpected server error occurred",
                    Some(format!("handler for {method} panicked: {message}")),
                ))
            }
        };

        if let Err(RpcError::Server {
            trace: Some(trace), ..
        }) = &result
        {
            ctx.log_err(trace.lines().next().unwrap_or_default());
        }
        ctx.log_info("end method");

        result
    }
}
