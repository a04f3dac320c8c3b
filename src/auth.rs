use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::Deserialize;
use thiserror::Error;

use crate::{errors::RpcError, rpc::context::CallContext};

/// Per-method bearer token requirement, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    None,
    Optional,
    Required,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("identity service unreachable: {0}")]
    Unavailable(String),
    #[error("malformed identity service response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn validate(&self, token: &str) -> Result<Identity, IdentityError>;
}

/// Client for the session login endpoint of the auth service.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user_id: Option<String>,
    error_msg: Option<String>,
}

impl HttpIdentityProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| IdentityError::Unavailable(err.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn validate(&self, token: &str) -> Result<Identity, IdentityError> {
        let response = self
            .http
            .post(&self.url)
            .form(&[("token", token), ("fields", "user_id")])
            .send()
            .await
            .map_err(|err| IdentityError::Unavailable(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| IdentityError::Unavailable(err.to_string()))?;
        let parsed: Option<LoginResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let reason = parsed
                .and_then(|login| login.error_msg)
                .unwrap_or_else(|| format!("status {status}"));
            return Err(IdentityError::Rejected(reason));
        }

        let login = parsed.ok_or_else(|| IdentityError::Malformed(body.clone()))?;
        match login.user_id.filter(|user_id| !user_id.trim().is_empty()) {
            Some(user_id) => Ok(Identity { user_id }),
            None => Err(IdentityError::Rejected(
                login
                    .error_msg
                    .unwrap_or_else(|| "no user_id for token".to_string()),
            )),
        }
    }
}

/// Pulls the token out of the `Authorization` header. A `Bearer`/`OAuth`
/// scheme is optional; blank values count as absent.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = ["Bearer ", "OAuth "]
        .iter()
        .find_map(|scheme| {
            raw.get(..scheme.len())
                .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
                .map(|_| &raw[scheme.len()..])
        })
        .unwrap_or(raw)
        .trim();

    (!token.is_empty()).then(|| token.to_string())
}

/// Applies `policy` to the supplied token and records the outcome on `ctx`.
/// Validation failures only fail the call under [`AuthPolicy::Required`].
pub async fn authenticate(
    provider: &dyn IdentityProvider,
    service_name: &str,
    policy: AuthPolicy,
    token: Option<&str>,
    ctx: &mut CallContext,
) -> Result<(), RpcError> {
    match (policy, token) {
        (AuthPolicy::None, _) | (AuthPolicy::Optional, None) => Ok(()),
        (AuthPolicy::Required, None) => Err(RpcError::AuthenticationRequired {
            message: format!(
                "Authentication required for {service_name} but no authentication header was passed"
            ),
        }),
        (policy, Some(token)) => match provider.validate(token).await {
            Ok(identity) => {
                ctx.set_identity(identity, token);
                Ok(())
            }
            Err(err) if policy == AuthPolicy::Required => Err(RpcError::AuthenticationFailed {
                message: format!("Token validation failed: {err}"),
            }),
            Err(err) => {
                tracing::debug!(error = %err, "optional token rejected, continuing anonymously");
                Ok(())
            }
        },
    }
}
