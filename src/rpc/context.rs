//! Per-call context handed explicitly to every handler

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, trace};

use crate::auth::Identity;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal log level: {0}")]
pub struct IllegalLogLevel(pub u8);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallContext {
    pub client_ip: Option<String>,
    pub user_id: Option<String>,
    pub authenticated: bool,
    pub token: Option<String>,
    pub module: Option<String>,
    pub method: Option<String>,
    pub call_id: Option<Value>,
}

impl CallContext {
    /// Context for one HTTP request, before any method has been resolved.
    pub fn new(client_ip: Option<String>) -> Self {
        Self {
            client_ip,
            ..Self::default()
        }
    }

    /// Derives the context of a single call. Identity fields start empty;
    /// they are filled by authentication.
    pub fn for_call(&self, module: &str, method: &str, call_id: Option<Value>) -> Self {
        Self {
            client_ip: self.client_ip.clone(),
            module: Some(module.to_string()),
            method: Some(method.to_string()),
            call_id,
            ..Self::default()
        }
    }

    pub fn set_identity(&mut self, identity: Identity, token: &str) {
        self.user_id = Some(identity.user_id);
        self.authenticated = true;
        self.token = Some(token.to_string());
    }

    pub fn log_err(&self, message: &str) {
        error!(
            client_ip = self.client_ip.as_deref().unwrap_or("-"),
            user_id = self.user_id.as_deref().unwrap_or("-"),
            module = self.module.as_deref().unwrap_or("-"),
            method = self.method.as_deref().unwrap_or("-"),
            call_id = %self.call_id_display(),
            "{message}"
        );
    }

    pub fn log_info(&self, message: &str) {
        info!(
            client_ip = self.client_ip.as_deref().unwrap_or("-"),
            user_id = self.user_id.as_deref().unwrap_or("-"),
            module = self.module.as_deref().unwrap_or("-"),
            method = self.method.as_deref().unwrap_or("-"),
            call_id = %self.call_id_display(),
            "{message}"
        );
    }

    /// Debug levels 1 to 3, from coarse to finest.
    pub fn log_debug(&self, message: &str, level: u8) -> Result<(), IllegalLogLevel> {
        let client_ip = self.client_ip.as_deref().unwrap_or("-");
        let user_id = self.user_id.as_deref().unwrap_or("-");
        let module = self.module.as_deref().unwrap_or("-");
        let method = self.method.as_deref().unwrap_or("-");
        let call_id = self.call_id_display();

        match level {
            1 => debug!(client_ip, user_id, module, method, %call_id, debug_level = 1, "{message}"),
            2 | 3 => {
                trace!(client_ip, user_id, module, method, %call_id, debug_level = level, "{message}")
            }
            other => return Err(IllegalLogLevel(other)),
        }
        Ok(())
    }

    fn call_id_display(&self) -> String {
        self.call_id
            .as_ref()
            .map(|id| match id {
                Value::String(id) => id.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "-".to_string())
    }
}
