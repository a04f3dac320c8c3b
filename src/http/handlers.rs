//! Axum handler binding the RPC shell to HTTP
//!
//! Every path and method lands here. `OPTIONS` is answered with CORS headers
//! only; anything else is parsed and dispatched, and the outcome is always
//! reported in-band with status 200.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tracing::debug;

use crate::{
    auth::token_from_headers,
    errors::RpcError,
    rpc::{
        context::CallContext,
        request::ProtocolVersion,
        response::{encode, ResponseBody, ResponseEnvelope},
    },
    AppState,
};

pub async fn rpc_endpoint(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let allow_headers = parts
        .headers
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("authorization"));

    if parts.method == Method::OPTIONS {
        return rpc_response(Vec::new(), allow_headers);
    }

    let client_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let token = token_from_headers(&parts.headers);
    let declared = declared_length(&parts.headers);

    if declared > state.max_body_bytes {
        return error_response(
            RpcError::invalid_request(format!(
                "request body of {declared} bytes exceeds the {} byte limit",
                state.max_body_bytes
            )),
            allow_headers,
        );
    }

    let raw = match read_body(body, declared).await {
        Ok(raw) => raw,
        Err(err) => {
            return error_response(
                RpcError::invalid_request(format!("request body could not be read: {err}")),
                allow_headers,
            )
        }
    };

    let base = CallContext::new(client_ip);
    let payload = state
        .dispatcher
        .handle_body(&raw, &base, token.as_deref())
        .await
        .map(|body| encode(&body))
        .unwrap_or_default();

    rpc_response(payload, allow_headers)
}

const INITIAL_BODY_CAPACITY: usize = 64 * 1024;

/// `Content-Length` as sent; absent or unparsable means an empty body.
fn declared_length(headers: &HeaderMap) -> usize {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0)
}

async fn read_body(body: Body, declared: usize) -> Result<Vec<u8>, axum::Error> {
    let mut raw = Vec::with_capacity(declared.min(INITIAL_BODY_CAPACITY));
    let mut stream = body.into_data_stream();
    while raw.len() < declared {
        match stream.next().await {
            Some(chunk) => raw.extend_from_slice(&chunk?),
            None => break,
        }
    }

    if raw.len() < declared {
        debug!(declared, received = raw.len(), "request body shorter than declared");
    }
    raw.truncate(declared);
    Ok(raw)
}

fn error_response(err: RpcError, allow_headers: HeaderValue) -> Response {
    let envelope = ResponseEnvelope::failure(&err, None, ProtocolVersion::Version("1.1".into()));
    rpc_response(encode(&ResponseBody::Single(envelope)), allow_headers)
}

fn rpc_response(payload: Vec<u8>, allow_headers: HeaderValue) -> Response {
    (
        StatusCode::OK,
        [
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, allow_headers),
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            ),
            (header::CONTENT_LENGTH, HeaderValue::from(payload.len())),
        ],
        payload,
    )
        .into_response()
}
