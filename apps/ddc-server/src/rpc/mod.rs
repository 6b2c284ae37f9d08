//! JSON-RPC surface
//!
//! Requests are `{"method", "params": [args], "id"}` posted to `/rpc`; every
//! response is `{"id", "result", "error"}` with HTTP 200. Session failures
//! are reported inside the result's `Error` field. The envelope `error` is
//! only used when the call itself cannot be made.

pub mod builder;
pub mod extractor;
pub mod types;

use std::future::Future;

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::error::RpcError;
use crate::session::{self, SessionError};
use crate::state::AppState;

use types::{EmptyReply, ParseReply, PartReply, RegisterReply, SignatureReply};

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub id: Value,
    pub result: Value,
    pub error: Option<String>,
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result,
            error: None,
        }
    }

    fn failure(id: Value, error: RpcError) -> Self {
        Self {
            id,
            result: Value::Null,
            error: Some(error.to_string()),
        }
    }
}

// ============================================================================
// Replies
// ============================================================================

/// A result object with an `Error` field
pub(crate) trait Reply: Default {
    fn set_error(&mut self, error: String);
}

macro_rules! impl_reply {
    ($($reply:ty),* $(,)?) => {
        $(impl Reply for $reply {
            fn set_error(&mut self, error: String) {
                self.error = error;
            }
        })*
    };
}

impl_reply!(EmptyReply, RegisterReply, PartReply, ParseReply, SignatureReply);

/// Fold a session failure into the reply's `Error` field
pub(crate) fn respond<R: Reply>(result: session::Result<R>) -> R {
    match result {
        Ok(reply) => reply,
        Err(err) => {
            match &err {
                SessionError::Internal(_) => {
                    tracing::error!(code = err.code(), error = %err, "RPC call failed")
                }
                _ => tracing::info!(code = err.code(), error = %err, "RPC call failed"),
            }
            let mut reply = R::default();
            reply.set_error(err.to_string());
            reply
        }
    }
}

/// Record the session id on the current `rpc` span
pub(crate) fn record_session(id: &str) {
    tracing::Span::current().record("session_id", id);
}

/// Validate a caller-supplied part size
pub(crate) fn part_size(max_part_size: i64) -> session::Result<usize> {
    if max_part_size <= 0 {
        return Err(SessionError::Validation(
            "MaxPartSize must be positive".to_string(),
        ));
    }
    Ok(usize::try_from(max_part_size).unwrap_or(usize::MAX))
}

// ============================================================================
// Dispatch
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new().route("/rpc", post(handle_rpc))
}

async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Json<RpcResponse> {
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "Malformed RPC request");
            return Json(RpcResponse::failure(
                Value::Null,
                RpcError::InvalidRequest(e.to_string()),
            ));
        }
    };

    let span = tracing::info_span!(
        "rpc",
        method = %request.method,
        session_id = tracing::field::Empty
    );
    let id = request.id;

    let outcome = dispatch(&state, &request.method, request.params)
        .instrument(span)
        .await;

    Json(match outcome {
        Ok(result) => RpcResponse::success(id, result),
        Err(err) => {
            tracing::warn!(method = %request.method, code = err.code(), error = %err, "RPC request rejected");
            RpcResponse::failure(id, err)
        }
    })
}

async fn dispatch(state: &AppState, method: &str, params: Value) -> Result<Value, RpcError> {
    match method {
        "Builder.Register" => call(params, |args| builder::register(state, args)).await,
        "Builder.AppendDocumentPart" => {
            call(params, |args| builder::append_document_part(state, args)).await
        }
        "Builder.AppendSignature" => {
            call(params, |args| builder::append_signature(state, args)).await
        }
        "Builder.Build" => call(params, |args| builder::build(state, args)).await,
        "Builder.GetDDCPart" => call(params, |args| builder::get_ddc_part(state, args)).await,
        "Builder.Drop" => call(params, |args| drop_session(state, args)).await,
        "Extractor.Register" => call(params, |args| extractor::register(state, args)).await,
        "Extractor.AppendDDCPart" => {
            call(params, |args| extractor::append_ddc_part(state, args)).await
        }
        "Extractor.Parse" => call(params, |args| extractor::parse(state, args)).await,
        "Extractor.GetDocumentPart" => {
            call(params, |args| extractor::get_document_part(state, args)).await
        }
        "Extractor.GetSignature" => {
            call(params, |args| extractor::get_signature(state, args)).await
        }
        "Extractor.Drop" => call(params, |args| drop_session(state, args)).await,
        other => Err(RpcError::MethodNotFound(other.to_string())),
    }
}

async fn call<A, R, F, Fut>(params: Value, handler: F) -> Result<Value, RpcError>
where
    A: DeserializeOwned,
    R: Serialize,
    F: FnOnce(A) -> Fut,
    Fut: Future<Output = R>,
{
    let args = decode_params(params)?;
    let reply = handler(args).await;
    serde_json::to_value(reply).map_err(|e| RpcError::Internal(e.to_string()))
}

/// Unwrap the single positional argument; absent params mean `{}`
fn decode_params<A: DeserializeOwned>(params: Value) -> Result<A, RpcError> {
    let value = match params {
        Value::Array(mut items) => match items.len() {
            0 => Value::Null,
            1 => items.remove(0),
            n => {
                return Err(RpcError::InvalidParams(format!(
                    "expected one argument, got {}",
                    n
                )))
            }
        },
        other => other,
    };
    let value = match value {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(value).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

/// `Builder.Drop` and `Extractor.Drop`: remove the session, known or not
async fn drop_session(state: &AppState, args: types::SessionArgs) -> EmptyReply {
    record_session(&args.id);
    state.sessions().delete(&args.id).await;
    EmptyReply::default()
}
