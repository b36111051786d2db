//! kmcp MCP server: exposes a [`ResourceApi`] as MCP resources over line-delimited JSON-RPC.
//!
//! Only the resource half of the protocol is implemented. stdout carries protocol frames and
//! nothing else; all logging goes through `tracing` to whatever writer the binary installed.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use kmcp_api::{KmcpError, ResourceApi};
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

pub mod rpc;

pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use rpc::{INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, RESOURCE_NOT_FOUND};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "kmcp";
/// The one URI template advertised to clients.
pub const URI_TEMPLATE: &str = "k8s://{kind}/{namespace}/{name}";

#[derive(Clone)]
pub struct McpServer {
    api: Arc<dyn ResourceApi>,
}

#[derive(Debug, Deserialize)]
struct ReadParams {
    uri: String,
}

impl McpServer {
    pub fn new(api: Arc<dyn ResourceApi>) -> Self { Self { api } }

    /// Dispatch one request. Notifications yield no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "mcp: request");
        counter!("kmcp_rpc_requests_total", 1u64);
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(request.id, INVALID_REQUEST, "jsonrpc must be \"2.0\""));
        }
        if request.is_notification() {
            debug!(method = %request.method, "mcp: notification");
            return None;
        }
        let id = request.id;
        let resp = match request.method.as_str() {
            "initialize" => self.initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "resources/list" => self.resources_list(id),
            "resources/templates/list" => JsonRpcResponse::success(
                id,
                json!({
                    "resourceTemplates": [{
                        "uriTemplate": URI_TEMPLATE,
                        "name": "Kubernetes object",
                        "description": "Summary of one pod, service or deployment",
                    }]
                }),
            ),
            "resources/read" => self.resources_read(id, request.params).await,
            other => {
                warn!(method = %other, "mcp: unknown method");
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}"))
            }
        };
        Some(resp)
    }

    /// Handle one raw line; returns the serialized response frame, if any.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let resp = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(req) => self.handle_request(req).await?,
            Err(e) => {
                warn!(error = %e, "mcp: unparseable frame");
                JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"))
            }
        };
        match serde_json::to_string(&resp) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %e, "mcp: failed to serialize response");
                None
            }
        }
    }

    fn initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!(protocol = PROTOCOL_VERSION, "mcp: initialize");
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "resources": { "subscribe": false, "listChanged": false } },
                "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
            }),
        )
    }

    fn resources_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let resources: Vec<Value> = self
            .api
            .list_advertised_resources()
            .into_iter()
            .map(|e| json!({ "uri": e.uri, "name": e.title, "description": e.description, "mimeType": e.content_type }))
            .collect();
        debug!(count = resources.len(), "mcp: resources/list");
        JsonRpcResponse::success(id, json!({ "resources": resources }))
    }

    async fn resources_read(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let params: ReadParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}")),
        };
        let t0 = Instant::now();
        match self.api.read_resource(&params.uri).await {
            Ok(out) => {
                debug!(uri = %params.uri, took_ms = %t0.elapsed().as_millis(), "mcp: resources/read ok");
                JsonRpcResponse::success(
                    id,
                    json!({ "contents": [{ "uri": params.uri, "mimeType": out.content_type, "text": out.text }] }),
                )
            }
            Err(e) => {
                let code = match &e {
                    KmcpError::Decode(_) => INVALID_PARAMS,
                    KmcpError::NotFound { .. } => RESOURCE_NOT_FOUND,
                    KmcpError::Gateway { .. } => INTERNAL_ERROR,
                };
                JsonRpcResponse::error_with_data(id, code, e.to_string(), Some(json!({ "uri": e.uri() })))
            }
        }
    }

    /// Serve frames from `reader` until EOF, one response line per request line.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.context("reading request frame")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(out) = self.handle_line(line).await {
                writer.write_all(out.as_bytes()).await.context("writing response frame")?;
                writer.write_all(b"\n").await.context("writing response frame")?;
                writer.flush().await.context("flushing response frame")?;
            }
        }
        info!("mcp: input closed");
        Ok(())
    }

    pub async fn serve_stdio(&self) -> Result<()> {
        info!("mcp: listening on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmcp_api::MockApi;

    fn server() -> McpServer { McpServer::new(Arc::new(MockApi::new())) }

    fn request(id: Option<Value>, method: &str) -> JsonRpcRequest {
        JsonRpcRequest { jsonrpc: "2.0".into(), id, method: method.into(), params: Value::Null }
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        assert!(server().handle_request(request(None, "notifications/initialized")).await.is_none());
        assert!(server().handle_request(request(None, "resources/list")).await.is_none());
    }

    #[tokio::test]
    async fn wrong_version_is_invalid_request() {
        let mut req = request(Some(json!(1)), "ping");
        req.jsonrpc = "1.0".into();
        let resp = server().handle_request(req).await.expect("reply");
        assert_eq!(resp.error.map(|e| e.code), Some(INVALID_REQUEST));
    }

    #[tokio::test]
    async fn garbage_is_a_parse_error() {
        let out = server().handle_line("{not json").await.expect("reply");
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["error"]["code"], PARSE_ERROR);
        assert_eq!(v["id"], Value::Null);
    }

    #[tokio::test]
    async fn gateway_failures_are_internal_errors() {
        let api = MockApi { gateway_failure: Some("etcd timeout".into()), ..MockApi::new() };
        let mut req = request(Some(json!(9)), "resources/read");
        req.params = json!({"uri": "k8s://service/default/web"});
        let resp = McpServer::new(Arc::new(api)).handle_request(req).await.expect("reply");
        let err = resp.error.expect("error");
        assert_eq!(err.code, INTERNAL_ERROR);
        assert!(err.message.contains("etcd timeout"));
        assert_eq!(err.data, Some(json!({"uri": "k8s://service/default/web"})));
    }

    #[tokio::test]
    async fn list_maps_catalog_fields() {
        let api = MockApi {
            entries: vec![kmcp_core::CatalogEntry {
                uri: "k8s://pod/a/b".into(),
                title: "Pod: a/b".into(),
                description: "Kubernetes Pod in namespace a (Status: Running)".into(),
                content_type: "application/json".into(),
            }],
            ..MockApi::new()
        };
        let resp = McpServer::new(Arc::new(api)).handle_request(request(Some(json!(1)), "resources/list")).await.expect("reply");
        let result = resp.result.expect("result");
        assert_eq!(result["resources"][0]["name"], "Pod: a/b");
        assert_eq!(result["resources"][0]["mimeType"], "application/json");
    }

    #[tokio::test]
    async fn read_without_uri_is_invalid_params() {
        let resp = server().handle_request(request(Some(json!(3)), "resources/read")).await.expect("reply");
        assert_eq!(resp.error.map(|e| e.code), Some(INVALID_PARAMS));
    }
}
