#![allow(dead_code)]

use carapace_mcp_runtime::{CarapaceClient, ToolDispatcher};
use serde_json::{Map, Value};
use wiremock::MockServer;

pub const API_KEY: &str = "sc_key_test123";

pub fn client_for(server: &MockServer) -> CarapaceClient {
    CarapaceClient::with_base_url(API_KEY, &server.uri())
        .expect("mock server uri is a valid base URL")
}

pub fn dispatcher_for(server: &MockServer) -> ToolDispatcher {
    ToolDispatcher::new(client_for(server))
}

/// Base URL on which nothing is listening.
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

pub fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("tool arguments must be an object, got {other}"),
    }
}

pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}
