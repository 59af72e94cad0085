//! Wire-format tests for the network backends, served by wiremock.

#![cfg(all(feature = "openai", feature = "anthropic", feature = "ollama"))]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use parley_agent::{builtin_tools, create_model, BackendConfig, Orchestrator, Provider};
use parley_core::ParleyError;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_config(server: &MockServer) -> BackendConfig {
    BackendConfig::new(Provider::OpenAi)
        .with_base_url(server.uri())
        .with_api_key("sk-test")
        .with_model("gpt-test")
}

#[tokio::test]
async fn test_openai_request_shape_and_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-test",
            "messages": [
                {"role": "system"},
                {"role": "user", "content": "select walls"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Done."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orch = Orchestrator::new(openai_config(&server)).unwrap();
    assert_eq!(orch.chat("select walls", "s1").await.unwrap(), "Done.");
}

#[tokio::test]
async fn test_openai_sends_tools_when_enabled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "tools": [
                {"type": "function", "function": {"name": "select_elements_by_category"}},
                {"type": "function", "function": {"name": "run_script"}}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "with tools"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orch = Orchestrator::new(openai_config(&server).with_tools(true)).unwrap();
    assert_eq!(orch.chat("hi", "s1").await.unwrap(), "with tools");
}

#[tokio::test]
async fn test_openai_error_status_is_model_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let orch = Orchestrator::new(openai_config(&server)).unwrap();
    let err = orch.chat("hi", "s1").await.unwrap_err();
    match err {
        ParleyError::ModelInvocationFailed(msg) => {
            assert!(msg.contains("429"), "{msg}");
            assert!(msg.contains("rate limited"), "{msg}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_anthropic_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "ant-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({
            "system": "Be brief.",
            "messages": [{"role": "user", "content": "hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": "Hi."}],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = BackendConfig::new(Provider::Anthropic)
        .with_base_url(server.uri())
        .with_api_key("ant-key");
    let orch = Orchestrator::new(config)
        .unwrap()
        .with_system_prompt("Be brief.");
    assert_eq!(orch.chat("hello", "s1").await.unwrap(), "Hi.");
}

#[tokio::test]
async fn test_ollama_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama-test",
            "stream": false,
            "options": {"temperature": 0.0}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": {"role": "assistant", "content": "local reply"},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = BackendConfig::new(Provider::Ollama)
        .with_base_url(server.uri())
        .with_model("llama-test");
    let orch = Orchestrator::new(config).unwrap();
    assert_eq!(orch.chat("hi", "s1").await.unwrap(), "local reply");
}

#[tokio::test]
async fn test_ollama_empty_content_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": {"role": "assistant", "content": ""},
            "done": true
        })))
        .mount(&server)
        .await;

    let config = BackendConfig::new(Provider::Ollama).with_base_url(server.uri());
    let orch = Orchestrator::new(config).unwrap();
    let err = orch.chat("hi", "s1").await.unwrap_err();
    assert!(matches!(err, ParleyError::ModelInvocationFailed(_)));
}

#[tokio::test]
async fn test_network_models_accept_tool_binding() {
    let server = MockServer::start().await;
    for config in [
        openai_config(&server),
        BackendConfig::new(Provider::Anthropic)
            .with_base_url(server.uri())
            .with_api_key("k"),
        BackendConfig::new(Provider::Ollama).with_base_url(server.uri()),
    ] {
        let model = create_model(&config).unwrap();
        let bound = model.bind_tools(&builtin_tools()).unwrap();
        assert_eq!(bound.bound_tools().len(), 2);
        assert!(model.bound_tools().is_empty());
    }
}
