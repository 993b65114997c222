//! Ollama client contract tests against a mock server

use parley::{Error, Message, ModelClient, ModelDirectory, OllamaClient};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_list_models_returns_names() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3:latest", "size": 4_661_224_676_u64},
                {"name": "mistral", "size": 4_109_865_159_u64}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), "llama3:latest");
    let models = client.list_models().await.unwrap();

    assert_eq!(models, vec!["llama3:latest", "mistral"]);
}

#[tokio::test]
async fn test_list_models_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503).set_body_string("loading"))
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), "mistral");
    let err = client.list_models().await.unwrap_err();

    match err {
        Error::Model(message) => {
            assert!(message.contains("503"), "{message}");
            assert!(message.contains("loading"), "{message}");
        }
        other => panic!("expected model error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_complete_sends_transcript_and_returns_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "model": "llama3:latest",
            "stream": false,
            "messages": [
                {"role": "system", "content": "Hello! The models are llama3:latest"},
                {"role": "user", "content": "hello"}
            ],
            "temperature": 0.5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3:latest",
            "message": {"role": "assistant", "content": "hi there"},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), "llama3:latest").with_temperature(0.5);
    let reply = client
        .complete(&[
            Message::system("Hello! The models are llama3:latest"),
            Message::user("hello"),
        ])
        .await
        .unwrap();

    assert_eq!(reply, "hi there");
}

#[tokio::test]
async fn test_complete_sends_bearer_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "ok"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), "mistral").with_api_key("sk-test");
    assert_eq!(client.complete(&[Message::user("hi")]).await.unwrap(), "ok");
}

#[tokio::test]
async fn test_complete_rejects_non_2xx() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), "mistral");
    let err = client.complete(&[Message::user("test")]).await.unwrap_err();

    assert!(matches!(err, Error::Model(ref m) if m.contains("500")), "{err}");
}

#[tokio::test]
async fn test_complete_rejects_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), "mistral");
    let err = client.complete(&[Message::user("test")]).await.unwrap_err();

    assert!(matches!(err, Error::Model(_)), "{err}");
}

#[tokio::test]
async fn test_complete_rejects_wrong_role() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "user", "content": "echo"}
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), "mistral");
    let err = client.complete(&[Message::user("test")]).await.unwrap_err();

    assert!(matches!(err, Error::Model(ref m) if m.contains("role")), "{err}");
}

#[tokio::test]
async fn test_connection_refused_is_http_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = OllamaClient::new(uri, "mistral");
    let err = client.list_models().await.unwrap_err();

    assert!(matches!(err, Error::Http(_)), "{err}");
}
