use super::*;
use axum::{
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tokio::net::TcpListener;

async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}/v1")
}

fn settings(base_url: String) -> OpenAiSettings {
    OpenAiSettings {
        api_key: "sk-test".into(),
        base_url,
        ..OpenAiSettings::default()
    }
}

#[test]
fn endpoint_keeps_version_prefix_of_base_url() {
    let generator = OpenAiGenerator::new(settings("https://api.openai.com/v1".into())).expect("new");
    assert_eq!(
        generator.endpoint().as_str(),
        "https://api.openai.com/v1/chat/completions"
    );

    let generator =
        OpenAiGenerator::new(settings("http://localhost:9000/v1/".into())).expect("new");
    assert_eq!(
        generator.endpoint().as_str(),
        "http://localhost:9000/v1/chat/completions"
    );
}

#[test]
fn missing_api_key_is_reported_as_not_configured() {
    let err = OpenAiGenerator::new(OpenAiSettings::default())
        .err()
        .expect("should fail");
    assert!(matches!(err, GenerationError::NotConfigured(_)));
}

#[test]
fn strips_fenced_python_block() {
    assert_eq!(
        strip_code_fences("```python\nimport streamlit as st\nst.title('x')\n```\n"),
        "import streamlit as st\nst.title('x')\n"
    );
    assert_eq!(strip_code_fences("print(1)"), "print(1)\n");
}

#[tokio::test]
async fn returns_first_choice_without_fences() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
            assert_eq!(
                headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok()),
                Some("Bearer sk-test")
            );
            assert_eq!(body["model"], "gpt-4o");
            assert_eq!(body["messages"][1]["content"], "a todo list");
            Json(serde_json::json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "```python\nimport streamlit as st\n```" } }
                ]
            }))
        }),
    );
    let base_url = spawn_backend(router).await;

    let generator = OpenAiGenerator::new(settings(base_url)).expect("new");
    let code = generator.generate("a todo list").await.expect("generate");
    assert_eq!(code, "import streamlit as st\n");
}

#[tokio::test]
async fn non_success_status_becomes_status_error() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let base_url = spawn_backend(router).await;

    let generator = OpenAiGenerator::new(settings(base_url)).expect("new");
    let err = generator.generate("anything").await.expect_err("should fail");
    match err {
        GenerationError::Status { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_choices_are_rejected() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(serde_json::json!({ "choices": [] })) }),
    );
    let base_url = spawn_backend(router).await;

    let generator = OpenAiGenerator::new(settings(base_url)).expect("new");
    let err = generator.generate("anything").await.expect_err("should fail");
    assert!(matches!(err, GenerationError::EmptyResponse));
}

#[tokio::test]
async fn offline_generator_embeds_prompt_as_string_literal() {
    let code = OfflineGenerator
        .generate("say \"hi\"")
        .await
        .expect("generate");
    assert!(code.starts_with("import streamlit as st\n"));
    assert!(code.contains(r#"st.caption("say \"hi\"")"#));
}

#[tokio::test]
async fn unavailable_generator_always_fails() {
    let generator = UnavailableGenerator::new("missing API key");
    let err = generator.generate("anything").await.expect_err("should fail");
    assert_eq!(
        err.to_string(),
        "generation backend is not configured: missing API key"
    );
}
