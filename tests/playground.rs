mod common;

use std::sync::Arc;

use assistant_console::{
    ConsoleError, DispatchError, Playground, PromptBlock, Role, SamplingInput, SessionContext,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::ScriptedDispatch;

fn blocks() -> Vec<PromptBlock> {
    vec![
        PromptBlock::new(Role::System, "You are terse."),
        PromptBlock::new(Role::User, "   "),
        PromptBlock::new(Role::User, " What is Rust? "),
    ]
}

#[tokio::test]
async fn empty_transcript_never_dispatches() {
    let dispatcher = ScriptedDispatch::new();
    let playground = Playground::new(dispatcher.clone());

    let only_blank = [PromptBlock::new(Role::User, "  ")];
    assert_eq!(
        playground.run(&only_blank, &SamplingInput::default()).await,
        Err(ConsoleError::EmptyTranscript)
    );
    assert_eq!(
        playground.run(&[], &SamplingInput::default()).await,
        Err(ConsoleError::EmptyTranscript)
    );
    assert!(dispatcher.calls().is_empty());
}

#[tokio::test]
async fn request_carries_filtered_blocks_and_clamped_options() {
    let dispatcher = ScriptedDispatch::new();
    dispatcher.reply(Ok(json!({"reply": "A systems language."})));
    let playground = Playground::new(dispatcher.clone());

    let sampling = SamplingInput {
        temperature: Some(5.0),
        ..SamplingInput::default()
    };
    let reply = playground.run(&blocks(), &sampling).await.expect("reply");
    assert_eq!(reply, "A systems language.");

    let calls = dispatcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.to_string(), "POST /playground");
    let body = calls[0].1.clone().expect("body");
    assert_eq!(
        body["messages"],
        json!([
            {"role": "system", "content": "You are terse."},
            {"role": "user", "content": "What is Rust?"}
        ])
    );
    assert_eq!(body["options"]["temperature"], 1.0);
    assert_eq!(body["options"]["num_predict"], 2048);
    let top_p = body["options"]["top_p"].as_f64().expect("top_p");
    assert!((top_p - 0.9).abs() < 1e-6);
}

#[tokio::test]
async fn backend_error_is_returned() {
    let dispatcher = ScriptedDispatch::new();
    dispatcher.reply(Err(DispatchError::Api {
        status: 200,
        body: "model not found".into(),
    }));
    let playground = Playground::new(dispatcher);

    let err = playground
        .run(&blocks(), &SamplingInput::default())
        .await
        .expect_err("error");
    assert!(matches!(err, ConsoleError::Dispatch(DispatchError::Api { .. })));
}

#[tokio::test]
async fn playground_over_http_reports_error_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/playground"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "ollama offline"})))
        .mount(&server)
        .await;

    let dispatcher = common::http_dispatcher(
        &format!("{}/api", server.uri()),
        Arc::new(SessionContext::anonymous()),
    );
    let err = Playground::new(dispatcher)
        .run(&blocks(), &SamplingInput::default())
        .await
        .expect_err("error field");
    assert_eq!(
        err,
        ConsoleError::Dispatch(DispatchError::Api {
            status: 200,
            body: "ollama offline".into()
        })
    );

    let requests = server.received_requests().await.expect("recording enabled");
    let body: Value = serde_json::from_slice(&requests[0].body).expect("json");
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(2));
}
