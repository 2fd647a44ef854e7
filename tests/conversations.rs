mod common;

use std::sync::Arc;

use assistant_console::{ConsoleError, ConversationDirectory, DispatchError, SessionContext};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::ScriptedDispatch;

fn directory_at(server: &MockServer) -> ConversationDirectory {
    let context = Arc::new(SessionContext::anonymous());
    ConversationDirectory::new(common::http_dispatcher(
        &format!("{}/api", server.uri()),
        context,
    ))
}

#[tokio::test]
async fn list_accepts_bare_and_wrapped_shapes() {
    let dispatcher = ScriptedDispatch::new();
    dispatcher
        .reply(Ok(json!([
            {"id": "c1", "title": "Trip", "updatedAt": "2024-05-01T10:00:00Z"}
        ])))
        .reply(Ok(json!({"conversations": [{"id": "c2", "title": "Taxes"}]})));
    let directory = ConversationDirectory::new(dispatcher.clone());

    let bare = directory.list().await.expect("bare");
    assert_eq!(bare.len(), 1);
    assert_eq!(bare[0].title, "Trip");
    assert!(bare[0].updated_at.is_some());
    assert!(bare[0].messages.is_empty());

    let wrapped = directory.list().await.expect("wrapped");
    assert_eq!(wrapped[0].id, "c2");
    assert_eq!(dispatcher.endpoints(), ["GET /conversations", "GET /conversations"]);
}

#[tokio::test]
async fn blank_titles_and_ids_never_dispatch() {
    let dispatcher = ScriptedDispatch::new();
    let directory = ConversationDirectory::new(dispatcher.clone());

    assert!(matches!(
        directory.create("   ").await,
        Err(ConsoleError::Validation(_))
    ));
    assert!(matches!(
        directory.rename("c1", "").await,
        Err(ConsoleError::Validation(_))
    ));
    assert!(matches!(
        directory.delete(" ").await,
        Err(ConsoleError::Validation(_))
    ));
    assert!(dispatcher.calls().is_empty());
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let dispatcher = ScriptedDispatch::new();
    dispatcher
        .reply(Err(DispatchError::Api {
            status: 404,
            body: "no such conversation".into(),
        }))
        .reply(Err(DispatchError::Api {
            status: 500,
            body: "db down".into(),
        }));
    let directory = ConversationDirectory::new(dispatcher);

    assert_eq!(
        directory.get("ghost").await,
        Err(ConsoleError::NotFound("conversation ghost".into()))
    );
    assert!(matches!(
        directory.delete("c1").await,
        Err(ConsoleError::Dispatch(DispatchError::Api { status: 500, .. }))
    ));
}

#[tokio::test]
async fn conversations_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/conversations"))
        .and(body_json(json!({"title": "Lisbon trip"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": "c7", "title": "Lisbon trip"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/conversations/c7"))
        .and(body_json(json!({"title": "Porto trip"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "c7", "title": "Porto trip"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/c7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c7",
            "title": "Porto trip",
            "messages": [
                {"id": "m1", "role": "user", "content": "plan it", "timestamp": "2024-05-01T10:00:00Z"},
                {"id": "m2", "role": "assistant", "content": "done", "timestamp": "2024-05-01T10:00:05Z"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/conversations/c7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let directory = directory_at(&server);
    let created = directory.create(" Lisbon trip ").await.expect("create");
    assert_eq!(created.id, "c7");

    let renamed = directory.rename("c7", "Porto trip").await.expect("rename");
    assert_eq!(renamed.title, "Porto trip");

    let stored = directory.get("c7").await.expect("get");
    assert_eq!(stored.messages.len(), 2);
    assert_eq!(stored.messages[1].content(), "done");

    directory.delete("c7").await.expect("delete");

    let requests = server.received_requests().await.expect("recording enabled");
    let methods: Vec<String> = requests
        .iter()
        .map(|request| request.method.to_string())
        .collect();
    assert_eq!(methods, ["POST", "PATCH", "GET", "DELETE"]);
    let rename_body: Value = serde_json::from_slice(&requests[1].body).expect("json");
    assert_eq!(rename_body["title"], "Porto trip");
}
