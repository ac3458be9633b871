use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use codespace_core::{ClientEvent, ServerEvent};
use codespace_server::{
    app,
    config::{Config, TerminalConfig},
    db::{SpaceRepo, init_database},
    sync::{RoomRegistry, SyncEngine},
    terminal::CommandRunner,
};
use rusqlite::Connection;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: ":memory:".into(),
        cors_origins: vec!["*".to_string()],
        terminal: TerminalConfig::default(),
    }
}

fn setup() -> (Router, SyncEngine) {
    let conn = Connection::open_in_memory().expect("in-memory sqlite");
    init_database(&conn).expect("init db");
    let config = test_config();
    let engine = SyncEngine::new(
        Arc::new(RoomRegistry::new()),
        Arc::new(SpaceRepo::new(conn)),
        CommandRunner::new(&config.terminal),
    );
    (app(engine.clone(), &config), engine)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn first_visit_seeds_default_file() {
    let (app, _) = setup();

    let (status, json) = send(&app, "POST", "/api/codespaces", Some(json!({"name": "demo"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["name"], "demo");
    assert_eq!(json["isPublic"], true);
    assert_eq!(
        json["files"],
        json!([{
            "name": "index.html",
            "language": "html",
            "content": "<h1>Welcome to your new CodeSpace!</h1>"
        }])
    );

    let (status, json) = send(&app, "POST", "/api/codespaces", Some(json!({"name": "demo"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["files"].as_array().map(Vec::len), Some(1));

    let (status, json) = send(&app, "GET", "/api/codespaces/demo/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"isPublic": true}));

    // Public spaces pass the gate whatever passcode is supplied
    let (status, json) = send(
        &app,
        "POST",
        "/api/codespaces/demo/data",
        Some(json!({"passcode": "anything"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["files"][0]["name"], "index.html");
}

#[tokio::test]
async fn private_space_requires_exact_passcode() {
    let (app, _) = setup();
    send(&app, "POST", "/api/codespaces", Some(json!({"name": "priv"}))).await;

    let (status, json) = send(
        &app,
        "PATCH",
        "/api/codespaces/priv/privacy",
        Some(json!({"isPublic": false, "passcode": "xyz"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"isPublic": false, "hasSecret": true}));

    let (_, json) = send(&app, "GET", "/api/codespaces/priv/status", None).await;
    assert_eq!(json, json!({"isPublic": false}));

    let (status, json) = send(
        &app,
        "POST",
        "/api/codespaces/priv/verify",
        Some(json!({"passcode": "abc"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Incorrect passcode.");

    let (status, json) = send(
        &app,
        "POST",
        "/api/codespaces/priv/verify",
        Some(json!({"passcode": "xyz"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true}));

    for body in [json!({}), json!({"passcode": "abc"}), json!({"passcode": "XYZ"})] {
        let (status, json) = send(&app, "POST", "/api/codespaces/priv/data", Some(body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json.get("files").is_none());
        assert!(json["msg"].is_string());
    }

    let (status, json) = send(
        &app,
        "POST",
        "/api/codespaces/priv/data",
        Some(json!({"passcode": "xyz"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["files"][0]["name"], "index.html");
    assert_eq!(json["hasSecret"], true);
    assert!(json.get("secretHash").is_none());

    // The public view withholds the files of a private space
    let (status, json) = send(&app, "GET", "/api/codespaces/priv", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["files"], json!([]));
}

#[tokio::test]
async fn private_without_passcode_is_rejected() {
    let (app, _) = setup();
    send(&app, "POST", "/api/codespaces", Some(json!({"name": "demo"}))).await;

    for body in [json!({"isPublic": false}), json!({"isPublic": false, "passcode": ""})] {
        let (status, _) = send(&app, "PATCH", "/api/codespaces/demo/privacy", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (_, json) = send(&app, "GET", "/api/codespaces/demo/status", None).await;
    assert_eq!(json["isPublic"], true);
}

#[tokio::test]
async fn making_space_public_again_opens_the_gate() {
    let (app, _) = setup();
    send(&app, "POST", "/api/codespaces", Some(json!({"name": "demo"}))).await;
    send(
        &app,
        "PATCH",
        "/api/codespaces/demo/privacy",
        Some(json!({"isPublic": false, "passcode": "xyz"})),
    )
    .await;

    // Only the holder of the current passcode may lift the gate
    for body in [
        json!({"isPublic": true}),
        json!({"isPublic": true, "currentPasscode": "abc"}),
    ] {
        let (status, _) = send(&app, "PATCH", "/api/codespaces/demo/privacy", Some(body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (_, json) = send(&app, "GET", "/api/codespaces/demo/status", None).await;
    assert_eq!(json["isPublic"], false);

    let (status, _) = send(
        &app,
        "PATCH",
        "/api/codespaces/demo/privacy",
        Some(json!({"isPublic": true, "currentPasscode": "xyz"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/api/codespaces/demo/data", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_and_unknown_spaces() {
    let (app, _) = setup();

    let (status, _) = send(&app, "POST", "/api/codespaces", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/api/codespaces", Some(json!({"name": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&app, "GET", "/api/codespaces/ghost/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["msg"].as_str().unwrap_or_default().contains("ghost"));

    let (status, _) = send(&app, "POST", "/api/codespaces/ghost/data", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PATCH",
        "/api/codespaces/ghost/privacy",
        Some(json!({"isPublic": true})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_file_is_idempotent() {
    let (app, _) = setup();
    send(&app, "POST", "/api/codespaces", Some(json!({"name": "demo"}))).await;

    let (status, json) = send(
        &app,
        "DELETE",
        "/api/codespaces/demo/delete",
        Some(json!({"file": "missing.js"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["codespace"]["files"].as_array().map(Vec::len), Some(1));

    let (status, json) = send(
        &app,
        "DELETE",
        "/api/codespaces/demo/delete",
        Some(json!({"file": "index.html"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["codespace"]["files"], json!([]));
    assert!(json["msg"].as_str().unwrap_or_default().contains("index.html"));

    let (status, _) = send(&app, "DELETE", "/api/codespaces/demo/delete", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/codespaces/ghost/delete",
        Some(json!({"file": "index.html"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_on_private_space_withholds_files() {
    let (app, _) = setup();
    send(&app, "POST", "/api/codespaces", Some(json!({"name": "priv"}))).await;
    send(
        &app,
        "PATCH",
        "/api/codespaces/priv/privacy",
        Some(json!({"isPublic": false, "passcode": "xyz"})),
    )
    .await;

    let (status, json) = send(
        &app,
        "DELETE",
        "/api/codespaces/priv/delete",
        Some(json!({"file": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["codespace"]["isPublic"], false);
    assert_eq!(json["codespace"]["files"], json!([]));
    assert!(!json.to_string().contains("Welcome"));

    // The file itself is untouched
    let (_, json) = send(
        &app,
        "POST",
        "/api/codespaces/priv/data",
        Some(json!({"passcode": "xyz"})),
    )
    .await;
    assert_eq!(json["files"][0]["name"], "index.html");
}

#[tokio::test]
async fn privacy_over_http_notifies_room() {
    let (app, engine) = setup();
    send(&app, "POST", "/api/codespaces", Some(json!({"name": "demo"}))).await;

    let mut member = engine.registry().register();
    engine
        .handle(
            member.id(),
            ClientEvent::JoinSpace {
                space_name: "demo".into(),
                passcode: None,
            },
        )
        .await;

    let (status, _) = send(
        &app,
        "PATCH",
        "/api/codespaces/demo/privacy",
        Some(json!({"isPublic": false, "passcode": "xyz"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        member.recv().await,
        Some(ServerEvent::PrivacyUpdated {
            is_public: false,
            has_secret: true,
        })
    );
}

#[tokio::test]
async fn delete_over_http_notifies_room() {
    let (app, engine) = setup();
    send(&app, "POST", "/api/codespaces", Some(json!({"name": "demo"}))).await;

    let mut member = engine.registry().register();
    engine
        .handle(
            member.id(),
            ClientEvent::JoinSpace {
                space_name: "demo".into(),
                passcode: None,
            },
        )
        .await;

    send(
        &app,
        "DELETE",
        "/api/codespaces/demo/delete",
        Some(json!({"file": "index.html"})),
    )
    .await;

    assert_eq!(
        member.recv().await,
        Some(ServerEvent::FileDeleted {
            file_name: "index.html".into(),
            files: vec![],
        })
    );
}

#[tokio::test]
async fn status_reports_rooms() {
    let (app, engine) = setup();
    send(&app, "POST", "/api/codespaces", Some(json!({"name": "demo"}))).await;

    let member = engine.registry().register();
    engine
        .handle(
            member.id(),
            ClientEvent::JoinSpace {
                space_name: "demo".into(),
                passcode: None,
            },
        )
        .await;

    let (status, json) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active_connections"], 1);
    assert_eq!(json["active_rooms"], 1);
}
