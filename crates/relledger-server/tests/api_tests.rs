//! HTTP API integration tests for the relledger server.

use relledger_core::signing::{sign_request, signing_key_from_hex};
use relledger_core::{ConsistencyEnforcer, DbHandle, User, VersionLedger};
use relledger_schema::{TriState, VersionKey};
use relledger_server::{AppState, admin, api};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;

const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const PLATFORMS: [(&str, &str); 6] = [
    ("linux", "amd64"),
    ("linux", "arm64"),
    ("windows", "amd64"),
    ("windows", "arm64"),
    ("macos", "x86_64"),
    ("macos", "arm64"),
];

/// Ledger with one signer (`ci`, scoped to `agent`) and both routers listening.
struct TestServer {
    api: String,
    admin: String,
    db: DbHandle,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let db = DbHandle::in_memory().expect("in-memory ledger");
        db.put_user(User {
            username: "ci".into(),
            key_material: KEY.into(),
            scopes: vec!["agent".into()],
        })
        .await
        .expect("seed user");

        let api = listen(api::router(AppState::new(db.clone()))).await;
        let admin = listen(admin::router(ConsistencyEnforcer::new(db.clone()))).await;

        Self {
            api,
            admin,
            db,
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, content: Value) -> (StatusCode, Value) {
        let key = signing_key_from_hex(KEY).unwrap();
        let body = sign_request(content, "ci", &key).unwrap();
        self.post_raw(path, &serde_json::to_value(body).unwrap())
            .await
    }

    async fn post_raw(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(format!("{}{path}", self.api))
            .json(body)
            .send()
            .await
            .expect("request");
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(format!("{}{path}", self.api))
            .query(query)
            .send()
            .await
            .expect("request");
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn set_url(&self, version: &str, os: &str, arch: &str, commit: &str) {
        let (status, body) = self
            .post(
                "/version/url",
                json!({
                    "product": "agent",
                    "version": version,
                    "os": os,
                    "arch": arch,
                    "url": format!("https://dl.example.com/agent-{version}-{os}-{arch}.tgz"),
                    "commit": commit,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body, json!({"result": 1}));
    }
}

async fn listen(app: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_set_url_normalizes_platform() {
    let server = TestServer::start().await;
    server.set_url("1.0", "MacOS", "X86_64", "abc").await;

    let ledger = VersionLedger::new(server.db.clone());
    let row = ledger
        .get(VersionKey::new("agent", "1.0", "apple", "amd64"))
        .await
        .unwrap()
        .expect("row stored under canonical key");
    assert_eq!(row.commit_sha, "abc");
    assert_eq!(row.tested, TriState::Unset);
}

#[tokio::test]
async fn test_flags_and_replace() {
    let server = TestServer::start().await;
    server.set_url("1.0", "linux", "amd64", "c1").await;

    let target = json!({"product": "agent", "version": "1.0", "os": "linux", "arch": "amd64"});
    for (path, field, value) in [
        ("/version/test", "tested", true),
        ("/version/publish", "published", false),
        ("/version/pack", "packed", true),
        ("/version/packtest", "tested", false),
    ] {
        let mut content = target.clone();
        content[field] = json!(value);
        let (status, _) = server.post(path, content).await;
        assert_eq!(status, StatusCode::OK, "{path}");
    }

    let (_, page) = server.get("/version", &[]).await;
    let row = &page["items"][0];
    assert_eq!(row["tested"], 1);
    assert_eq!(row["published"], -1);
    assert_eq!(row["packed"], 1);
    assert_eq!(row["pack_tested"], -1);

    // a new URL report wipes every flag
    server.set_url("1.0", "linux", "amd64", "c2").await;
    let (_, page) = server.get("/version", &[]).await;
    let row = &page["items"][0];
    assert_eq!(row["commit_sha"], "c2");
    for flag in ["tested", "published", "packed", "pack_tested"] {
        assert_eq!(row[flag], 0, "{flag}");
    }
}

#[tokio::test]
async fn test_flag_without_row_is_accepted_noop() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post(
            "/version/test",
            json!({"product": "agent", "version": "9.9", "os": "linux", "arch": "amd64", "tested": true}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"result": 1}));
    let (_, total) = server.get("/version/total", &[]).await;
    assert_eq!(total, json!({"total": 0}));
}

#[tokio::test]
async fn test_missing_fields() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/version/url", json!({"product": "agent", "version": "1.0"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let (status, _) = server
        .post(
            "/version/test",
            json!({"product": "agent", "version": "1.0", "os": "linux", "arch": "amd64", "tested": "yes"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_authorization_failures() {
    let server = TestServer::start().await;

    // malformed
    let (status, _) = server
        .post_raw("/version/url", &json!({"content": {"product": "agent"}}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // out of scope, even though the signature is valid
    let (status, body) = server.post("/version/auth", json!({"product": "other"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Insufficient scopes");

    // unknown user
    let key = signing_key_from_hex(KEY).unwrap();
    let body = sign_request(json!({"product": "agent"}), "ghost", &key).unwrap();
    let (status, _) = server
        .post_raw("/version/auth", &serde_json::to_value(body).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // tampered content
    let body = sign_request(json!({"product": "agent", "msg": "hi"}), "ci", &key).unwrap();
    let mut body = serde_json::to_value(body).unwrap();
    body["content"]["msg"] = json!("bye");
    let (status, body) = server.post_raw("/version/auth", &body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid signature");

    assert_eq!(server.db.count_versions(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_auth_check_echoes_normalized_content() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post("/version/auth", json!({"product": "agent", "os": "MacOS"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], 1);
    assert_eq!(body["request"], json!({"product": "agent", "os": "apple"}));
}

#[tokio::test]
async fn test_listing_filters_and_pages() {
    let server = TestServer::start().await;
    for i in 0..10 {
        server.set_url(&format!("1.{i}"), "linux", "amd64", "c").await;
    }
    server.set_url("1.9", "macos", "arm64", "c").await;

    let (status, page) = server
        .get("/version", &[("page", "2"), ("size", "3"), ("os", "linux")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pageNum"], 2);
    assert_eq!(page["pageSize"], 3);
    let versions: Vec<_> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["version"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(versions, vec!["1.6", "1.5", "1.4"]);

    // repeated, aliased os filter
    let (_, page) = server
        .get("/version", &[("os", "MacOS"), ("os", "windows")])
        .await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["os"], "apple");
    assert_eq!(page["pageNum"], 1);
    assert_eq!(page["pageSize"], 0);

    let (_, total) = server.get("/version/total", &[("product", "agent")]).await;
    assert_eq!(total, json!({"total": 11}));
}

#[tokio::test]
async fn test_latest_commit() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .get(format!("{}/version/latest/commit", server.api))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    server.set_url("1.9", "linux", "amd64", "c19").await;
    server.set_url("1.10", "linux", "amd64", "c110").await;
    server.set_url("2.0", "linux", "amd64", "c20").await;

    let (status, body) = server.get("/version/latest/commit", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"commit_sha": "c20"}));
}

#[tokio::test]
async fn test_admin_cleanup() {
    let server = TestServer::start().await;
    for (os, arch) in PLATFORMS {
        server.set_url("1.0", os, arch, "same").await;
    }
    for (os, arch) in &PLATFORMS[..5] {
        server.set_url("2.0", os, arch, "same").await;
    }

    let resp = server
        .client
        .get(format!("{}/cleanup", server.admin))
        .query(&[("product", "agent")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"result": 1}));

    let (_, page) = server.get("/version", &[]).await;
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 6);
    assert!(items.iter().all(|row| row["version"] == "1.0"));
}

#[tokio::test]
async fn test_stopped_store_is_unavailable() {
    let server = TestServer::start().await;
    server.db.shutdown();

    let (status, body) = server.get("/version/total", &[]).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "Service unavailable"}));
}
