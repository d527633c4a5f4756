//! End-to-end tests for the dashboard HTTP API.
//!
//! These boot the real axum server against an in-memory content API and a
//! SQLite credential store, then exercise the connect/search flows over
//! HTTP exactly as the web dashboard would.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use documint::client::{ContentApi, Environment, EntryQuery, Space};
use documint::config::Config;
use documint::credentials::SqliteCredentialStore;
use documint::error::ClientError;
use documint::models::{ContentTypeSummary, EntryCollection, RawEntry, SpaceCredential};
use documint::server::run_server_with_client;
use documint::{db, migrate};

// ─── Fake content API ───────────────────────────────────────────────

/// One hosted space known to the fake API.
struct HostedSpace {
    name: String,
    access_token: String,
    entries: Vec<RawEntry>,
    content_types: Vec<ContentTypeSummary>,
    /// When set, entry queries fail with a server error.
    failing: bool,
}

/// In-memory stand-in for the remote content API, keyed by space id.
struct FakeContentApi {
    spaces: HashMap<String, HostedSpace>,
}

impl FakeContentApi {
    fn new() -> Self {
        Self {
            spaces: HashMap::new(),
        }
    }

    fn with_space(mut self, space_id: &str, name: &str, token: &str, entries: Vec<RawEntry>) -> Self {
        self.spaces.insert(
            space_id.to_string(),
            HostedSpace {
                name: name.to_string(),
                access_token: token.to_string(),
                entries,
                content_types: vec![
                    ContentTypeSummary {
                        id: "post".to_string(),
                        name: "Post".to_string(),
                        description: None,
                        display_field: Some("title".to_string()),
                    },
                    ContentTypeSummary {
                        id: "article".to_string(),
                        name: "Article".to_string(),
                        description: Some("Long-form content".to_string()),
                        display_field: Some("title".to_string()),
                    },
                ],
                failing: false,
            },
        );
        self
    }

    fn with_failing_space(mut self, space_id: &str, name: &str, token: &str) -> Self {
        self.spaces.insert(
            space_id.to_string(),
            HostedSpace {
                name: name.to_string(),
                access_token: token.to_string(),
                entries: Vec::new(),
                content_types: Vec::new(),
                failing: true,
            },
        );
        self
    }

    fn space(&self, space_id: &str) -> Result<&HostedSpace, ClientError> {
        self.spaces.get(space_id).ok_or_else(|| ClientError::NotFound {
            space_id: space_id.to_string(),
        })
    }

    fn authorized(&self, space_id: &str, token: &str) -> Result<&HostedSpace, ClientError> {
        let space = self.space(space_id)?;
        if space.access_token != token {
            return Err(ClientError::Unauthorized {
                space_id: space_id.to_string(),
            });
        }
        Ok(space)
    }
}

#[async_trait]
impl ContentApi for FakeContentApi {
    async fn resolve_space(&self, credential: &SpaceCredential) -> Result<Space, ClientError> {
        let space = self.authorized(&credential.space_id, &credential.access_token)?;
        Ok(Space {
            id: credential.space_id.clone(),
            name: space.name.clone(),
            access_token: credential.access_token.clone(),
        })
    }

    async fn resolve_environment(
        &self,
        space: &Space,
        environment_id: &str,
    ) -> Result<Environment, ClientError> {
        self.authorized(&space.id, &space.access_token)?;
        Ok(Environment {
            space_id: space.id.clone(),
            id: environment_id.to_string(),
            access_token: space.access_token.clone(),
        })
    }

    async fn list_content_types(
        &self,
        environment: &Environment,
        _limit: u32,
    ) -> Result<Vec<ContentTypeSummary>, ClientError> {
        let space = self.authorized(&environment.space_id, &environment.access_token)?;
        Ok(space.content_types.clone())
    }

    async fn query_entries(
        &self,
        environment: &Environment,
        query: &EntryQuery,
    ) -> Result<EntryCollection, ClientError> {
        let space = self.authorized(&environment.space_id, &environment.access_token)?;
        if space.failing {
            return Err(ClientError::Api {
                status: 500,
                message: "upstream exploded".to_string(),
            });
        }

        let needle = query.query.clone().unwrap_or_default().to_lowercase();
        let matches: Vec<RawEntry> = space
            .entries
            .iter()
            .filter(|entry| {
                if let Some(ref wanted) = query.content_type {
                    let type_id = entry
                        .sys
                        .content_type
                        .as_ref()
                        .map(|link| link.sys.id.as_str());
                    if type_id != Some(wanted.as_str()) {
                        return false;
                    }
                }
                if needle.is_empty() {
                    return true;
                }
                entry.fields.values().any(|locales| {
                    locales
                        .as_object()
                        .map(|map| {
                            map.values().any(|value| {
                                value
                                    .as_str()
                                    .map(|text| text.to_lowercase().contains(&needle))
                                    .unwrap_or(false)
                            })
                        })
                        .unwrap_or(false)
                })
            })
            .cloned()
            .collect();

        let total = matches.len() as u64;
        let windowed: Vec<RawEntry> = matches
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .collect();

        Ok(EntryCollection {
            total,
            items: windowed,
        })
    }
}

// ─── Fixtures and helpers ───────────────────────────────────────────

fn raw_entry(id: &str, title: &str, body: &str, published: bool) -> RawEntry {
    let mut sys = json!({
        "id": id,
        "contentType": { "sys": { "id": "post" } },
        "version": 3,
        "createdAt": "2024-01-10T08:00:00Z",
        "updatedAt": "2024-05-20T16:45:00Z"
    });
    if published {
        sys["publishedVersion"] = json!(2);
    }

    serde_json::from_value(json!({
        "sys": sys,
        "fields": {
            "title": { "en-US": title },
            "body": { "en-US": body },
            "slug": { "en-US": format!("/{}", id) }
        }
    }))
    .unwrap()
}

fn test_config(tmp: &TempDir, port: u16) -> Config {
    let db_path = tmp.path().join("documint.sqlite");
    let config_content = format!(
        r#"
[db]
path = "{}"

[server]
bind = "127.0.0.1:{}"
"#,
        db_path.display(),
        port
    );
    toml::from_str(&config_content).unwrap()
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

/// Boot the server with the given fake API; returns the port and a guard
/// handle for the spawned server task.
async fn start_server(
    tmp: &TempDir,
    api: FakeContentApi,
) -> (u16, tokio::task::JoinHandle<()>) {
    let port = find_free_port();
    let cfg = test_config(tmp, port);
    migrate::run_migrations(&cfg).await.unwrap();

    let pool = db::connect(&cfg).await.unwrap();
    let credentials = Arc::new(SqliteCredentialStore::new(pool));
    let api = Arc::new(api);

    let handle = tokio::spawn(async move {
        run_server_with_client(&cfg, api, credentials).await.ok();
    });

    wait_for_server(port).await;
    (port, handle)
}

async fn connect_space(
    client: &reqwest::Client,
    port: u16,
    user: &str,
    space_id: &str,
    token: &str,
) -> Value {
    let resp = client
        .post(format!("http://127.0.0.1:{}/spaces", port))
        .json(&json!({
            "user_id": user,
            "space_id": space_id,
            "access_token": token
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "connect should succeed");
    resp.json().await.unwrap()
}

// ─── Tests ──────────────────────────────────────────────────────────

/// Connecting a space verifies the credential remotely and persists it
/// with the remote space name; bad credentials get distinct errors.
#[tokio::test]
async fn test_connect_flow_and_credential_errors() {
    let tmp = TempDir::new().unwrap();
    let api = FakeContentApi::new().with_space(
        "sp-blog",
        "Blog",
        "tok-blog",
        vec![raw_entry("e1", "Hello", "world", true)],
    );
    let (port, server) = start_server(&tmp, api).await;
    let client = reqwest::Client::new();

    // Happy path: name defaults to the remote space name, token redacted.
    let connected = connect_space(&client, port, "u1", "sp-blog", "tok-blog").await;
    assert_eq!(connected["name"], "Blog");
    assert_eq!(connected["space_id"], "sp-blog");
    assert!(connected.get("access_token").is_none());

    // Wrong token → 401 with the credentials hint.
    let resp = client
        .post(format!("http://127.0.0.1:{}/spaces", port))
        .json(&json!({
            "user_id": "u1",
            "space_id": "sp-blog",
            "access_token": "wrong"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid_credentials");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("check your credentials"));

    // Unknown space id → 404.
    let resp = client
        .post(format!("http://127.0.0.1:{}/spaces", port))
        .json(&json!({
            "user_id": "u1",
            "space_id": "nope",
            "access_token": "tok-blog"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Connecting the same space twice → 409.
    let resp = client
        .post(format!("http://127.0.0.1:{}/spaces", port))
        .json(&json!({
            "user_id": "u1",
            "space_id": "sp-blog",
            "access_token": "tok-blog"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // The space shows up in the listing.
    let resp = client
        .get(format!("http://127.0.0.1:{}/spaces?user_id=u1", port))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["spaces"].as_array().unwrap().len(), 1);

    server.abort();
}

/// A search across two connected spaces merges entries, stamps each with
/// its originating space, sums totals, and includes the page window.
#[tokio::test]
async fn test_search_across_two_spaces() {
    let tmp = TempDir::new().unwrap();
    let api = FakeContentApi::new()
        .with_space(
            "sp-blog",
            "Blog",
            "tok-blog",
            vec![
                raw_entry("b1", "Launch day", "We are launching the product", true),
                raw_entry("b2", "Retro", "Nothing about that keyword", true),
            ],
        )
        .with_space(
            "sp-docs",
            "Docs",
            "tok-docs",
            vec![raw_entry("d1", "Launch checklist", "launching steps", false)],
        );
    let (port, server) = start_server(&tmp, api).await;
    let client = reqwest::Client::new();

    connect_space(&client, port, "u1", "sp-blog", "tok-blog").await;
    connect_space(&client, port, "u1", "sp-docs", "tok-docs").await;

    let resp = client
        .post(format!("http://127.0.0.1:{}/search", port))
        .json(&json!({ "user_id": "u1", "query": "launch" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["total_items"], 2);
    assert_eq!(body["total_pages"], 1);
    assert_eq!(body["current_page"], 1);
    assert_eq!(body["pages"], json!([1]));

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);

    let names: Vec<&str> = items
        .iter()
        .map(|item| item["space_name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Blog"));
    assert!(names.contains(&"Docs"));

    let draft = items
        .iter()
        .find(|item| item["space_name"] == "Docs")
        .unwrap();
    assert_eq!(draft["status"], "draft");
    assert_eq!(draft["url"], "/d1");

    server.abort();
}

/// Scoping to a single space queries only that space.
#[tokio::test]
async fn test_search_single_space_scope() {
    let tmp = TempDir::new().unwrap();
    let api = FakeContentApi::new()
        .with_space(
            "sp-blog",
            "Blog",
            "tok-blog",
            vec![raw_entry("b1", "Launch day", "launching", true)],
        )
        .with_space(
            "sp-docs",
            "Docs",
            "tok-docs",
            vec![raw_entry("d1", "Launch checklist", "launching", true)],
        );
    let (port, server) = start_server(&tmp, api).await;
    let client = reqwest::Client::new();

    connect_space(&client, port, "u1", "sp-blog", "tok-blog").await;
    connect_space(&client, port, "u1", "sp-docs", "tok-docs").await;

    let resp = client
        .post(format!("http://127.0.0.1:{}/search", port))
        .json(&json!({
            "user_id": "u1",
            "query": "launch",
            "scope": { "space": "sp-docs" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["total_items"], 1);
    assert_eq!(body["items"][0]["space_name"], "Docs");

    // Unknown scope id → 404.
    let resp = client
        .post(format!("http://127.0.0.1:{}/search", port))
        .json(&json!({
            "user_id": "u1",
            "query": "launch",
            "scope": { "space": "sp-missing" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.abort();
}

/// One failing space degrades the page instead of failing the search;
/// all spaces failing maps to a 502.
#[tokio::test]
async fn test_partial_and_total_failure() {
    let tmp = TempDir::new().unwrap();
    let api = FakeContentApi::new()
        .with_failing_space("sp-bad", "Flaky", "tok-bad")
        .with_space(
            "sp-blog",
            "Blog",
            "tok-blog",
            vec![raw_entry("b1", "Launch day", "launching", true)],
        );
    let (port, server) = start_server(&tmp, api).await;
    let client = reqwest::Client::new();

    connect_space(&client, port, "u1", "sp-bad", "tok-bad").await;
    connect_space(&client, port, "u1", "sp-blog", "tok-blog").await;

    // Partial failure → 200, survivor's items only.
    let resp = client
        .post(format!("http://127.0.0.1:{}/search", port))
        .json(&json!({ "user_id": "u1", "query": "launch" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total_items"], 1);
    assert_eq!(body["items"][0]["space_name"], "Blog");

    // Scope to the broken space alone → every source failed → 502.
    let resp = client
        .post(format!("http://127.0.0.1:{}/search", port))
        .json(&json!({
            "user_id": "u1",
            "query": "launch",
            "scope": { "space": "sp-bad" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "search_failed");

    server.abort();
}

/// Content types come back sorted by name; rename and disconnect work and
/// are tenant-scoped.
#[tokio::test]
async fn test_space_management_and_content_types() {
    let tmp = TempDir::new().unwrap();
    let api = FakeContentApi::new().with_space("sp-blog", "Blog", "tok-blog", Vec::new());
    let (port, server) = start_server(&tmp, api).await;
    let client = reqwest::Client::new();

    let connected = connect_space(&client, port, "u1", "sp-blog", "tok-blog").await;
    let credential_id = connected["id"].as_str().unwrap();

    // Content types sorted by name: Article before Post.
    let resp = client
        .get(format!(
            "http://127.0.0.1:{}/spaces/{}/content-types?user_id=u1",
            port, credential_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let names: Vec<&str> = body["content_types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|ct| ct["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Article", "Post"]);

    // Another tenant cannot see or touch the credential.
    let resp = client
        .get(format!(
            "http://127.0.0.1:{}/spaces/{}/content-types?user_id=u2",
            port, credential_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Rename.
    let resp = client
        .patch(format!("http://127.0.0.1:{}/spaces/{}", port, credential_id))
        .json(&json!({ "user_id": "u1", "name": "Company blog" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "Company blog");

    // Disconnect, then the listing is empty.
    let resp = client
        .delete(format!(
            "http://127.0.0.1:{}/spaces/{}?user_id=u1",
            port, credential_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let resp = client
        .get(format!("http://127.0.0.1:{}/spaces?user_id=u1", port))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["spaces"].as_array().unwrap().is_empty());

    server.abort();
}

/// Pagination: per-space windows are merged and the page window is
/// ellipsis-compressed for large result sets.
#[tokio::test]
async fn test_search_pagination_window() {
    let tmp = TempDir::new().unwrap();

    let entries: Vec<RawEntry> = (0..30)
        .map(|i| raw_entry(&format!("e{}", i), &format!("Launch note {}", i), "launching", true))
        .collect();
    let api = FakeContentApi::new().with_space("sp-blog", "Blog", "tok-blog", entries);
    let (port, server) = start_server(&tmp, api).await;
    let client = reqwest::Client::new();

    connect_space(&client, port, "u1", "sp-blog", "tok-blog").await;

    let resp = client
        .post(format!("http://127.0.0.1:{}/search", port))
        .json(&json!({
            "user_id": "u1",
            "query": "launch",
            "page": 1,
            "page_size": 3
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["total_items"], 30);
    assert_eq!(body["total_pages"], 10);
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
    assert_eq!(body["pages"], json!([1, 2, 3, "...", 10]));

    // Middle page gets ellipses on both sides.
    let resp = client
        .post(format!("http://127.0.0.1:{}/search", port))
        .json(&json!({
            "user_id": "u1",
            "query": "launch",
            "page": 5,
            "page_size": 3
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["pages"], json!([1, "...", 4, 5, 6, "...", 10]));
    // The window slides: page 5 of size 3 starts at entry 12.
    assert_eq!(body["items"].as_array().unwrap().len(), 3);

    server.abort();
}
