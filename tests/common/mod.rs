#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use clubes_directory::config::AppConfig;
use clubes_directory::{Directory, DocumentStore, FixedClock, MemoryStore, User};

pub const PASSWORD: &str = "secreto1";

/// A directory over an in-memory store with a clock the test controls
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub dir: Directory,
}

pub fn harness_at(now: &str) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::at(now).expect("valid test timestamp"));
    let handle: Arc<dyn DocumentStore> = store.clone();
    let dir = Directory::new(handle, clock.clone(), &AppConfig::development());
    Harness { store, clock, dir }
}

/// Harness pinned at the start of 2025
pub fn harness() -> Harness {
    harness_at("2025-01-01 08:00:00")
}

impl Harness {
    pub async fn register(&self, name: &str, email: &str) -> Result<User> {
        let user = self
            .dir
            .users
            .register(name, email, PASSWORD, "Ingeniería de Sistemas")
            .await?;
        Ok(user)
    }

    /// Raw stored document at `path`
    pub async fn raw(&self, path: &str) -> Result<Option<Value>> {
        Ok(self.store.get(path).await?)
    }

    pub async fn cached_groups(&self, email: &str) -> Result<Vec<String>> {
        let user = self.dir.users.get(email).await?.context("user should exist")?;
        Ok(user.group_ids)
    }
}

/// Minimal Realtime Database look-alike: `GET/PUT/DELETE /<path>.json`
pub struct FakeRealtimeDb {
    pub base_url: String,
    pub tree: Arc<MemoryStore>,
}

#[derive(Clone)]
struct FakeDb {
    tree: Arc<MemoryStore>,
    token: Option<String>,
}

impl FakeDb {
    fn authorize(&self, query: &HashMap<String, String>) -> Result<(), Response> {
        match &self.token {
            Some(expected) if query.get("auth") != Some(expected) => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Permission denied" })),
            )
                .into_response()),
            _ => Ok(()),
        }
    }
}

fn document_path(raw: &str) -> Result<&str, Response> {
    raw.strip_suffix(".json").ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid path: missing .json suffix" })),
        )
            .into_response()
    })
}

fn unavailable(err: impl std::fmt::Display) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

async fn read_doc(
    State(db): State<FakeDb>,
    Path(raw): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(denied) = db.authorize(&query) {
        return denied;
    }
    let path = match document_path(&raw) {
        Ok(path) => path,
        Err(bad) => return bad,
    };
    match db.tree.get(path).await {
        Ok(doc) => Json(doc.unwrap_or(Value::Null)).into_response(),
        Err(e) => unavailable(e),
    }
}

async fn write_doc(
    State(db): State<FakeDb>,
    Path(raw): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(doc): Json<Value>,
) -> Response {
    if let Err(denied) = db.authorize(&query) {
        return denied;
    }
    let path = match document_path(&raw) {
        Ok(path) => path,
        Err(bad) => return bad,
    };
    match db.tree.set(path, &doc).await {
        Ok(()) => Json(doc).into_response(),
        Err(e) => unavailable(e),
    }
}

async fn delete_doc(
    State(db): State<FakeDb>,
    Path(raw): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(denied) = db.authorize(&query) {
        return denied;
    }
    let path = match document_path(&raw) {
        Ok(path) => path,
        Err(bad) => return bad,
    };
    match db.tree.delete(path).await {
        Ok(()) => Json(Value::Null).into_response(),
        Err(e) => unavailable(e),
    }
}

/// Start the fake on a free port; it lives as long as the test runtime
pub async fn spawn_fake_db(token: Option<&str>) -> Result<FakeRealtimeDb> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let tree = Arc::new(MemoryStore::new());
    let state = FakeDb {
        tree: tree.clone(),
        token: token.map(str::to_string),
    };

    let app = Router::new()
        .route("/*path", get(read_doc).put(write_doc).delete(delete_doc))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind fake database")?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(FakeRealtimeDb {
        base_url: format!("http://127.0.0.1:{}", port),
        tree,
    })
}
