//! In-process mock of the Promethium HTTP API.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use promethium::{ClientConfig, PromethiumClient};
use serde_json::{Value, json};

pub const API_KEY: &str = "test-api-key";
pub const ZIP_BYTES: &[u8] = b"PK\x03\x04promethium-results";

/// Requests the mock has seen and the responses it will replay.
#[derive(Default)]
pub struct MockState {
    /// Status sequence per workflow id; the last entry repeats.
    pub statuses: Mutex<HashMap<String, VecDeque<String>>>,
    pub status_fetches: Mutex<Vec<String>>,
    /// `(method path, body)` of every request carrying a body.
    pub bodies: Mutex<Vec<(String, Value)>>,
    pub list_queries: Mutex<Vec<Vec<(String, String)>>>,
    pub api_keys: Mutex<Vec<String>>,
    pub stopped: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    /// Number of workflows served by `GET /v0/workflows`.
    pub workflow_total: Mutex<u64>,
}

impl MockState {
    pub fn script(&self, id: &str, statuses: &[&str]) {
        self.statuses.lock().unwrap().insert(
            id.to_string(),
            statuses.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn fetches_of(&self, id: &str) -> usize {
        self.status_fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.as_str() == id)
            .count()
    }

    pub fn bodies_for(&self, route: &str) -> Vec<Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == route)
            .map(|(_, b)| b.clone())
            .collect()
    }

    fn record_body(&self, route: impl Into<String>, body: &Value) {
        self.bodies.lock().unwrap().push((route.into(), body.clone()));
    }

    fn record_key(&self, headers: &HeaderMap) {
        let key = headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.api_keys.lock().unwrap().push(key);
    }
}

type Shared = Arc<MockState>;

/// Start the mock on a random port; returns a client pointed at it.
pub async fn start_mock() -> (PromethiumClient, Shared) {
    let state: Shared = Arc::new(MockState::default());
    *state.workflow_total.lock().unwrap() = 2;

    let app = Router::new()
        .route("/v0/workflows", get(list_workflows).post(submit_workflow))
        .route("/v0/workflows/memory", post(memory))
        .route("/v0/workflows/{id}", get(get_workflow).delete(delete_workflow))
        .route("/v0/workflows/{id}/stop", post(stop_workflow))
        .route("/v0/workflows/{id}/results", get(workflow_results))
        .route("/v0/workflows/{id}/results/download", get(download_results))
        .route("/v0/files", get(list_files).post(create_file))
        .route("/v0/files/batch", post(create_batch))
        .route(
            "/v0/files/{id}",
            get(file_metadata).patch(update_file).delete(delete_file),
        )
        .route("/v0/files/{id}/download", get(download_file))
        .route("/blobs/{name}", get(blob))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = PromethiumClient::new(ClientConfig::new(format!("http://{addr}"), API_KEY)).unwrap();
    (client, state)
}

fn not_found(what: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": format!("{what} not found")}))).into_response()
}

fn workflow_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": format!("workflow-{id}"),
        "kind": "GeometryOptimization",
        "status": status,
        "created_at": "2023-09-26T19:38:53.437280+00:00",
        "duration_seconds": 12.5
    })
}

fn file_json(id: &str, name: &str, parent: Value, is_directory: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "parent_id": parent,
        "is_directory": is_directory,
        "created_at": "2023-09-26T19:38:53.437280+00:00",
        "size_bytes_uncompressed": 64
    })
}

fn page_params(query: &[(String, String)]) -> (u64, u64) {
    let get = |k: &str| {
        query
            .iter()
            .find(|(key, _)| key == k)
            .and_then(|(_, v)| v.parse().ok())
    };
    (get("page").unwrap_or(1), get("size").unwrap_or(10))
}

// ─── Workflows ──────────────────────────────────────────────────────

async fn list_workflows(
    State(state): State<Shared>,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    state.list_queries.lock().unwrap().push(query.clone());
    let total = *state.workflow_total.lock().unwrap();
    let (page, size) = page_params(&query);
    let start = (page - 1) * size;
    let end = (start + size).min(total);
    let items: Vec<Value> = (start..end.max(start))
        .map(|i| workflow_json(&format!("wf-{i}"), "COMPLETED"))
        .collect();
    Json(json!({"items": items, "total": total, "page": page, "size": size})).into_response()
}

async fn submit_workflow(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record_key(&headers);
    state.record_body("POST /v0/workflows", &body);
    let mut workflow = workflow_json("wf-new", "RUNNING");
    workflow["name"] = body["name"].clone();
    workflow["kind"] = body["kind"].clone();
    (StatusCode::CREATED, Json(workflow)).into_response()
}

async fn memory(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.record_body("POST /v0/workflows/memory", &body);
    Json(json!({
        "prediction_bytes": 3221225472.0,
        "percentile_prediction_bytes": {"0.025": 2147483648.0, "0.975": 4294967296.0}
    }))
    .into_response()
}

async fn get_workflow(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    state.record_key(&headers);
    state.status_fetches.lock().unwrap().push(id.clone());
    let mut statuses = state.statuses.lock().unwrap();
    let Some(script) = statuses.get_mut(&id) else {
        return not_found("Workflow");
    };
    let status = if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    };
    match status {
        Some(status) => Json(workflow_json(&id, &status)).into_response(),
        None => not_found("Workflow"),
    }
}

async fn delete_workflow(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let statuses = state.statuses.lock().unwrap();
    let Some(script) = statuses.get(&id) else {
        return not_found("Workflow");
    };
    if script.front().map(String::as_str) == Some("RUNNING") {
        return (
            StatusCode::CONFLICT,
            Json(json!({"detail": "Workflow is not in a terminal state"})),
        )
            .into_response();
    }
    state.deleted.lock().unwrap().push(id);
    StatusCode::NO_CONTENT.into_response()
}

async fn stop_workflow(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    if !state.statuses.lock().unwrap().contains_key(&id) {
        return not_found("Workflow");
    }
    state.stopped.lock().unwrap().push(id);
    StatusCode::OK.into_response()
}

async fn workflow_results(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return not_found("Workflow");
    }
    Json(json!({
        "id": id,
        "kind": "GeometryOptimization",
        "api_version": "v1",
        "status": "COMPLETED",
        "results": {
            "optimization": {"converged": true, "energy": -345.7},
            "artifacts": {
                "optimized-molecule": {
                    "encoding": "base64",
                    "base64data": promethium::encode("1\n\nHe 0 0 0"),
                    "filetype": "xyz"
                }
            }
        }
    }))
    .into_response()
}

async fn download_results(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return not_found("Workflow");
    }
    Redirect::temporary(&format!("/blobs/{id}.zip")).into_response()
}

// ─── Files ──────────────────────────────────────────────────────────

async fn list_files(
    State(state): State<Shared>,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    state.list_queries.lock().unwrap().push(query.clone());
    let (page, size) = page_params(&query);
    let items = if page == 1 {
        vec![
            file_json("f-1", "h2.xyz", Value::Null, false),
            file_json("d-1", "runs", Value::Null, true),
        ]
    } else {
        Vec::new()
    };
    Json(json!({"items": items, "total": 2, "page": page, "size": size})).into_response()
}

async fn file_metadata(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "missing" => not_found("File"),
        "d-1" => Json(file_json("d-1", "runs", Value::Null, true)).into_response(),
        _ => Json(file_json(&id, "h2.xyz", json!("d-1"), false)).into_response(),
    }
}

async fn create_file(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.record_body("POST /v0/files", &body);
    let is_directory = body["is_directory"].as_bool().unwrap_or(false);
    let name = body["name"].as_str().unwrap_or_default();
    let created = file_json("f-new", name, body["parent_id"].clone(), is_directory);
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn create_batch(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.record_body("POST /v0/files/batch", &body);
    let created: Vec<Value> = body
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            file_json(
                &format!("f-batch-{i}"),
                entry["name"].as_str().unwrap_or_default(),
                entry["parent_id"].clone(),
                false,
            )
        })
        .collect();
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn update_file(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if id == "missing" {
        return not_found("File");
    }
    state.record_body(format!("PATCH /v0/files/{id}"), &body);
    let name = body["name"].as_str().unwrap_or("h2.xyz");
    let parent = body.get("parent_id").cloned().unwrap_or(json!("d-1"));
    Json(file_json(&id, name, parent, false)).into_response()
}

async fn delete_file(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return not_found("File");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn download_file(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return not_found("File");
    }
    Redirect::temporary(&format!("/blobs/{id}")).into_response()
}

async fn blob(Path(name): Path<String>) -> Response {
    if name.ends_with(".zip") || name == "d-1" {
        ZIP_BYTES.to_vec().into_response()
    } else {
        "2\n\nH 0 0 0\nH 0 0 0.74".into_response()
    }
}
