// crates/conformance-harness/tests/common/mod.rs
// ============================================================================
// Module: Stub Targets
// Description: In-process task tracker and day server stubs for integration tests.
// Purpose: Exercise the harness over real HTTP against configurable targets.
// Dependencies: conformance-harness, serde_json, tiny_http
// ============================================================================

//! ## Overview
//! [`StubServer`] binds `tiny_http` on an ephemeral loopback port and serves
//! requests on a background thread until dropped. Two behaviours are
//! provided: a JSON task tracker with bearer auth and per-owner storage, and
//! an HTML page naming the current weekday. Quirk flags switch individual
//! contract points off so failure paths can be observed.

#![allow(dead_code, reason = "Each integration test binary uses a subset of the stubs.")]

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use conformance_harness::HarnessConfig;
use conformance_harness::HarnessSession;
use conformance_harness::NoopAuditSink;
use conformance_harness::SuiteKind;
use conformance_harness::TargetAddress;
use conformance_harness::scenarios::current_day_name;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Method;
use tiny_http::Request;
use tiny_http::Response;
use tiny_http::Server;

/// Response type produced by every stub handler.
pub type StubResponse = Response<Cursor<Vec<u8>>>;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Loopback HTTP server running a handler on a background thread.
pub struct StubServer {
    base_url: String,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
}

impl StubServer {
    /// Binds an ephemeral port and serves `handler` until dropped.
    pub fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&mut Request) -> StubResponse + Send + 'static,
    {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind stub server"));
        let addr = server.server_addr().to_ip().expect("stub ip address");
        let worker = Arc::clone(&server);
        let handle = thread::spawn(move || {
            for mut request in worker.incoming_requests() {
                let response = handler(&mut request);
                let _ = request.respond(response);
            }
        });
        Self {
            base_url: format!("http://{addr}"),
            server,
            handle: Some(handle),
        }
    }

    /// Base address of the stub.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a session against this stub with a no-op audit sink.
    pub fn session(&self, suite: SuiteKind, include_extensions: bool) -> HarnessSession {
        let mut config = HarnessConfig::new(suite, TargetAddress::new(self.base_url.clone()));
        config.timeout = Duration::from_secs(5);
        config.include_extensions = include_extensions;
        HarnessSession::new(config, Arc::new(NoopAuditSink)).expect("session")
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Builds a response with an optional content type.
pub fn respond(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> StubResponse {
    let mut response = Response::from_data(body.into()).with_status_code(status);
    if let Some(content_type) = content_type {
        let header = Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
            .expect("content type header");
        response = response.with_header(header);
    }
    response
}

/// Builds a JSON response; `None` yields an empty body.
pub fn json_response(status: u16, body: Option<Value>) -> StubResponse {
    let bytes = body.map(|body| body.to_string().into_bytes()).unwrap_or_default();
    respond(status, Some("application/json"), bytes)
}

// ============================================================================
// SECTION: Task Tracker
// ============================================================================

/// Deviations from the task tracker contract.
#[derive(Debug, Clone)]
pub struct TrackerQuirks {
    /// Login body key carrying the token.
    pub token_key: &'static str,
    /// Answer PUT with 405 so callers must fall back to PATCH.
    pub put_not_allowed: bool,
    /// Answer `?status=` with 400.
    pub filter_unsupported: bool,
    /// Let any authenticated identity read any task.
    pub leak_across_users: bool,
    /// Accept task creation without a title.
    pub accept_missing_title: bool,
    /// Fixed status for every registration attempt.
    pub register_status: Option<u16>,
    /// Answer successful registrations with 202 instead of 201.
    pub accepted_registration: bool,
    /// Fixed status for every login attempt.
    pub login_status: Option<u16>,
    /// Answer login with the token inside a bare JSON array.
    pub login_as_array: bool,
    /// Serve no project endpoints.
    pub without_projects: bool,
    /// Ignore `project_id` on task creation.
    pub drop_project_id: bool,
    /// Serve labels under `/api/tags` only.
    pub tags_only: bool,
}

impl Default for TrackerQuirks {
    fn default() -> Self {
        Self {
            token_key: "token",
            put_not_allowed: false,
            filter_unsupported: false,
            leak_across_users: false,
            accept_missing_title: false,
            register_status: None,
            accepted_registration: false,
            login_status: None,
            login_as_array: false,
            without_projects: false,
            drop_project_id: false,
            tags_only: false,
        }
    }
}

/// Stored task.
#[derive(Debug, Clone)]
struct StoredTask {
    owner: String,
    title: String,
    description: Value,
    status: String,
    project_id: Value,
}

impl StoredTask {
    fn to_json(&self, id: u64) -> Value {
        json!({
            "id": id,
            "title": self.title,
            "description": self.description,
            "status": self.status,
            "project_id": self.project_id,
        })
    }
}

/// Stored project or label.
#[derive(Debug, Clone)]
struct OwnedRecord {
    owner: String,
    body: Value,
}

/// Mutable tracker state shared with the test.
#[derive(Debug, Default)]
pub struct TrackerState {
    users: HashMap<String, String>,
    tokens: HashMap<String, String>,
    tasks: BTreeMap<u64, StoredTask>,
    projects: BTreeMap<u64, OwnedRecord>,
    labels: BTreeMap<u64, OwnedRecord>,
    next_id: u64,
    /// Registration requests received.
    pub registrations: usize,
    /// Login requests received.
    pub logins: usize,
}

/// Running task tracker stub.
pub struct TrackerStub {
    /// Underlying server.
    pub server: StubServer,
    /// Shared state for assertions.
    pub state: Arc<Mutex<TrackerState>>,
}

impl TrackerStub {
    /// Starts a tracker honouring `quirks`.
    pub fn start(quirks: TrackerQuirks) -> Self {
        let state = Arc::new(Mutex::new(TrackerState::default()));
        let shared = Arc::clone(&state);
        let server = StubServer::spawn(move |request| {
            let mut guard = shared.lock().expect("tracker state");
            let (status, body) = handle_tracker(&mut guard, &quirks, request);
            json_response(status, body)
        });
        Self {
            server,
            state,
        }
    }

    /// Starts a fully conforming tracker.
    pub fn conforming() -> Self {
        Self::start(TrackerQuirks::default())
    }

    /// Registration requests received so far.
    pub fn registrations(&self) -> usize {
        self.state.lock().expect("tracker state").registrations
    }

    /// Login requests received so far.
    pub fn logins(&self) -> usize {
        self.state.lock().expect("tracker state").logins
    }
}

fn handle_tracker(
    state: &mut TrackerState,
    quirks: &TrackerQuirks,
    request: &mut Request,
) -> (u16, Option<Value>) {
    let mut raw = String::new();
    let _ = request.as_reader().read_to_string(&mut raw);
    let body: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
    let (path, query) = split_url(request.url());
    let method = request.method().clone();
    let bearer = bearer_token(request);

    match (method, path.as_str()) {
        (Method::Post, "/api/auth/register") => register(state, quirks, &body),
        (Method::Post, "/api/auth/login") => login(state, quirks, &body),
        (method, "/api/tasks") => {
            let Some(owner) = bearer.and_then(|token| state.tokens.get(&token).cloned()) else {
                return (401, Some(json!({"error": "unauthorized"})));
            };
            match method {
                Method::Get => list_tasks(state, quirks, &owner, &query),
                Method::Post => create_task(state, quirks, &owner, &body),
                _ => (405, None),
            }
        }
        (method, path) if path.starts_with("/api/tasks/") => {
            let Some(owner) = bearer.and_then(|token| state.tokens.get(&token).cloned()) else {
                return (401, Some(json!({"error": "unauthorized"})));
            };
            let raw_id = path.trim_start_matches("/api/tasks/");
            task_item(state, quirks, &owner, method, raw_id, &body)
        }
        (method, path) => {
            let Some((collection, raw_id)) = record_route(quirks, path) else {
                return (404, Some(json!({"error": "not found"})));
            };
            let Some(owner) = bearer.and_then(|token| state.tokens.get(&token).cloned()) else {
                return (401, Some(json!({"error": "unauthorized"})));
            };
            let records = match collection {
                RecordKind::Project => &mut state.projects,
                RecordKind::Label => &mut state.labels,
            };
            let next_id = &mut state.next_id;
            owned_records(records, next_id, &owner, method, raw_id, &body)
        }
    }
}

fn register(state: &mut TrackerState, quirks: &TrackerQuirks, body: &Value) -> (u16, Option<Value>) {
    state.registrations += 1;
    if let Some(status) = quirks.register_status {
        return (status, Some(json!({"error": "registration disabled"})));
    }
    let username = body["username"].as_str().unwrap_or_default();
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if username.is_empty() || password.len() < 8 || !email.contains('@') {
        return (400, Some(json!({"error": "invalid registration"})));
    }
    if state.users.contains_key(username) {
        return (409, Some(json!({"error": "username taken"})));
    }
    state.users.insert(username.to_string(), password.to_string());
    let status = if quirks.accepted_registration { 202 } else { 201 };
    (status, Some(json!({"username": username, "email": email})))
}

fn login(state: &mut TrackerState, quirks: &TrackerQuirks, body: &Value) -> (u16, Option<Value>) {
    state.logins += 1;
    if let Some(status) = quirks.login_status {
        return (status, Some(json!({"error": "login disabled"})));
    }
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if state.users.get(username).is_none_or(|stored| stored != password) {
        return (401, Some(json!({"error": "invalid credentials"})));
    }
    let token = format!("tok-{}-{}", username, state.tokens.len());
    state.tokens.insert(token.clone(), username.to_string());
    if quirks.login_as_array {
        return (200, Some(json!([token])));
    }
    let mut payload = serde_json::Map::new();
    payload.insert(quirks.token_key.to_string(), Value::String(token));
    (200, Some(Value::Object(payload)))
}

fn list_tasks(
    state: &TrackerState,
    quirks: &TrackerQuirks,
    owner: &str,
    query: &HashMap<String, String>,
) -> (u16, Option<Value>) {
    let filter = query.get("status");
    if filter.is_some() && quirks.filter_unsupported {
        return (400, Some(json!({"error": "unsupported query"})));
    }
    let tasks: Vec<Value> = state
        .tasks
        .iter()
        .filter(|(_, task)| task.owner == owner)
        .filter(|(_, task)| filter.is_none_or(|status| &task.status == status))
        .map(|(id, task)| task.to_json(*id))
        .collect();
    (200, Some(json!({"tasks": tasks})))
}

fn create_task(
    state: &mut TrackerState,
    quirks: &TrackerQuirks,
    owner: &str,
    body: &Value,
) -> (u16, Option<Value>) {
    let title = body["title"].as_str().unwrap_or_default();
    if title.is_empty() && !quirks.accept_missing_title {
        return (400, Some(json!({"error": "title is required"})));
    }
    state.next_id += 1;
    let id = state.next_id;
    let task = StoredTask {
        owner: owner.to_string(),
        title: title.to_string(),
        description: body.get("description").cloned().unwrap_or(Value::Null),
        status: body["status"].as_str().unwrap_or("todo").to_string(),
        project_id: if quirks.drop_project_id {
            Value::Null
        } else {
            body.get("project_id").cloned().unwrap_or(Value::Null)
        },
    };
    let payload = task.to_json(id);
    state.tasks.insert(id, task);
    (201, Some(payload))
}

fn task_item(
    state: &mut TrackerState,
    quirks: &TrackerQuirks,
    owner: &str,
    method: Method,
    raw_id: &str,
    body: &Value,
) -> (u16, Option<Value>) {
    let not_found = (404, Some(json!({"error": "task not found"})));
    let Ok(id) = raw_id.parse::<u64>() else {
        return not_found;
    };
    let Some(task) = state.tasks.get_mut(&id) else {
        return not_found;
    };
    if task.owner != owner && !quirks.leak_across_users {
        return not_found;
    }
    match method {
        Method::Get => (200, Some(task.to_json(id))),
        Method::Put if quirks.put_not_allowed => (405, None),
        Method::Put => {
            task.title = body["title"].as_str().unwrap_or_default().to_string();
            task.description = body.get("description").cloned().unwrap_or(Value::Null);
            task.status = body["status"].as_str().unwrap_or("todo").to_string();
            (200, Some(task.to_json(id)))
        }
        Method::Patch => {
            if let Some(title) = body["title"].as_str() {
                task.title = title.to_string();
            }
            if let Some(description) = body.get("description") {
                task.description = description.clone();
            }
            if let Some(status) = body["status"].as_str() {
                task.status = status.to_string();
            }
            (200, Some(task.to_json(id)))
        }
        Method::Delete => {
            state.tasks.remove(&id);
            (204, None)
        }
        _ => (405, None),
    }
}

/// Resource served by the generic owned-record handler.
#[derive(Debug, Clone, Copy)]
enum RecordKind {
    Project,
    Label,
}

/// Maps a path to a record collection and an optional item id.
fn record_route<'p>(quirks: &TrackerQuirks, path: &'p str) -> Option<(RecordKind, Option<&'p str>)> {
    let label_root = if quirks.tags_only { "/api/tags" } else { "/api/categories" };
    let (kind, rest) = if let Some(rest) = path.strip_prefix("/api/projects") {
        if quirks.without_projects {
            return None;
        }
        (RecordKind::Project, rest)
    } else {
        (RecordKind::Label, path.strip_prefix(label_root)?)
    };
    match rest {
        "" => Some((kind, None)),
        rest => rest.strip_prefix('/').map(|id| (kind, Some(id))),
    }
}

/// Create, list, get and delete for projects and labels.
fn owned_records(
    records: &mut BTreeMap<u64, OwnedRecord>,
    next_id: &mut u64,
    owner: &str,
    method: Method,
    raw_id: Option<&str>,
    body: &Value,
) -> (u16, Option<Value>) {
    let render = |id: u64, record: &OwnedRecord| {
        let mut rendered = record.body.clone();
        rendered["id"] = json!(id);
        rendered
    };
    let Some(raw_id) = raw_id else {
        return match method {
            Method::Get => {
                let items: Vec<Value> = records
                    .iter()
                    .filter(|(_, record)| record.owner == owner)
                    .map(|(id, record)| render(*id, record))
                    .collect();
                (200, Some(Value::Array(items)))
            }
            Method::Post => {
                if body["name"].as_str().is_none_or(str::is_empty) {
                    return (400, Some(json!({"error": "name is required"})));
                }
                *next_id += 1;
                let record = OwnedRecord {
                    owner: owner.to_string(),
                    body: body.clone(),
                };
                let rendered = render(*next_id, &record);
                records.insert(*next_id, record);
                (201, Some(rendered))
            }
            _ => (405, None),
        };
    };
    let not_found = (404, Some(json!({"error": "not found"})));
    let Ok(id) = raw_id.parse::<u64>() else {
        return not_found;
    };
    if records.get(&id).is_none_or(|record| record.owner != owner) {
        return not_found;
    }
    match method {
        Method::Get => records.get(&id).map_or(not_found, |record| (200, Some(render(id, record)))),
        Method::Delete => {
            records.remove(&id);
            (204, None)
        }
        _ => (405, None),
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv("Authorization"))
        .and_then(|header| header.value.as_str().strip_prefix("Bearer ").map(str::to_string))
}

fn split_url(url: &str) -> (String, HashMap<String, String>) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let pairs = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    (path.to_string(), pairs)
}

// ============================================================================
// SECTION: Day Server
// ============================================================================

/// Deviations from the day server contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct DayQuirks {
    /// Leave the weekday name out of the page.
    pub omit_day: bool,
    /// Serve the page as `text/plain`.
    pub plain_text: bool,
    /// Serve the page without any styling.
    pub unstyled: bool,
    /// Answer unknown routes with 200.
    pub catch_all: bool,
    /// Style the page through an unquoted stylesheet link.
    pub linked_stylesheet: bool,
}

/// Starts a day server honouring `quirks`.
pub fn start_day_server(quirks: DayQuirks) -> StubServer {
    StubServer::spawn(move |request| {
        let is_index = request.url() == "/";
        let method_ok = matches!(request.method(), Method::Get | Method::Head);
        if !method_ok || (!is_index && !quirks.catch_all) {
            return respond(404, Some("text/html; charset=utf-8"), "<h1>Not Found</h1>");
        }
        let day = if quirks.omit_day { "someday".to_string() } else { current_day_name() };
        let style = if quirks.unstyled {
            ""
        } else if quirks.linked_stylesheet {
            "<link rel=stylesheet href=/static/site.css>"
        } else {
            "<style>body { font-family: sans-serif; }</style>"
        };
        let page = format!(
            "<!DOCTYPE html><html><head><title>Day</title>{style}</head>\
             <body><h1>Today is {day}</h1></body></html>"
        );
        let content_type = if quirks.plain_text { "text/plain" } else { "text/html; charset=utf-8" };
        respond(200, Some(content_type), page)
    })
}
