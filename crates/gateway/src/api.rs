//! Research API handlers.
//!
//! - `GET  /api/health`
//! - `POST /api/research/start`       : launch a run in the background
//! - `GET  /api/research/status/{id}` : status, progress, report preview
//! - `GET  /api/research/report/{id}` : full Markdown report
//! - `GET  /api/research/list`        : every run, newest first
//! - `POST /api/research/cancel/{id}` : stop a run at its next step

use std::sync::Arc;

use agora_agent::{ResearchPipeline, ResearchRequest, WorkflowStep};
use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::SharedState;
use crate::tasks::{CancelRefusal, TaskRecord, TaskStatus};

/// Characters of the report included in a status response.
const PREVIEW_CHARS: usize = 1000;

pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/research/start", post(start_handler))
        .route("/api/research/status/{task_id}", get(status_handler))
        .route("/api/research/report/{task_id}", get(report_handler))
        .route("/api/research/list", get(list_handler))
        .route("/api/research/cancel/{task_id}", post(cancel_handler))
        .with_state(state)
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

fn not_found() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "Task not found")
}

// ── Health ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    api_configured: bool,
    provider: String,
    model: String,
    embeddings: bool,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        api_configured: state.services.config.has_api_key(),
        provider: state.services.model.provider_name().to_string(),
        model: state.services.model.model().to_string(),
        embeddings: state.services.store.embeddings_enabled(),
    })
}

// ── Start ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StartResponse {
    task_id: String,
    status: &'static str,
    message: &'static str,
}

async fn start_handler(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<(StatusCode, Json<StartResponse>), ApiError> {
    let request: ResearchRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ResearchRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid request body: {e}")))?
    };

    let domain = request
        .domain
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    let (task_id, cancel) = state.tasks.create(domain);
    info!(task_id = %task_id, domain = ?domain, urls = request.urls.len(), "Research task started");

    let services = state.services.clone();
    let progress_state = state.clone();
    let progress_id = task_id.clone();
    let pipeline = ResearchPipeline::new(
        services.store,
        services.model,
        services.scraper,
        services.config.research,
    )
    .with_cancel_flag(cancel)
    .with_progress(Arc::new(move |step: &WorkflowStep| {
        progress_state.tasks.set_progress(&progress_id, &step.description);
    }));

    let run_state = state.clone();
    let run_id = task_id.clone();
    tokio::spawn(async move {
        match pipeline.run(request).await {
            Ok(report) => run_state.tasks.complete(&run_id, report),
            Err(e) => {
                error!(task_id = %run_id, error = %e, "Research task failed");
                run_state.tasks.fail(&run_id, e.to_string());
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(StartResponse {
            task_id,
            status: "started",
            message: "Research task started",
        }),
    ))
}

// ── Status ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusResponse {
    task_id: String,
    status: TaskStatus,
    domain: String,
    progress: String,
    started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn preview(report: &str) -> String {
    match report.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &report[..idx]),
        None => report.to_string(),
    }
}

impl From<TaskRecord> for StatusResponse {
    fn from(task: TaskRecord) -> Self {
        let completed = task.status == TaskStatus::Completed;
        Self {
            report_file: task
                .report_file
                .filter(|_| completed)
                .map(|p| p.display().to_string()),
            report_preview: task.report.as_deref().filter(|_| completed).map(preview),
            error: task.error.filter(|_| task.status == TaskStatus::Error),
            task_id: task.task_id,
            status: task.status,
            domain: task.domain,
            progress: task.progress,
            started_at: task.started_at,
            completed_at: task.completed_at,
        }
    }
}

async fn status_handler(
    State(state): State<SharedState>,
    Path(task_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .tasks
        .get(&task_id)
        .map(|task| Json(task.into()))
        .ok_or_else(not_found)
}

// ── Report ────────────────────────────────────────────────────────────────

async fn report_handler(
    State(state): State<SharedState>,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    let task = state.tasks.get(&task_id).ok_or_else(not_found)?;
    if task.status != TaskStatus::Completed {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Research not completed yet",
                "status": task.status,
            })),
        ));
    }
    let report = task
        .report
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Report not available"))?;

    let file_name = task
        .report_file
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{task_id}.md"));

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        report,
    )
        .into_response())
}

// ── List / cancel ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ListResponse {
    tasks: Vec<StatusResponse>,
    count: usize,
}

async fn list_handler(State(state): State<SharedState>) -> Json<ListResponse> {
    let tasks: Vec<StatusResponse> = state.tasks.list().into_iter().map(Into::into).collect();
    Json(ListResponse {
        count: tasks.len(),
        tasks,
    })
}

async fn cancel_handler(
    State(state): State<SharedState>,
    Path(task_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.tasks.cancel(&task_id) {
        Ok(()) => {
            info!(task_id = %task_id, "Research task cancelled");
            Ok(Json(json!({ "task_id": task_id, "status": TaskStatus::Cancelled })))
        }
        Err(CancelRefusal::NotFound) => Err(not_found()),
        Err(CancelRefusal::AlreadyFinished(status)) => Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Task already {status}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatewayState, services::Services};
    use agora_agent::ModelClient;
    use agora_config::{AppConfig, ResearchConfig};
    use agora_core::Provider;
    use agora_core::error::ProviderError;
    use agora_core::message::Message;
    use agora_core::provider::{ProviderRequest, ProviderResponse};
    use agora_memory::ContentStore;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Answers every prompt with the same prose, optionally after a delay.
    struct SlowProvider {
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl Provider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(self.delay).await;
            Ok(ProviderResponse {
                message: Message::assistant("Nothing structured to report."),
                usage: None,
                model: "slow-model".into(),
            })
        }
    }

    fn state(delay: Duration) -> SharedState {
        let config = AppConfig {
            api_key: Some("test-key".into()),
            research: ResearchConfig {
                reports_dir: std::env::temp_dir().join("agora-gateway-tests"),
                ..ResearchConfig::default()
            },
            ..AppConfig::default()
        };
        let services = Services {
            model: ModelClient::new(Arc::new(SlowProvider { delay }), "slow-model"),
            store: Arc::new(ContentStore::in_memory()),
            scraper: None,
            config,
        };
        Arc::new(GatewayState::new(services))
    }

    async fn send(state: &SharedState, method: &str, uri: &str, body: &str) -> (StatusCode, Bytes) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = api_router(state.clone()).oneshot(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body)
    }

    fn json_of(body: &Bytes) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    async fn wait_for(state: &SharedState, task_id: &str, status: TaskStatus) {
        for _ in 0..200 {
            if state.tasks.get(task_id).is_some_and(|t| t.status == status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {task_id} never reached {status}");
    }

    #[tokio::test]
    async fn health_endpoint() {
        let state = state(Duration::ZERO);
        let (status, body) = send(&state, "GET", "/api/health", "").await;
        assert_eq!(status, StatusCode::OK);
        let json = json_of(&body);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["api_configured"], true);
        assert_eq!(json["embeddings"], false);
    }

    #[tokio::test]
    async fn run_to_completion_and_fetch_report() {
        let state = state(Duration::ZERO);
        let (status, body) = send(&state, "POST", "/api/research/start", r#"{"domain": "tidal energy"}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let started = json_of(&body);
        assert_eq!(started["status"], "started");
        let task_id = started["task_id"].as_str().unwrap().to_string();

        wait_for(&state, &task_id, TaskStatus::Completed).await;

        let (status, body) = send(&state, "GET", &format!("/api/research/status/{task_id}"), "").await;
        assert_eq!(status, StatusCode::OK);
        let json = json_of(&body);
        assert_eq!(json["status"], "completed");
        assert_eq!(json["domain"], "tidal energy");
        let preview = json["report_preview"].as_str().unwrap();
        assert!(preview.starts_with("# Autonomous Research Report"));
        assert!(preview.chars().count() <= PREVIEW_CHARS + 3);

        let (status, body) = send(&state, "GET", &format!("/api/research/report/{task_id}"), "").await;
        assert_eq!(status, StatusCode::OK);
        let report = String::from_utf8(body.to_vec()).unwrap();
        assert!(report.contains("**Research Domain**: tidal energy"));

        let (status, _) = send(&state, "POST", &format!("/api/research/cancel/{task_id}"), "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_body_auto_selects_domain() {
        let state = state(Duration::ZERO);
        let (status, body) = send(&state, "POST", "/api/research/start", "").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let task_id = json_of(&body)["task_id"].as_str().unwrap().to_string();
        assert_eq!(state.tasks.get(&task_id).unwrap().domain, crate::tasks::AUTO_DOMAIN);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let state = state(Duration::ZERO);
        let (status, body) = send(&state, "POST", "/api/research/start", "{nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_of(&body)["error"].as_str().unwrap().contains("Invalid request body"));
        assert!(state.tasks.list().is_empty());
    }

    #[tokio::test]
    async fn report_before_completion_is_400() {
        let state = state(Duration::from_secs(30));
        let (_, body) = send(&state, "POST", "/api/research/start", r#"{"domain": "x"}"#).await;
        let task_id = json_of(&body)["task_id"].as_str().unwrap().to_string();

        let (status, body) = send(&state, "GET", &format!("/api/research/report/{task_id}"), "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&body)["status"], "running");
    }

    #[tokio::test]
    async fn cancel_running_task() {
        let state = state(Duration::from_millis(50));
        let (_, body) = send(&state, "POST", "/api/research/start", r#"{"domain": "x"}"#).await;
        let task_id = json_of(&body)["task_id"].as_str().unwrap().to_string();

        let (status, body) = send(&state, "POST", &format!("/api/research/cancel/{task_id}"), "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["status"], "cancelled");

        // the in-flight step finishes, then the run stops and stays cancelled
        tokio::time::sleep(Duration::from_millis(200)).await;
        let task = state.tasks.get(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert!(task.report.is_none());
    }

    #[tokio::test]
    async fn unknown_ids_are_404() {
        let state = state(Duration::ZERO);
        for (method, uri) in [
            ("GET", "/api/research/status/nope"),
            ("GET", "/api/research/report/nope"),
            ("POST", "/api/research/cancel/nope"),
        ] {
            let (status, body) = send(&state, method, uri, "").await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(json_of(&body)["error"], "Task not found");
        }
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let state = state(Duration::from_secs(30));
        let (_, first) = send(&state, "POST", "/api/research/start", r#"{"domain": "a"}"#).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (_, second) = send(&state, "POST", "/api/research/start", r#"{"domain": "b"}"#).await;

        let (status, body) = send(&state, "GET", "/api/research/list", "").await;
        assert_eq!(status, StatusCode::OK);
        let json = json_of(&body);
        assert_eq!(json["count"], 2);
        assert_eq!(json["tasks"][0]["task_id"], json_of(&second)["task_id"]);
        assert_eq!(json["tasks"][1]["task_id"], json_of(&first)["task_id"]);
    }
}
