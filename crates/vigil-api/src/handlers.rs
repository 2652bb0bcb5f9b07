//! REST API handlers.
//!
//! Each handler reads/writes via `StateStore` (plus `CycleRunner` for the
//! on-demand probe path) and returns JSON responses in a uniform
//! `{success, data, error}` envelope.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use vigil_state::*;

use crate::ApiState;

/// Cap on how many historical results one request may return.
const MAX_RESULTS: usize = 50;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// An app with its tests embedded, as clients expect it.
#[derive(serde::Serialize)]
pub struct AppDetail {
    #[serde(flatten)]
    pub info: AppInfo,
    pub tests: Vec<TestSpec>,
}

fn app_detail(store: &StateStore, info: AppInfo) -> StateResult<AppDetail> {
    let tests = store.list_tests_for_app(info.id)?;
    Ok(AppDetail { info, tests })
}

// ── Apps ───────────────────────────────────────────────────────

/// GET /api/apps
pub async fn list_apps(State(state): State<ApiState>) -> impl IntoResponse {
    let details = state.store.list_apps().and_then(|apps| {
        apps.into_iter()
            .map(|app| app_detail(&state.store, app))
            .collect::<StateResult<Vec<_>>>()
    });
    match details {
        Ok(apps) => ApiResponse::ok(apps).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /api/app/{id}
pub async fn get_app(State(state): State<ApiState>, Path(id): Path<AppId>) -> impl IntoResponse {
    match state.store.get_app(id) {
        Ok(Some(app)) => match app_detail(&state.store, app) {
            Ok(detail) => ApiResponse::ok(detail).into_response(),
            Err(e) => {
                error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
            }
        },
        Ok(None) => error_response("app not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// POST /api/apps
pub async fn create_app(
    State(state): State<ApiState>,
    Json(new): Json<NewApp>,
) -> impl IntoResponse {
    match state.store.create_app(&new, epoch_secs()) {
        Ok(app) => (
            StatusCode::CREATED,
            ApiResponse::ok(AppDetail {
                info: app,
                tests: Vec::new(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// DELETE /api/app/{id}
pub async fn delete_app(State(state): State<ApiState>, Path(id): Path<AppId>) -> impl IntoResponse {
    // Fetch first so the deleted record can be echoed back.
    let found = match state.store.get_app(id) {
        Ok(found) => found,
        Err(e) => {
            return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
                .into_response();
        }
    };
    let Some(app) = found else {
        return error_response("app not found", StatusCode::NOT_FOUND).into_response();
    };
    let detail = match app_detail(&state.store, app) {
        Ok(detail) => detail,
        Err(e) => {
            return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
                .into_response();
        }
    };
    match state.store.delete_app(id) {
        Ok(_) => ApiResponse::ok(detail).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Tests ──────────────────────────────────────────────────────

/// GET /api/tests
pub async fn list_tests(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_tests() {
        Ok(tests) => ApiResponse::ok(tests).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /api/tests/{app_id}
pub async fn list_tests_for_app(
    State(state): State<ApiState>,
    Path(app_id): Path<AppId>,
) -> impl IntoResponse {
    match state.store.get_app(app_id) {
        Ok(Some(_)) => match state.store.list_tests_for_app(app_id) {
            Ok(tests) => ApiResponse::ok(tests).into_response(),
            Err(e) => {
                error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
            }
        },
        Ok(None) => error_response("app not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// POST /api/test/{id} — create a test under app `{id}`.
pub async fn create_test(
    State(state): State<ApiState>,
    Path(app_id): Path<AppId>,
    Json(new): Json<NewTest>,
) -> impl IntoResponse {
    match state.store.create_test(app_id, &new, epoch_secs()) {
        Ok(Some(test)) => (StatusCode::CREATED, ApiResponse::ok(test)).into_response(),
        Ok(None) => error_response("app not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// DELETE /api/test/{id}
pub async fn delete_test(
    State(state): State<ApiState>,
    Path(test_id): Path<TestId>,
) -> impl IntoResponse {
    match state.store.delete_test(test_id, epoch_secs()) {
        Ok(Some(test)) => ApiResponse::ok(test).into_response(),
        Ok(None) => error_response("test not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Results ────────────────────────────────────────────────────

/// GET /api/results-now/{app_id} — probe the app's tests right now.
///
/// Records one result per test (same persistence as the periodic path)
/// and returns the freshly measured summary.
pub async fn results_now(
    State(state): State<ApiState>,
    Path(app_id): Path<AppId>,
) -> impl IntoResponse {
    match state.runner.run_app_cycle(app_id).await {
        Ok(Some(summary)) => ApiResponse::ok(summary).into_response(),
        Ok(None) => error_response("app not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /api/results/{app_id} — latest health from history, no probing.
pub async fn latest_results(
    State(state): State<ApiState>,
    Path(app_id): Path<AppId>,
) -> impl IntoResponse {
    match state.store.latest_health(app_id) {
        Ok(Some(summary)) => ApiResponse::ok(summary).into_response(),
        Ok(None) => error_response("app not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /api/results/history/{test_id}
pub async fn result_history(
    State(state): State<ApiState>,
    Path(test_id): Path<TestId>,
) -> impl IntoResponse {
    match state.store.get_test(test_id) {
        Ok(Some(_)) => match state.store.list_results_for_test(test_id, MAX_RESULTS) {
            Ok(results) => ApiResponse::ok(results).into_response(),
            Err(e) => {
                error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
            }
        },
        Ok(None) => error_response("test not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// DELETE /api/results/clear
pub async fn clear_results(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.clear_results() {
        Ok(count) => ApiResponse::ok(serde_json::json!({ "cleared": count })).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}
