//! vigil-api — REST API for Vigil.
//!
//! Provides axum route handlers for managing monitored apps and their
//! tests, and for reading or refreshing health results.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/apps` | List all apps with their tests |
//! | POST | `/api/apps` | Register an app |
//! | GET | `/api/app/{id}` | Get one app with its tests |
//! | DELETE | `/api/app/{id}` | Delete an app (cascades) |
//! | GET | `/api/tests` | List all tests |
//! | GET | `/api/tests/{app_id}` | List one app's tests |
//! | POST | `/api/test/{id}` | Register a test under app `{id}` |
//! | DELETE | `/api/test/{id}` | Delete test `{id}` (cascades) |
//! | GET | `/api/results-now/{app_id}` | Probe the app's tests now, return the summary |
//! | GET | `/api/results/{app_id}` | Latest health from recorded history |
//! | GET | `/api/results/history/{test_id}` | Most recent results (capped) |
//! | DELETE | `/api/results/clear` | Bulk-delete all results |

pub mod handlers;

use axum::Router;
use axum::routing::{delete, get, post};

use vigil_scheduler::CycleRunner;
use vigil_state::StateStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    /// Drives the on-demand probe path (`/results-now/{app_id}`).
    pub runner: CycleRunner,
}

/// Build the complete API router.
pub fn build_router(store: StateStore, runner: CycleRunner) -> Router {
    let state = ApiState { store, runner };

    let api_routes = Router::new()
        .route("/apps", get(handlers::list_apps).post(handlers::create_app))
        .route("/app/{id}", get(handlers::get_app).delete(handlers::delete_app))
        .route("/tests", get(handlers::list_tests))
        .route("/tests/{app_id}", get(handlers::list_tests_for_app))
        .route("/test/{id}", post(handlers::create_test).delete(handlers::delete_test))
        .route("/results-now/{app_id}", get(handlers::results_now))
        .route("/results/{app_id}", get(handlers::latest_results))
        .route("/results/history/{test_id}", get(handlers::result_history))
        .route("/results/clear", delete(handlers::clear_results))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}
