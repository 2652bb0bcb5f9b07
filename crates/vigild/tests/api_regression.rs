//! API regression tests.
//!
//! Drives the full router the way a status client would: register apps
//! and tests, read health, and exercise the maintenance path.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use vigil_api::build_router;
use vigil_probe::Prober;
use vigil_scheduler::CycleRunner;
use vigil_state::*;

fn test_router() -> (Router, StateStore) {
    let store = StateStore::open_in_memory().unwrap();
    let prober = Prober::new(Duration::from_millis(200)).unwrap();
    let runner = CycleRunner::new(store.clone(), prober);
    (build_router(store.clone(), runner), store)
}

fn seed_app(store: &StateStore, name: &str) -> AppInfo {
    store
        .create_app(
            &NewApp {
                name: name.to_string(),
                icon: format!("https://icons.example/{name}.png"),
            },
            1000,
        )
        .unwrap()
}

fn seed_test(store: &StateStore, app_id: AppId) -> TestSpec {
    store
        .create_test(
            app_id,
            &NewTest {
                name: "Root Test".to_string(),
                // Nothing listens on port 1; on-demand probes fail fast.
                url: "http://127.0.0.1:1/".to_string(),
                method: HttpMethod::Get,
                parameters: String::new(),
                graphql: false,
            },
            1000,
        )
        .unwrap()
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn list_apps_empty() {
    let (router, _) = test_router();

    let resp = router.oneshot(get("/api/apps")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], serde_json::json!([]));
}

#[tokio::test]
async fn create_app_then_fetch_it() {
    let (router, _) = test_router();

    let resp = router
        .clone()
        .oneshot(post_json(
            "/api/apps",
            r#"{"name":"Eatery","icon":"https://icons.example/eatery.png"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["name"], "Eatery");
    let id = json["data"]["id"].as_u64().unwrap();

    let resp = router.oneshot(get(&format!("/api/app/{id}"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["tests"], serde_json::json!([]));
}

#[tokio::test]
async fn missing_records_are_404() {
    let (router, _) = test_router();

    for uri in [
        "/api/app/42",
        "/api/tests/42",
        "/api/results-now/42",
        "/api/results/42",
        "/api/results/history/42",
    ] {
        let resp = router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET {uri}");
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
    }
}

#[tokio::test]
async fn create_test_under_app() {
    let (router, store) = test_router();
    let app = seed_app(&store, "transit");

    let resp = router
        .clone()
        .oneshot(post_json(
            &format!("/api/test/{}", app.id),
            r#"{"name":"Root Test","url":"http://127.0.0.1:1/","method":"GET"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["method"], "GET");

    // The app payload now embeds the test.
    let resp = router
        .oneshot(get(&format!("/api/app/{}", app.id)))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["data"]["tests"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn fresh_app_health_is_optimistic() {
    let (router, store) = test_router();
    let app = seed_app(&store, "uplift");

    // Zero tests: total floors at 1.
    let resp = router
        .clone()
        .oneshot(get(&format!("/api/results/{}", app.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"], serde_json::json!({"success": 0, "total": 1}));

    // A test with no history counts as passing.
    seed_test(&store, app.id);
    let resp = router
        .oneshot(get(&format!("/api/results/{}", app.id)))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["data"], serde_json::json!({"success": 1, "total": 1}));
}

#[tokio::test]
async fn results_now_probes_and_reports() {
    let (router, store) = test_router();
    let app = seed_app(&store, "pollo");
    let test = seed_test(&store, app.id);

    let resp = router
        .clone()
        .oneshot(get(&format!("/api/results-now/{}", app.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"], serde_json::json!({"success": 0, "total": 1}));

    // The probe was persisted into history.
    let resp = router
        .oneshot(get(&format!("/api/results/history/{}", test.id)))
        .await
        .unwrap();
    let json = body_json(resp).await;
    let history = json["data"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["success"], false);
}

#[tokio::test]
async fn delete_app_cascades_through_api() {
    let (router, store) = test_router();
    let app = seed_app(&store, "eatery");
    let test = seed_test(&store, app.id);
    store.append_result(test.id, true, 2000).unwrap();

    let resp = router
        .clone()
        .oneshot(delete(&format!("/api/app/{}", app.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
        .clone()
        .oneshot(get(&format!("/api/app/{}", app.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = router
        .oneshot(get(&format!("/api/results/history/{}", test.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clear_results_is_reachable_despite_dynamic_sibling_route() {
    let (router, store) = test_router();
    let app = seed_app(&store, "transit");
    let test = seed_test(&store, app.id);
    store.append_result(test.id, false, 2000).unwrap();
    store.append_result(test.id, true, 2001).unwrap();

    let resp = router.oneshot(delete("/api/results/clear")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["cleared"], 2);

    assert!(store.list_results_for_test(test.id, 10).unwrap().is_empty());
}
