//! End-to-end monitoring scenario.
//!
//! An app with two GraphQL tests is probed over consecutive cycles while
//! one of its endpoints degrades; the aggregated health must track the
//! latest outcome per test.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;

use vigil_probe::Prober;
use vigil_scheduler::CycleRunner;
use vigil_state::*;

/// Serve an endpoint whose status code can be flipped mid-test.
async fn switchable_endpoint() -> (String, Arc<AtomicU16>) {
    async fn respond(State(status): State<Arc<AtomicU16>>) -> StatusCode {
        StatusCode::from_u16(status.load(Ordering::Relaxed))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    let status = Arc::new(AtomicU16::new(200));
    let router = Router::new()
        .route("/", get(respond))
        .with_state(status.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}/"), status)
}

fn graphql_test(url: &str) -> NewTest {
    NewTest {
        name: "GraphQL Root".to_string(),
        url: url.to_string(),
        method: HttpMethod::Get,
        parameters: "query {\n  status\n}".to_string(),
        graphql: true,
    }
}

#[tokio::test]
async fn health_tracks_cycles_as_an_endpoint_degrades() {
    let (stable_url, _stable) = switchable_endpoint().await;
    let (flaky_url, flaky) = switchable_endpoint().await;

    let store = StateStore::open_in_memory().unwrap();
    let app = store
        .create_app(
            &NewApp {
                name: "Eatery".to_string(),
                icon: "https://icons.example/eatery.png".to_string(),
            },
            1000,
        )
        .unwrap();
    store
        .create_test(app.id, &graphql_test(&stable_url), 1000)
        .unwrap()
        .unwrap();
    store
        .create_test(app.id, &graphql_test(&flaky_url), 1000)
        .unwrap()
        .unwrap();

    let prober = Prober::new(Duration::from_millis(500)).unwrap();
    let runner = CycleRunner::new(store.clone(), prober);

    // First cycle: both endpoints healthy.
    let report = runner.run_cycle().await.unwrap();
    assert_eq!((report.probed, report.passed), (2, 2));
    assert_eq!(
        store.latest_health(app.id).unwrap().unwrap(),
        HealthSummary { passed: 2, total: 2 }
    );

    // One endpoint starts failing; the next cycle's outcomes win.
    flaky.store(500, Ordering::Relaxed);
    let report = runner.run_cycle().await.unwrap();
    assert_eq!((report.probed, report.passed), (2, 1));
    assert_eq!(
        store.latest_health(app.id).unwrap().unwrap(),
        HealthSummary { passed: 1, total: 2 }
    );

    // Recovery is reflected just as promptly.
    flaky.store(204, Ordering::Relaxed);
    runner.run_cycle().await.unwrap();
    assert_eq!(
        store.latest_health(app.id).unwrap().unwrap(),
        HealthSummary { passed: 2, total: 2 }
    );

    // Three cycles, two tests: six results on record.
    let mut recorded = 0;
    for test in store.list_tests_for_app(app.id).unwrap() {
        recorded += store.list_results_for_test(test.id, 50).unwrap().len();
    }
    assert_eq!(recorded, 6);
}

#[tokio::test]
async fn on_demand_cycle_matches_periodic_shape() {
    let (url, status) = switchable_endpoint().await;

    let store = StateStore::open_in_memory().unwrap();
    let app = store
        .create_app(
            &NewApp {
                name: "Transit".to_string(),
                icon: "https://icons.example/transit.png".to_string(),
            },
            1000,
        )
        .unwrap();
    store
        .create_test(app.id, &graphql_test(&url), 1000)
        .unwrap()
        .unwrap();

    let prober = Prober::new(Duration::from_millis(500)).unwrap();
    let runner = CycleRunner::new(store.clone(), prober);

    let summary = runner.run_app_cycle(app.id).await.unwrap().unwrap();
    assert_eq!(summary, HealthSummary { passed: 1, total: 1 });

    status.store(503, Ordering::Relaxed);
    let summary = runner.run_app_cycle(app.id).await.unwrap().unwrap();
    assert_eq!(summary, HealthSummary { passed: 0, total: 1 });

    // The on-demand path persisted both outcomes.
    let test = &store.list_tests_for_app(app.id).unwrap()[0];
    assert_eq!(store.list_results_for_test(test.id, 10).unwrap().len(), 2);
}
