// tests/metrics_router.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusBuilder;
use tower::ServiceExt;
use twitch_drops_watchdog::metrics::Metrics;

async fn get_text(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn healthz_and_metrics_are_served() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let metrics = Metrics::from_handle(recorder.handle());

    metrics::with_local_recorder(&recorder, || {
        metrics::counter!("watchdog_cycles_total").increment(2);
        metrics::counter!("notify_deliveries_total", "notifier" => "email").increment(1);
    });

    let (status, text) = get_text(metrics.router(), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "ok");

    let (status, text) = get_text(metrics.router(), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("watchdog_cycles_total 2"), "got:\n{text}");
    assert!(text.contains(r#"notify_deliveries_total{notifier="email"} 1"#), "got:\n{text}");
}
