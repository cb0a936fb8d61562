// tests/catalog_gql.rs
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use twitch_drops_watchdog::catalog::twitch_gql::TwitchGqlClient;
use twitch_drops_watchdog::CatalogClient;

/// (Authorization, Client-Id, request body) per call.
type Calls = Arc<Mutex<Vec<(String, String, Value)>>>;

fn raw_campaign(id: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Campaign {id}"),
        "startAt": "2024-05-01T17:00:00Z",
        "endAt": "2024-05-15T17:00:00Z",
        "game": {"id": "g1", "displayName": "Foo"}
    })
}

fn record(calls: &Calls, headers: &HeaderMap, body: &str) -> Value {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let body: Value = serde_json::from_str(body).unwrap();
    calls
        .lock()
        .push((header("authorization"), header("client-id"), body.clone()));
    body
}

async fn dashboard(State(calls): State<Calls>, headers: HeaderMap, body: String) -> Json<Value> {
    record(&calls, &headers, &body);
    Json(json!([{"data": {"currentUser": {"dropCampaigns": [raw_campaign("c1"), raw_campaign("c2")]}}}]))
}

async fn details(State(calls): State<Calls>, headers: HeaderMap, body: String) -> Json<Value> {
    let ops = record(&calls, &headers, &body);
    let out: Vec<Value> = ops
        .as_array()
        .unwrap()
        .iter()
        .map(|op| {
            let id = op["variables"]["dropID"].as_str().unwrap();
            json!({"data": {"user": {"dropCampaign": raw_campaign(id)}}})
        })
        .collect();
    Json(Value::Array(out))
}

async fn gql_errors() -> Json<Value> {
    Json(json!([{"errors": [{"message": "service timeout"}], "data": null}]))
}

async fn unauthorized() -> (StatusCode, &'static str) {
    (StatusCode::UNAUTHORIZED, "bad token")
}

async fn spawn_fake() -> (String, Calls) {
    let calls: Calls = Arc::default();
    let app = Router::new()
        .route("/dashboard", post(dashboard))
        .route("/details", post(details))
        .route("/errors", post(gql_errors))
        .route("/unauthorized", post(unauthorized))
        .with_state(calls.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), calls)
}

fn client(base: &str, path: &str) -> TwitchGqlClient {
    TwitchGqlClient::new("cid-123", "tok-456", "someone")
        .unwrap()
        .with_endpoint(format!("{base}{path}"))
}

#[tokio::test]
async fn dashboard_query_sends_auth_headers_and_parses_campaigns() {
    let (base, calls) = spawn_fake().await;

    let campaigns = client(&base, "/dashboard").list_campaigns().await.unwrap();
    let ids: Vec<&str> = campaigns.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2"]);

    let calls = calls.lock();
    let (auth, client_id, body) = &calls[0];
    assert_eq!(auth, "OAuth tok-456");
    assert_eq!(client_id, "cid-123");
    assert_eq!(body[0]["operationName"], "ViewerDropsDashboard");
}

#[tokio::test]
async fn details_are_batched_into_one_request() {
    let (base, calls) = spawn_fake().await;

    let ids = vec!["c1".to_string(), "c9".to_string()];
    let details = client(&base, "/details").get_campaign_details(&ids).await.unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[1].id, "c9");

    let calls = calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].2[1]["variables"]["channelLogin"], "someone");
}

#[tokio::test]
async fn graphql_errors_and_bad_status_fail_the_fetch() {
    let (base, _) = spawn_fake().await;

    let err = client(&base, "/errors").list_campaigns().await.unwrap_err();
    assert!(format!("{err:#}").contains("service timeout"));

    let err = client(&base, "/unauthorized").list_campaigns().await.unwrap_err();
    assert!(format!("{err:#}").contains("401"));
}
