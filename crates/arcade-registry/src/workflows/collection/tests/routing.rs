use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::collection::memory::{InMemoryImageStore, InMemoryRecordStore};
use crate::workflows::collection::repository::RecordStore;
use crate::workflows::collection::router::{approve_handler, IDENTITY_HEADER};
use crate::workflows::collection::ItemId;

fn json_request(method: &str, uri: &str, identity: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(identity) = identity {
        builder = builder.header(IDENTITY_HEADER, identity);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str, identity: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(identity) = identity {
        builder = builder.header(IDENTITY_HEADER, identity);
    }
    builder.body(Body::empty()).unwrap()
}

fn galaga_payload() -> Value {
    json!({
        "name": "Galaga",
        "category": "arcade",
        "owner": { "name": "Pat", "email": "pat@x.com" }
    })
}

#[tokio::test]
async fn submit_route_accepts_public_drafts() {
    let (router, store) = router_for(harness());

    let response = router
        .oneshot(json_request("POST", "/api/v1/items", None, galaga_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "pending approval");
    assert_eq!(body["slug"], "galaga");

    let id = ItemId(body["id"].as_str().expect("id string").to_string());
    assert!(store.fetch_item(&id).unwrap().is_some());
}

#[tokio::test]
async fn submit_route_lists_invalid_fields() {
    let (router, _) = router_for(harness());

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/items",
            None,
            json!({ "name": "", "owner": { "name": "Pat", "email": "nope" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .expect("fields array")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"category"));
    assert!(fields.contains(&"owner.email"));
}

#[tokio::test]
async fn approve_handler_requires_staff_identity() {
    let harness = harness();
    let item = harness.service.submit(draft("Zaxxon")).expect("accepted");
    let service = Arc::new(harness.service);

    let response = approve_handler::<InMemoryRecordStore, RecordingNotifier, InMemoryImageStore>(
        State(service.clone()),
        Path(item.id.0.clone()),
        HeaderMap::new(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut headers = HeaderMap::new();
    headers.insert(IDENTITY_HEADER, STAFF.parse().unwrap());
    let response = approve_handler::<InMemoryRecordStore, RecordingNotifier, InMemoryImageStore>(
        State(service),
        Path(item.id.0.clone()),
        headers,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn approving_twice_is_a_conflict() {
    let harness = harness();
    let item = approved_item(&harness, "Berzerk");
    let (router, _) = router_for(harness);

    let response = router
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/items/{}/approve", item.id.0),
            Some(STAFF),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_items_are_not_found() {
    let (router, _) = router_for(harness());

    let response = router
        .oneshot(empty_request("GET", "/api/v1/items/item-nope", Some(STAFF)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stale_sale_update_is_a_conflict() {
    let harness = harness();
    let item = approved_item(&harness, "Bosconian");
    let (router, _) = router_for(harness);

    let response = router
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/items/{}/sale", item.id.0),
            Some(STAFF),
            json!({ "asking_price": "450", "expected_version": item.version - 1 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn anonymous_view_hides_contact_and_admin_blocks() {
    let harness = harness();
    let item = approved_item(&harness, "Dragon's Lair");
    let (router, _) = router_for(harness);

    let response = router
        .oneshot(empty_request("GET", &format!("/api/v1/items/{}", item.id.0), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["name"], "Dragon's Lair");
    assert!(body.get("contact").is_none());
    assert!(body.get("admin").is_none());
    assert!(body.get("owner").is_none());
    assert!(!body.to_string().contains("pat@x.com"));
}

#[tokio::test]
async fn inquiry_route_accepts_buyer_offers() {
    let harness = harness();
    let item = approved_item(&harness, "Spy Hunter");
    let (router, _) = router_for(harness);

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/items/{}/inquiries", item.id.0),
            None,
            json!({
                "buyer": { "name": "Lee", "email": "lee@y.com" },
                "intent": "offer",
                "amount": "350"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn marketplace_defaults_to_for_sale_listing() {
    let harness = harness();
    approved_item(&harness, "Not Listed");
    let (router, _) = router_for(harness);

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/v1/marketplace", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    let response = router
        .oneshot(empty_request("GET", "/api/v1/marketplace?mode=browse_all", None))
        .await
        .unwrap();
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn store_outage_maps_to_service_unavailable() {
    let harness = harness_with(UnavailableStore, RecordingNotifier::default());
    let router = crate::workflows::collection::collection_router(Arc::new(harness.service));

    let response = router
        .oneshot(json_request("POST", "/api/v1/items", None, galaga_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn sale_and_ticket_routes_round_out_staff_work() {
    let harness = harness();
    let item = approved_item(&harness, "Tempest");
    let (router, store) = router_for(harness);

    let response = router
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/items/{}/sale", item.id.0),
            Some(STAFF),
            json!({ "asking_price": "450", "for_sale": false, "expected_version": item.version }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["sale"]["for_sale"], true);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/items/{}/tickets", item.id.0),
            Some(STAFF),
            json!({ "description": "Spinner loose" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let ticket = read_json_body(response).await;
    let ticket_id = ticket["id"].as_str().expect("ticket id").to_string();

    let response = router
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/v1/tickets/{ticket_id}"),
            Some(STAFF),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.tickets_for_item(&item.id).unwrap().is_empty());
}

#[tokio::test]
async fn inquiries_on_hidden_items_are_not_found() {
    let harness = harness();
    let pending = harness.service.submit(draft("Qix")).expect("accepted");
    let (router, store) = router_for(harness);

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/items/{}/inquiries", pending.id.0),
            None,
            json!({
                "buyer": { "name": "Lee", "email": "lee@y.com" },
                "intent": "offer",
                "amount": "100"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(store.inquiries_for_item(&pending.id).unwrap().is_empty());
}
