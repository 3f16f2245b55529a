use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::access::Actor;
use super::domain::{
    CheckInRequest, InquiryId, InquiryRequest, InquiryStatus, ItemDraft, ItemId, ItemPatch,
    SaleConfig, TicketId,
};
use super::negotiation::ListingMode;
use super::repository::{ImageStore, ImageStoreError, Notifier, RecordStore};
use super::service::{CollectionService, RegistryError};

/// Header carrying the caller identity resolved by the upstream session layer.
pub const IDENTITY_HEADER: &str = "x-registry-identity";

type Shared<S, N, I> = Arc<CollectionService<S, N, I>>;

/// Router builder exposing the public intake, marketplace, and staff endpoints.
pub fn collection_router<S, N, I>(service: Shared<S, N, I>) -> Router
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    Router::new()
        .route("/api/v1/items", post(submit_handler::<S, N, I>))
        .route(
            "/api/v1/items/:item_id",
            get(view_handler::<S, N, I>)
                .patch(edit_handler::<S, N, I>)
                .delete(delete_handler::<S, N, I>),
        )
        .route("/api/v1/items/:item_id/approve", post(approve_handler::<S, N, I>))
        .route("/api/v1/items/:item_id/reject", post(reject_handler::<S, N, I>))
        .route("/api/v1/items/:item_id/check-in", post(check_in_handler::<S, N, I>))
        .route(
            "/api/v1/items/:item_id/sale",
            put(sale_handler::<S, N, I>),
        )
        .route(
            "/api/v1/items/:item_id/images",
            post(attach_image_handler::<S, N, I>).delete(remove_image_handler::<S, N, I>),
        )
        .route(
            "/api/v1/items/:item_id/inquiries",
            get(list_inquiries_handler::<S, N, I>).post(create_inquiry_handler::<S, N, I>),
        )
        .route(
            "/api/v1/items/:item_id/tickets",
            get(list_tickets_handler::<S, N, I>).post(open_ticket_handler::<S, N, I>),
        )
        .route(
            "/api/v1/inquiries/:inquiry_id/status",
            post(advance_inquiry_handler::<S, N, I>),
        )
        .route(
            "/api/v1/tickets/:ticket_id",
            delete(delete_ticket_handler::<S, N, I>),
        )
        .route(
            "/api/v1/tickets/:ticket_id/resolve",
            post(resolve_ticket_handler::<S, N, I>),
        )
        .route(
            "/api/v1/tickets/:ticket_id/reopen",
            post(reopen_ticket_handler::<S, N, I>),
        )
        .route("/api/v1/slugs/:slug", get(slug_handler::<S, N, I>))
        .route("/api/v1/marketplace", get(marketplace_handler::<S, N, I>))
        .route("/api/v1/staff/items", post(add_item_handler::<S, N, I>))
        .route("/api/v1/staff/check-in-queue", get(queue_handler::<S, N, I>))
        .route("/api/v1/staff/search", get(search_handler::<S, N, I>))
        .with_state(service)
}

fn actor_from(headers: &HeaderMap) -> Actor {
    headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(Actor::identified)
        .unwrap_or_default()
}

fn error_status(error: &RegistryError) -> StatusCode {
    match error {
        RegistryError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RegistryError::InvalidTransition(_) | RegistryError::Conflict { .. } => StatusCode::CONFLICT,
        RegistryError::Authorization { .. } => StatusCode::FORBIDDEN,
        RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
        RegistryError::StoreFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        RegistryError::ImageStore(ImageStoreError::UnsupportedContentType(_)) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        RegistryError::ImageStore(ImageStoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        RegistryError::ImageStore(ImageStoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub(crate) fn error_response(error: RegistryError) -> Response {
    let status = error_status(&error);
    let payload = match &error {
        RegistryError::Validation(validation) => json!({
            "error": error.to_string(),
            "fields": validation.fields(),
        }),
        _ => json!({
            "error": error.to_string(),
        }),
    };
    (status, axum::Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, RegistryError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectBody {
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaleBody {
    #[serde(flatten)]
    config: SaleConfig,
    #[serde(default)]
    expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdvanceBody {
    status: InquiryStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketBody {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageQuery {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MarketplaceQuery {
    #[serde(default)]
    mode: ListingMode,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    q: String,
}

pub(crate) async fn submit_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    axum::Json(draft): axum::Json<ItemDraft>,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    match service.submit(draft) {
        Ok(item) => {
            let payload = json!({
                "id": item.id,
                "slug": item.slug,
                "status": item.status_label(),
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_item_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<ItemDraft>,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(StatusCode::CREATED, service.add_item(&actor_from(&headers), draft))
}

pub(crate) async fn view_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.view_item(&actor_from(&headers), &ItemId(item_id)),
    )
}

pub(crate) async fn edit_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    axum::Json(patch): axum::Json<ItemPatch>,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.edit(&actor_from(&headers), &ItemId(item_id), patch),
    )
}

pub(crate) async fn delete_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.delete_item(&actor_from(&headers), &ItemId(item_id)),
    )
}

pub(crate) async fn approve_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.approve(&actor_from(&headers), &ItemId(item_id)),
    )
}

pub(crate) async fn reject_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<RejectBody>,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.reject(&actor_from(&headers), &ItemId(item_id), &body.reason),
    )
}

pub(crate) async fn check_in_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<CheckInRequest>,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.check_in(&actor_from(&headers), &ItemId(item_id), request),
    )
}

pub(crate) async fn sale_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<SaleBody>,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.set_sale_config(
            &actor_from(&headers),
            &ItemId(item_id),
            body.config,
            body.expected_version,
        ),
    )
}

pub(crate) async fn attach_image_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    respond(
        StatusCode::CREATED,
        service.attach_image(&actor_from(&headers), &ItemId(item_id), &body, &content_type),
    )
}

pub(crate) async fn remove_image_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    Query(query): Query<ImageQuery>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.remove_image(&actor_from(&headers), &ItemId(item_id), &query.url),
    )
}

pub(crate) async fn create_inquiry_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    axum::Json(request): axum::Json<InquiryRequest>,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    match service.create_inquiry(&ItemId(item_id), request) {
        Ok(inquiry) => {
            let payload = json!({
                "id": inquiry.id,
                "status": inquiry.status,
                "amount": inquiry.amount,
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_inquiries_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.inquiries_for(&actor_from(&headers), &ItemId(item_id)),
    )
}

pub(crate) async fn advance_inquiry_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(inquiry_id): Path<String>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<AdvanceBody>,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.advance_inquiry(&actor_from(&headers), &InquiryId(inquiry_id), body.status),
    )
}

pub(crate) async fn open_ticket_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<TicketBody>,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::CREATED,
        service.open_ticket(&actor_from(&headers), &ItemId(item_id), &body.description),
    )
}

pub(crate) async fn list_tickets_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.tickets_for(&actor_from(&headers), &ItemId(item_id)),
    )
}

pub(crate) async fn resolve_ticket_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(ticket_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.resolve_ticket(&actor_from(&headers), &TicketId(ticket_id)),
    )
}

pub(crate) async fn reopen_ticket_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(ticket_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.reopen_ticket(&actor_from(&headers), &TicketId(ticket_id)),
    )
}

pub(crate) async fn delete_ticket_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(ticket_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    match service.delete_ticket(&actor_from(&headers), &TicketId(ticket_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn slug_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.find_by_slug(&actor_from(&headers), &slug),
    )
}

pub(crate) async fn marketplace_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Query(query): Query<MarketplaceQuery>,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(StatusCode::OK, service.marketplace(query.mode))
}

pub(crate) async fn queue_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(StatusCode::OK, service.check_in_queue(&actor_from(&headers)))
}

pub(crate) async fn search_handler<S, N, I>(
    State(service): State<Shared<S, N, I>>,
    Query(query): Query<SearchQuery>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    respond(
        StatusCode::OK,
        service.search(&actor_from(&headers), &query.q),
    )
}
