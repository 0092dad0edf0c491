use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use ulid::Ulid;

use crate::clock::Clock;
use crate::comments::CommentService;
use crate::directory::{
    InMemoryItemCatalog, InMemoryUserDirectory, ItemCatalog, ItemPatch, UserDirectory,
};
use crate::engine::{Engine, EngineError, InMemoryBookingStore};
use crate::model::*;
use crate::observability;
use crate::requests::RequestService;

/// Caller identity header, shared with compatible clients.
pub const SHARER_HEADER: &str = "x-sharer-user-id";

const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub comments: Arc<CommentService>,
    pub requests: Arc<RequestService>,
    pub users: Arc<InMemoryUserDirectory>,
    pub items: Arc<InMemoryItemCatalog>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the engine and its collaborators over in-memory stores.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        let users = Arc::new(InMemoryUserDirectory::new());
        let items = Arc::new(InMemoryItemCatalog::new());
        let store = Arc::new(InMemoryBookingStore::new());
        let engine = Arc::new(Engine::new(
            store,
            users.clone(),
            items.clone(),
            clock.clone(),
        ));
        let comments = Arc::new(CommentService::new(
            engine.clone(),
            users.clone(),
            items.clone(),
            clock.clone(),
        ));
        let requests = Arc::new(RequestService::new(users.clone(), clock.clone()));
        Self {
            engine,
            comments,
            requests,
            users,
            items,
            clock,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/owner", get(list_owner_bookings))
        .route("/bookings/{id}", patch(decide_booking).get(get_booking))
        .route("/users", post(create_user))
        .route("/items", post(create_item).get(list_items))
        .route("/items/{id}", patch(update_item).get(get_item))
        .route("/items/{id}/comment", post(create_comment))
        .route("/requests", post(create_request).get(list_requests))
        .route("/requests/all", get(list_other_requests))
        .route("/requests/{id}", get(get_request))
        .layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

// ── Error surface ────────────────────────────────────────

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        // Authorization failures are reported as not-found so callers are
        // never told that a booking or item they may not touch exists.
        let status = match e {
            EngineError::UserNotFound(_)
            | EngineError::ItemNotFound(_)
            | EngineError::BookingNotFound(_)
            | EngineError::RequestNotFound(_)
            | EngineError::NotOwner { .. }
            | EngineError::NotAuthorized { .. } => StatusCode::NOT_FOUND,
            EngineError::AlreadyDecided(_)
            | EngineError::Validation(_)
            | EngineError::UnknownState(_) => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn sharer_id(headers: &HeaderMap) -> Result<Ulid, ApiError> {
    let raw = headers
        .get(SHARER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("missing X-Sharer-User-Id header"))?;
    Ulid::from_string(raw).map_err(|_| ApiError::bad_request("malformed X-Sharer-User-Id header"))
}

// ── DTOs ─────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingRequest {
    start: Ms,
    end: Ms,
    item_id: Ulid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    id: Ulid,
    start: Ms,
    end: Ms,
    status: BookingStatus,
    booker: BookerRef,
    item: BookedItemRef,
}

#[derive(Serialize)]
struct BookerRef {
    id: Ulid,
}

#[derive(Serialize)]
struct BookedItemRef {
    id: Ulid,
    name: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            start: b.start,
            end: b.end,
            status: b.status,
            booker: BookerRef { id: b.booker_id },
            item: BookedItemRef {
                id: b.item.id,
                name: b.item.name,
            },
        }
    }
}

#[derive(Deserialize)]
struct ApprovedQuery {
    approved: bool,
}

#[derive(Deserialize)]
struct ListQuery {
    state: Option<String>,
    from: Option<i64>,
    size: Option<i64>,
}

impl ListQuery {
    /// Defaults `state=ALL`, `from=0`, `size=10`; `from >= 0` and `size > 0`
    /// are enforced here, before anything reaches the core.
    fn validated(self) -> Result<(String, usize, usize), ApiError> {
        let state = self.state.unwrap_or_else(|| "ALL".into());
        let from = self.from.unwrap_or(0);
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE as i64);
        if from < 0 {
            return Err(ApiError::bad_request("from must not be negative"));
        }
        if size <= 0 {
            return Err(ApiError::bad_request("size must be positive"));
        }
        Ok((state, from as usize, size as usize))
    }
}

#[derive(Deserialize)]
struct PageQuery {
    from: Option<i64>,
    size: Option<i64>,
}

impl PageQuery {
    fn validated(self) -> Result<(usize, usize), ApiError> {
        let from = self.from.unwrap_or(0);
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE as i64);
        if from < 0 {
            return Err(ApiError::bad_request("from must not be negative"));
        }
        if size <= 0 {
            return Err(ApiError::bad_request("size must be positive"));
        }
        Ok((from as usize, size as usize))
    }
}

#[derive(Deserialize)]
struct CreateUserRequest {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateItemRequest {
    name: Option<String>,
    description: Option<String>,
    available: Option<bool>,
    request_id: Option<Ulid>,
}

#[derive(Deserialize)]
struct UpdateItemRequest {
    name: Option<String>,
    description: Option<String>,
    available: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    id: Ulid,
    name: String,
    description: String,
    available: bool,
    request_id: Option<Ulid>,
    last_booking: Option<ItemBookingRef>,
    next_booking: Option<ItemBookingRef>,
    comments: Vec<CommentResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBookingRef {
    id: Ulid,
    booker_id: Ulid,
}

impl From<Booking> for ItemBookingRef {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            booker_id: b.booker_id,
        }
    }
}

#[derive(Deserialize)]
struct CreateCommentRequest {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    id: Ulid,
    text: String,
    author_name: String,
    created: Ms,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            text: c.text,
            author_name: c.author_name,
            created: c.created,
        }
    }
}

#[derive(Deserialize)]
struct CreateRequestRequest {
    description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    id: Ulid,
    description: String,
    created: Ms,
    items: Vec<RequestItemRef>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestItemRef {
    id: Ulid,
    name: String,
    description: String,
    available: bool,
    owner_id: Ulid,
    request_id: Option<Ulid>,
}

impl From<ItemRecord> for RequestItemRef {
    fn from(i: ItemRecord) -> Self {
        Self {
            id: i.id,
            name: i.name,
            description: i.description,
            available: i.available,
            owner_id: i.owner_id,
            request_id: i.request_id,
        }
    }
}

// ── Booking handlers ─────────────────────────────────────

async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booker_id = sharer_id(&headers)?;

    // Future-or-present is input validation, owned by the adapter; the
    // engine itself only orders the interval.
    let now = state.clock.now_ms();
    if req.start < now {
        return Err(ApiError::bad_request("booking start must not be in the past"));
    }
    if req.end < now {
        return Err(ApiError::bad_request("booking end must not be in the past"));
    }

    let booking = state
        .engine
        .add_booking(req.start, req.end, req.item_id, booker_id)
        .await?;
    metrics::counter!(observability::BOOKINGS_CREATED_TOTAL).increment(1);
    Ok(Json(booking.into()))
}

async fn decide_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(booking_id): Path<Ulid>,
    Query(query): Query<ApprovedQuery>,
) -> Result<Json<BookingResponse>, ApiError> {
    let caller_id = sharer_id(&headers)?;
    let booking = state
        .engine
        .approve_booking(booking_id, query.approved, caller_id)
        .await?;
    let decision = if query.approved { "approved" } else { "rejected" };
    metrics::counter!(observability::BOOKING_DECISIONS_TOTAL, "decision" => decision).increment(1);
    Ok(Json(booking.into()))
}

async fn get_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(booking_id): Path<Ulid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let caller_id = sharer_id(&headers)?;
    let booking = state.engine.get_booking_by_id(booking_id, caller_id).await?;
    Ok(Json(booking.into()))
}

async fn list_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let user_id = sharer_id(&headers)?;
    let (search_state, from, size) = query.validated()?;
    let bookings = state
        .engine
        .bookings_for_booker(&search_state, user_id, from, size)
        .await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

async fn list_owner_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let user_id = sharer_id(&headers)?;
    let (search_state, from, size) = query.validated()?;
    let bookings = state
        .engine
        .bookings_for_owner(&search_state, user_id, from, size)
        .await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

// ── User and item handlers (thin pass-through) ───────────

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<UserRecord>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be blank"));
    }
    Ok(Json(state.users.register(req.name)))
}

async fn create_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateItemRequest>,
) -> Result<Json<ItemRecord>, ApiError> {
    let owner_id = sharer_id(&headers)?;
    if !state.users.exists(owner_id) {
        return Err(EngineError::UserNotFound(owner_id).into());
    }
    let name = match req.name {
        Some(n) if !n.trim().is_empty() => n,
        _ => return Err(ApiError::bad_request("name must not be blank")),
    };
    let description = match req.description {
        Some(d) if !d.trim().is_empty() => d,
        _ => return Err(ApiError::bad_request("description must not be blank")),
    };
    let available = req
        .available
        .ok_or_else(|| ApiError::bad_request("available must be set"))?;
    Ok(Json(state.items.register(
        owner_id,
        name,
        description,
        available,
        req.request_id,
    )))
}

async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<Ulid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemRecord>, ApiError> {
    let caller_id = sharer_id(&headers)?;
    if !state.users.exists(caller_id) {
        return Err(EngineError::UserNotFound(caller_id).into());
    }
    let patch = ItemPatch {
        name: req.name,
        description: req.description,
        available: req.available,
    };
    Ok(Json(state.items.update(item_id, caller_id, patch)?))
}

async fn get_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<Ulid>,
) -> Result<Json<ItemResponse>, ApiError> {
    let caller_id = sharer_id(&headers)?;
    if !state.users.exists(caller_id) {
        return Err(EngineError::UserNotFound(caller_id).into());
    }
    let item = state
        .items
        .get(item_id)
        .ok_or(EngineError::ItemNotFound(item_id))?;
    Ok(Json(item_view(&state, item, caller_id).await))
}

async fn list_items(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let caller_id = sharer_id(&headers)?;
    if !state.users.exists(caller_id) {
        return Err(EngineError::UserNotFound(caller_id).into());
    }
    let (from, size) = query.validated()?;
    let offset = (from / size) * size;

    let mut out = Vec::new();
    for item in state.items.owned_by(caller_id, offset, size) {
        out.push(item_view(&state, item, caller_id).await);
    }
    Ok(Json(out))
}

/// Item display: last/next booking are owner-scoped queries, so a non-owner
/// caller simply gets `None` for both.
async fn item_view(state: &AppState, item: ItemRecord, caller_id: Ulid) -> ItemResponse {
    let last = state.engine.last_booking_for_item(item.id, caller_id).await;
    let next = state.engine.next_booking_for_item(item.id, caller_id).await;
    let comments = state
        .comments
        .comments_for_item(item.id)
        .into_iter()
        .map(Into::into)
        .collect();
    ItemResponse {
        id: item.id,
        name: item.name,
        description: item.description,
        available: item.available,
        request_id: item.request_id,
        last_booking: last.map(Into::into),
        next_booking: next.map(Into::into),
        comments,
    }
}

async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<Ulid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let author_id = sharer_id(&headers)?;
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request("text must not be blank"));
    }
    let comment = state.comments.add_comment(req.text, item_id, author_id).await?;
    metrics::counter!(observability::COMMENTS_TOTAL).increment(1);
    Ok(Json(comment.into()))
}

// ── Item request handlers ────────────────────────────────

async fn create_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRequestRequest>,
) -> Result<Json<RequestResponse>, ApiError> {
    let requester_id = sharer_id(&headers)?;
    let description = match req.description {
        Some(d) if !d.trim().is_empty() => d,
        _ => return Err(ApiError::bad_request("description must not be blank")),
    };
    let request = state.requests.add_request(description, requester_id)?;
    metrics::counter!(observability::ITEM_REQUESTS_TOTAL).increment(1);
    Ok(Json(request_view(&state, request)))
}

async fn list_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RequestResponse>>, ApiError> {
    let user_id = sharer_id(&headers)?;
    let requests = state.requests.requests_for_user(user_id)?;
    Ok(Json(
        requests
            .into_iter()
            .map(|r| request_view(&state, r))
            .collect(),
    ))
}

async fn list_other_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<RequestResponse>>, ApiError> {
    let user_id = sharer_id(&headers)?;
    let (from, size) = query.validated()?;
    let requests = state.requests.requests_from_others(user_id, from, size)?;
    Ok(Json(
        requests
            .into_iter()
            .map(|r| request_view(&state, r))
            .collect(),
    ))
}

async fn get_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(request_id): Path<Ulid>,
) -> Result<Json<RequestResponse>, ApiError> {
    let caller_id = sharer_id(&headers)?;
    let request = state.requests.request_by_id(request_id, caller_id)?;
    Ok(Json(request_view(&state, request)))
}

/// Request display carries the items listed in answer to it.
fn request_view(state: &AppState, request: ItemRequest) -> RequestResponse {
    let items = state
        .items
        .answering(request.id)
        .into_iter()
        .map(Into::into)
        .collect();
    RequestResponse {
        id: request.id,
        description: request.description,
        created: request.created,
        items,
    }
}

// ── Metrics middleware ───────────────────────────────────

async fn track_metrics(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".into());
    let method = req.method().to_string();

    let started = Instant::now();
    let response = next.run(req).await;

    metrics::counter!(
        observability::REQUESTS_TOTAL,
        "route" => route.clone(),
        "method" => method,
        "status" => response.status().as_u16().to_string(),
    )
    .increment(1);
    metrics::histogram!(observability::REQUEST_DURATION_SECONDS, "route" => route)
        .record(started.elapsed().as_secs_f64());

    response
}
