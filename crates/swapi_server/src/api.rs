//! HTTP routes mapping verbs to person repository calls.
//!
//! # Invariants
//! - Every response body is an `Envelope` and the HTTP status equals its code.
//! - Request bodies are decoded here, so malformed JSON yields the bad request
//!   envelope rather than a framework rejection.
//! - The shared connection is held for the whole repository call.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, error, warn};
use serde::Serialize;
use std::sync::Arc;
use swapi_core::{
    Envelope, PersonDraft, PersonId, PersonRepository, SqlPersonRepository, SqliteDatabase,
};
use tokio::sync::Mutex;

const COLLECTION_METHODS: &str = "GET, POST, OPTIONS";
const ITEM_METHODS: &str = "GET, PUT, DELETE, OPTIONS";

/// Server state: one connection shared by every request.
pub struct AppState {
    db: Mutex<SqliteDatabase>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn shared(db: SqliteDatabase) -> SharedState {
        Arc::new(Self { db: Mutex::new(db) })
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/people",
            get(list_people)
                .post(create_person)
                .fallback(collection_method_not_allowed),
        )
        .route(
            "/people/{id}",
            get(get_person)
                .put(update_person)
                .delete(delete_person)
                .fallback(item_method_not_allowed),
        )
        .with_state(state)
}

async fn list_people(State(state): State<SharedState>) -> Response {
    debug!("event=http_request module=api method=GET path=/people");
    let db = state.db.lock().await;
    let result = SqlPersonRepository::new(&*db).fetch_all();
    respond(log_failure("list_people", Envelope::from_result(result)))
}

async fn create_person(State(state): State<SharedState>, body: Bytes) -> Response {
    debug!("event=http_request module=api method=POST path=/people");
    let Some(draft) = decode_draft(&body) else {
        return respond(Envelope::<()>::bad_request());
    };

    let db = state.db.lock().await;
    let result = SqlPersonRepository::new(&*db).create(&draft).map(|_| ());
    respond(log_failure("create_person", Envelope::from_unit(result)))
}

async fn get_person(State(state): State<SharedState>, Path(raw_id): Path<String>) -> Response {
    debug!("event=http_request module=api method=GET path=/people/{raw_id}");
    let Some(id) = parse_id(&raw_id) else {
        return respond(Envelope::<()>::bad_request());
    };

    let db = state.db.lock().await;
    let result = SqlPersonRepository::new(&*db).fetch_by_id(id);
    respond(log_failure("get_person", Envelope::from_result(result)))
}

async fn update_person(
    State(state): State<SharedState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Response {
    debug!("event=http_request module=api method=PUT path=/people/{raw_id}");
    let (Some(id), Some(draft)) = (parse_id(&raw_id), decode_draft(&body)) else {
        return respond(Envelope::<()>::bad_request());
    };

    let db = state.db.lock().await;
    let result = SqlPersonRepository::new(&*db).update(id, &draft);
    respond(log_failure("update_person", Envelope::from_unit(result)))
}

async fn delete_person(State(state): State<SharedState>, Path(raw_id): Path<String>) -> Response {
    debug!("event=http_request module=api method=DELETE path=/people/{raw_id}");
    let Some(id) = parse_id(&raw_id) else {
        return respond(Envelope::<()>::bad_request());
    };

    let db = state.db.lock().await;
    let result = SqlPersonRepository::new(&*db).delete(id);
    respond(log_failure("delete_person", Envelope::from_unit(result)))
}

async fn collection_method_not_allowed() -> Response {
    method_not_allowed(COLLECTION_METHODS)
}

async fn item_method_not_allowed() -> Response {
    method_not_allowed(ITEM_METHODS)
}

fn method_not_allowed(allowed: &'static str) -> Response {
    let envelope = Envelope::<()>::method_not_allowed(allowed);
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, allowed)],
        Json(envelope),
    )
        .into_response()
}

fn decode_draft(body: &[u8]) -> Option<PersonDraft> {
    match serde_json::from_slice::<PersonDraft>(body) {
        Ok(draft) => Some(draft),
        Err(err) => {
            warn!("event=decode_body module=api status=error error={err}");
            None
        }
    }
}

fn parse_id(raw: &str) -> Option<PersonId> {
    raw.parse::<PersonId>().ok()
}

fn log_failure<T>(operation: &str, envelope: Envelope<T>) -> Envelope<T> {
    match envelope.code {
        500 => error!("event={operation} module=api status=error code=500"),
        code if !envelope.is_success() => {
            debug!("event={operation} module=api status=fail code={code}")
        }
        _ => {}
    }
    envelope
}

fn respond<T: Serialize>(envelope: Envelope<T>) -> Response {
    let status = StatusCode::from_u16(envelope.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope)).into_response()
}
