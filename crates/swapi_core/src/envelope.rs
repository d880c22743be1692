//! Uniform `{code, status, message, data}` response shape.
//!
//! # Invariants
//! - Building an envelope performs no I/O.
//! - Bad request text never says whether decoding or the write failed.

use crate::model::person::PersonId;
use crate::repo::RepoError;
use serde::Serialize;

pub const STATUS_OK: &str = "OK";
pub const STATUS_FAIL: &str = "Fail";

const BAD_REQUEST_MESSAGE: &str = "Bad request";
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Response envelope wrapping every operation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Success without payload.
    pub fn ok() -> Self {
        Self::new(200, STATUS_OK, String::new(), None)
    }

    /// Success carrying the fetched entity or collection.
    pub fn with_data(data: T) -> Self {
        Self::new(200, STATUS_OK, String::new(), Some(data))
    }

    pub fn not_found(id: PersonId) -> Self {
        Self::fail(404, format!("People #{id} not found"))
    }

    pub fn bad_request() -> Self {
        Self::fail(400, BAD_REQUEST_MESSAGE.to_string())
    }

    /// `allowed` is the comma-separated verb list also sent as `Allow`.
    pub fn method_not_allowed(allowed: &str) -> Self {
        Self::fail(405, format!("Supported methods: {allowed}"))
    }

    /// Infrastructure failure: broken query, cursor or row decode.
    pub fn internal_error() -> Self {
        Self::fail(500, INTERNAL_ERROR_MESSAGE.to_string())
    }

    /// Maps a repository failure to its canonical envelope.
    pub fn from_error(err: &RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => Self::not_found(*id),
            RepoError::Rejected(_) => Self::bad_request(),
            RepoError::IdentifiersExhausted(_) | RepoError::Db(_) => Self::internal_error(),
        }
    }

    /// Maps a repository outcome, wrapping the value as `data`.
    pub fn from_result(result: Result<T, RepoError>) -> Self {
        match result {
            Ok(data) => Self::with_data(data),
            Err(err) => Self::from_error(&err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    fn fail(code: u16, message: String) -> Self {
        Self::new(code, STATUS_FAIL, message, None)
    }

    fn new(code: u16, status: &'static str, message: String, data: Option<T>) -> Self {
        Self {
            code,
            status,
            message,
            data,
        }
    }
}

impl Envelope<()> {
    /// Maps a void repository outcome; success carries no `data`.
    pub fn from_unit(result: Result<(), RepoError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(err) => Self::from_error(&err),
        }
    }
}
