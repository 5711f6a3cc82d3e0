//! Data-access functions over the remote tables.
//!
//! DESIGN
//! ======
//! Every function issues one logical remote operation through a
//! [`TableClient`](crate::backend::TableClient) and returns a [`DataResult`].
//! Failures are logged here, at the boundary, and returned as [`DataError`]
//! carrying the operation name and the underlying [`BackendError`]. Callers
//! branch on the result; nothing panics.

pub mod types;

#[cfg(feature = "native")]
pub mod follows;
#[cfg(feature = "native")]
pub mod messages;
#[cfg(feature = "native")]
pub mod posts;
#[cfg(feature = "native")]
pub mod profiles;


use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::{Filter, Page, SelectQuery};
use crate::error::{BackendError, ErrorCode};

pub use types::{Follow, Message, NewPost, Post, ProfileSummary};

pub const POSTS: &str = "posts";
pub const PROFILES: &str = "profiles";
pub const MESSAGES: &str = "messages";
pub const FOLLOWS: &str = "follows";

/// Failure of one data-access operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed: {error}")]
pub struct DataError {
    pub operation: &'static str,
    #[source]
    pub error: BackendError,
}

impl ErrorCode for DataError {
    fn error_code(&self) -> &'static str {
        self.error.error_code()
    }

    fn retryable(&self) -> bool {
        self.error.retryable()
    }
}

pub type DataResult<T> = Result<T, DataError>;

/// Tag a backend result with its operation name, logging failures.
///
/// # Errors
///
/// Passes a failed `result` through as a [`DataError`].
pub fn boundary<T>(operation: &'static str, result: Result<T, BackendError>) -> DataResult<T> {
    result.map_err(|error| {
        tracing::error!(operation, code = error.error_code(), error = %error, "data access failed");
        DataError { operation, error }
    })
}

/// Decode raw rows, failing on the first row that does not fit `T`.
///
/// # Errors
///
/// Returns [`BackendError::Decode`] for the first mismatched row.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, BackendError> {
    rows.into_iter().map(|row| serde_json::from_value(row).map_err(BackendError::from)).collect()
}

/// The single-row `username,user_type` lookup for `user_id`. Shared by the
/// native data layer and the browser client.
#[must_use]
pub fn profile_summary_query(user_id: &str) -> SelectQuery {
    SelectQuery::from(PROFILES).columns("username,user_type").filter(Filter::eq("id", user_id)).page(Page::first(1))
}
