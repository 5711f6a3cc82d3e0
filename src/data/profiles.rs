use crate::backend::TableClient;
use crate::error::BackendError;

use super::{DataResult, ProfileSummary, boundary, decode_rows, profile_summary_query};

/// Username and user type for `user_id`, or `None` when no row exists.
///
/// # Errors
///
/// Returns [`DataError`](super::DataError) if the read fails or the row does not decode.
pub async fn fetch_profile_summary<C: TableClient + ?Sized>(
    client: &C,
    user_id: &str,
) -> DataResult<Option<ProfileSummary>> {
    let query = profile_summary_query(user_id);
    let result: Result<Option<ProfileSummary>, BackendError> = async {
        let rows = decode_rows::<ProfileSummary>(client.select(&query).await?)?;
        Ok(rows.into_iter().next())
    }
    .await;
    boundary("fetch_profile_summary", result)
}
