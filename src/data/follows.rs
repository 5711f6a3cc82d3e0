//! The `follows` edge table.

use serde_json::json;

use crate::backend::{Filter, SelectQuery, TableClient};
use crate::error::BackendError;

use super::{DataResult, FOLLOWS, Follow, boundary, decode_rows};

/// # Errors
///
/// Returns [`DataError`](super::DataError) if the insert fails.
pub async fn follow_user<C: TableClient + ?Sized>(client: &C, follower_id: &str, following_id: &str) -> DataResult<()> {
    let row = json!({ "follower_id": follower_id, "following_id": following_id });
    let result = client.insert(FOLLOWS, row).await.map(|_| ());
    boundary("follow_user", result)
}

/// # Errors
///
/// Returns [`DataError`](super::DataError) if the delete fails.
pub async fn unfollow_user<C: TableClient + ?Sized>(
    client: &C,
    follower_id: &str,
    following_id: &str,
) -> DataResult<()> {
    let filters = [Filter::eq("follower_id", follower_id), Filter::eq("following_id", following_id)];
    let result = client.delete(FOLLOWS, &filters).await;
    boundary("unfollow_user", result)
}

/// Ids of every user `follower_id` follows.
///
/// # Errors
///
/// Returns [`DataError`](super::DataError) if the read fails or rows do not decode.
pub async fn fetch_following_ids<C: TableClient + ?Sized>(client: &C, follower_id: &str) -> DataResult<Vec<String>> {
    let query = SelectQuery::from(FOLLOWS).filter(Filter::eq("follower_id", follower_id));
    let result: Result<Vec<String>, BackendError> = async {
        let follows = decode_rows::<Follow>(client.select(&query).await?)?;
        Ok(follows.into_iter().map(|f| f.following_id).collect())
    }
    .await;
    boundary("fetch_following_ids", result)
}
