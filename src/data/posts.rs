//! Reads and writes on `posts`. Listings are newest first.

use crate::backend::{Filter, Order, Page, SelectQuery, TableClient};
use crate::error::BackendError;

use super::{DataResult, NewPost, POSTS, Post, boundary, decode_rows};

fn newest_first(page: Page) -> SelectQuery {
    SelectQuery::from(POSTS).order(Order::desc("created_at")).page(page)
}

/// One page of every post.
///
/// # Errors
///
/// Returns [`DataError`](super::DataError) if the read fails or rows do not decode.
pub async fn fetch_posts<C: TableClient + ?Sized>(client: &C, page: Page) -> DataResult<Vec<Post>> {
    let result = async { decode_rows(client.select(&newest_first(page)).await?) }.await;
    boundary("fetch_posts", result)
}

/// One page of posts written by any of `user_ids`. An empty id list yields an
/// empty page without a remote call.
///
/// # Errors
///
/// Returns [`DataError`](super::DataError) if the read fails or rows do not decode.
pub async fn fetch_posts_by_user_ids<C: TableClient + ?Sized>(
    client: &C,
    user_ids: &[String],
    page: Page,
) -> DataResult<Vec<Post>> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = newest_first(page).filter(Filter::is_in("user_id", user_ids));
    let result = async { decode_rows(client.select(&query).await?) }.await;
    boundary("fetch_posts_by_user_ids", result)
}

/// One page of a single author's posts.
///
/// # Errors
///
/// Returns [`DataError`](super::DataError) if the read fails or rows do not decode.
pub async fn fetch_user_posts<C: TableClient + ?Sized>(client: &C, user_id: &str, page: Page) -> DataResult<Vec<Post>> {
    let query = newest_first(page).filter(Filter::eq("user_id", user_id));
    let result = async { decode_rows(client.select(&query).await?) }.await;
    boundary("fetch_user_posts", result)
}

/// Insert a post and return the stored row.
///
/// # Errors
///
/// Returns [`DataError`](super::DataError) if the insert fails or returns no row.
pub async fn create_post<C: TableClient + ?Sized>(client: &C, post: &NewPost) -> DataResult<Post> {
    let result: Result<Post, BackendError> = async {
        let row = serde_json::to_value(post)?;
        let mut stored = decode_rows::<Post>(client.insert(POSTS, row).await?)?;
        if stored.is_empty() {
            return Err(BackendError::Decode("insert returned no row".to_owned()));
        }
        Ok(stored.swap_remove(0))
    }
    .await;
    if let Ok(post) = &result {
        tracing::info!(post_id = %post.id_text(), user_id = %post.user_id, "post created");
    }
    boundary("create_post", result)
}

/// # Errors
///
/// Returns [`DataError`](super::DataError) wrapping the backend failure.
pub async fn delete_post<C: TableClient + ?Sized>(client: &C, post_id: &str) -> DataResult<()> {
    let result = client.delete(POSTS, &[Filter::eq("id", post_id)]).await;
    boundary("delete_post", result)
}
