//! The `messages` inbox table.

use crate::backend::{Filter, Order, Page, SelectQuery, TableClient};

use super::{DataResult, MESSAGES, Message, boundary, decode_rows};

fn unread_filters(user_id: &str) -> [Filter; 2] {
    [Filter::eq("receiver_id", user_id), Filter::eq("is_read", false)]
}

/// Number of unread messages addressed to `user_id`.
///
/// # Errors
///
/// Returns [`DataError`](super::DataError) if the count fails.
pub async fn count_unread<C: TableClient + ?Sized>(client: &C, user_id: &str) -> DataResult<u64> {
    let result = client.count(MESSAGES, &unread_filters(user_id)).await;
    boundary("count_unread", result)
}

/// One page of messages addressed to `user_id`, newest first.
///
/// # Errors
///
/// Returns [`DataError`](super::DataError) if the read fails or rows do not decode.
pub async fn fetch_inbox<C: TableClient + ?Sized>(client: &C, user_id: &str, page: Page) -> DataResult<Vec<Message>> {
    let query = SelectQuery::from(MESSAGES)
        .filter(Filter::eq("receiver_id", user_id))
        .order(Order::desc("created_at"))
        .page(page);
    let result = async { decode_rows(client.select(&query).await?) }.await;
    boundary("fetch_inbox", result)
}
