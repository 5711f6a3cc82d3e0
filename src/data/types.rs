//! Row shapes for the tables the client reads and writes. Only the columns
//! the client consumes are modelled; extra columns are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Numeric or uuid depending on the project; kept as raw JSON.
    pub id: Value,
    pub user_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    pub created_at: String,
}

impl Post {
    /// `id` as filter text, e.g. for `delete_post`.
    #[must_use]
    pub fn id_text(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Insert payload for `posts`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewPost {
    pub user_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: String,
    pub following_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Value,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: String,
}

/// The two `profiles` columns the canonical redirect needs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
}
