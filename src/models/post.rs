use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::user::PublicUser;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub body: String,
    pub media: String,
    pub file_type: String,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            body: r.get("body"),
            media: r.get("media"),
            file_type: r.get("file_type"),
            likes: r.get("likes"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct PostWithUser {
    #[serde(flatten)]
    pub post: Post,
    pub user: PublicUser,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            post_id: r.get("post_id"),
            user_id: r.get("user_id"),
            body: r.get("body"),
            created_at: r.get("created_at"),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CommentWithUser {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: PublicUser,
}
