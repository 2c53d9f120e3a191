use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::str::FromStr;

use super::user::PublicUser;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ConnectionStatus::Pending),
            "accepted" => Ok(ConnectionStatus::Accepted),
            "rejected" => Ok(ConnectionStatus::Rejected),
            other => Err(format!("unknown connection status {other:?}")),
        }
    }
}

/// Directed request from `user_id` to `connection_id`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub id: String,
    pub user_id: String,
    pub connection_id: String,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConnectionRequest {
    pub fn from_row(r: &SqliteRow) -> Self {
        let status: String = r.get("status");
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            connection_id: r.get("connection_id"),
            status: status.parse().unwrap_or_else(|e| {
                log::warn!("connection request with bad status: {e}");
                ConnectionStatus::Pending
            }),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

/// A request joined with the user on the other side of it.
#[derive(Serialize, Debug, Clone)]
pub struct ConnectionWithUser {
    #[serde(flatten)]
    pub request: ConnectionRequest,
    pub user: PublicUser,
}
