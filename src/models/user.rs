use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

pub const DEFAULT_PROFILE_PICTURE: &str = "default.jpg";

/// Stored account. Never serialized: clients only ever see [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture: String,
    pub token: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            name: r.get("name"),
            username: r.get("username"),
            email: r.get("email"),
            password_hash: r.get("password_hash"),
            profile_picture: r.get("profile_picture"),
            token: r.get("token"),
            active: r.get::<i64, _>("active") != 0,
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub profile_picture: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            username: u.username,
            email: u.email,
            profile_picture: u.profile_picture,
            active: u.active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Usernames and emails are stored trimmed and lowercased.
pub fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_projection_hides_secrets() {
        let now = Utc::now();
        let user = User {
            id: "u1".into(),
            name: "Ada".into(),
            username: "ada".into(),
            email: "ada@example.org".into(),
            password_hash: "$argon2id$secret".into(),
            profile_picture: DEFAULT_PROFILE_PICTURE.into(),
            token: "abcdef".into(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("abcdef"));
        assert!(json.contains("\"profilePicture\":\"default.jpg\""));
    }

    #[test]
    fn keys_are_trimmed_and_lowercased() {
        assert_eq!(normalize_key("  Ada@Example.ORG "), "ada@example.org");
    }
}
