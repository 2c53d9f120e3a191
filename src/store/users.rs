use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db::Db,
    errors::{ApiError, is_unique_violation},
    models::user::{PublicUser, User, normalize_key},
};

const USER_COLUMNS: &str =
    "id, name, username, email, password_hash, profile_picture, token, active, created_at, updated_at";

pub async fn find_by_id(db: &Db, id: &str) -> Result<Option<User>, ApiError> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(&db.0)
        .await?;
    Ok(row.as_ref().map(User::from_row))
}

pub async fn find_by_email(db: &Db, email: &str) -> Result<Option<User>, ApiError> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(normalize_key(email))
        .fetch_optional(&db.0)
        .await?;
    Ok(row.as_ref().map(User::from_row))
}

pub async fn find_by_username(db: &Db, username: &str) -> Result<Option<User>, ApiError> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
        .bind(normalize_key(username))
        .fetch_optional(&db.0)
        .await?;
    Ok(row.as_ref().map(User::from_row))
}

/// Callers must reject empty tokens first; the store matches them literally.
pub async fn find_by_token(db: &Db, token: &str) -> Result<Option<User>, ApiError> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE token = ?"))
        .bind(token)
        .fetch_optional(&db.0)
        .await?;
    Ok(row.as_ref().map(User::from_row))
}

/// Public projections for a set of ids, keyed by id.
pub async fn find_public_many(db: &Db, ids: &[String]) -> Result<HashMap<String, PublicUser>, ApiError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id IN ({placeholders})");
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(&db.0).await?;
    Ok(rows
        .iter()
        .map(|r| {
            let u = PublicUser::from(User::from_row(r));
            (u.id.clone(), u)
        })
        .collect())
}

/// Inserts a user on an open connection so callers can pair it with other
/// writes in one transaction. Duplicate username/email surface as `Conflict`.
pub async fn create(conn: &mut SqliteConnection, user: &User) -> Result<(), ApiError> {
    let res = sqlx::query(&format!(
        "INSERT INTO users({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.profile_picture)
    .bind(&user.token)
    .bind(user.active as i64)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(conn)
    .await;

    match res {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => {
            Err(ApiError::Conflict("username or email already exists".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
}

/// Overwrites only the fields that are set. Returns the updated user.
pub async fn update_fields(db: &Db, id: &str, upd: &UserUpdate) -> Result<User, ApiError> {
    let res = sqlx::query(
        "UPDATE users SET name = COALESCE(?, name), username = COALESCE(?, username), email = COALESCE(?, email),
         profile_picture = COALESCE(?, profile_picture), updated_at = ? WHERE id = ?",
    )
    .bind(upd.name.as_deref().map(str::trim))
    .bind(upd.username.as_deref().map(normalize_key))
    .bind(upd.email.as_deref().map(normalize_key))
    .bind(&upd.profile_picture)
    .bind(Utc::now())
    .bind(id)
    .execute(&db.0)
    .await;

    match res {
        Ok(r) if r.rows_affected() == 0 => return Err(ApiError::user_not_found()),
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict("username or email already taken".into()));
        }
        Err(e) => return Err(e.into()),
    }
    find_by_id(db, id).await?.ok_or_else(ApiError::user_not_found)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::user::DEFAULT_PROFILE_PICTURE;

    pub(crate) fn sample_user(username: &str) -> User {
        let now = Utc::now();
        User {
            id: uuid::Uuid::new_v4().to_string(),
            name: username.to_uppercase(),
            username: username.to_string(),
            email: format!("{username}@example.org"),
            password_hash: "hash".into(),
            profile_picture: DEFAULT_PROFILE_PICTURE.into(),
            token: String::new(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) async fn insert_user(db: &Db, username: &str) -> User {
        let user = sample_user(username);
        let mut conn = db.0.acquire().await.unwrap();
        create(&mut conn, &user).await.unwrap();
        user
    }

    #[actix_web::test]
    async fn lookups_normalize_keys() {
        let db = Db::in_memory().await.unwrap();
        let user = insert_user(&db, "ada").await;

        let by_email = find_by_email(&db, " ADA@example.org").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        let by_name = find_by_username(&db, "Ada").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(find_by_id(&db, "nope").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn duplicate_username_is_conflict() {
        let db = Db::in_memory().await.unwrap();
        insert_user(&db, "ada").await;
        let mut dup = sample_user("ada");
        dup.email = "other@example.org".into();
        let mut conn = db.0.acquire().await.unwrap();
        let err = create(&mut conn, &dup).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[actix_web::test]
    async fn update_fields_keeps_unset_values() {
        let db = Db::in_memory().await.unwrap();
        let user = insert_user(&db, "ada").await;
        let upd = UserUpdate { email: Some("  NEW@Example.org".into()), ..Default::default() };
        let updated = update_fields(&db, &user.id, &upd).await.unwrap();
        assert_eq!(updated.email, "new@example.org");
        assert_eq!(updated.username, "ada");
        assert_eq!(updated.name, user.name);
    }

    #[actix_web::test]
    async fn update_fields_rejects_taken_username() {
        let db = Db::in_memory().await.unwrap();
        let ada = insert_user(&db, "ada").await;
        insert_user(&db, "bob").await;
        let upd = UserUpdate { username: Some("BOB".into()), ..Default::default() };
        let err = update_fields(&db, &ada.id, &upd).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[actix_web::test]
    async fn public_many_skips_unknown_ids() {
        let db = Db::in_memory().await.unwrap();
        let ada = insert_user(&db, "ada").await;
        let map = find_public_many(&db, &[ada.id.clone(), "ghost".into()]).await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[&ada.id].username, "ada");
    }
}
