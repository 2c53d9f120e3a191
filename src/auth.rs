use crate::db::Db;
use crate::errors::ApiError;
use crate::models::user::{DEFAULT_PROFILE_PICTURE, PublicUser, User, normalize_key};
use crate::store::{profiles, users};
use crate::utils::random_hex;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;

pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|_| ApiError::Internal)?
        .to_string())
}

pub fn verify_password(hash: &str, plain: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub username: String,
}

/// Creates the account and its empty profile in one transaction. Returns the
/// display name.
pub async fn register(db: &Db, reg: &Registration) -> Result<String, ApiError> {
    if [&reg.name, &reg.email, &reg.password, &reg.username]
        .iter()
        .any(|f| f.trim().is_empty())
    {
        return Err(ApiError::BadRequest("All fields are required".into()));
    }
    let email = normalize_key(&reg.email);
    if users::find_by_email(db, &email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: reg.name.trim().to_string(),
        username: normalize_key(&reg.username),
        email,
        password_hash: hash_password(&reg.password)?,
        profile_picture: DEFAULT_PROFILE_PICTURE.to_string(),
        token: String::new(),
        active: true,
        created_at: now,
        updated_at: now,
    };

    let mut tx = db.0.begin().await?;
    users::create(&mut *tx, &user).await?;
    profiles::create(&mut *tx, &user.id).await?;
    tx.commit().await?;

    log::info!("registered user {} ({})", user.username, user.id);
    Ok(user.name)
}

/// Verifies credentials and rotates the user's token. Any token handed out
/// earlier stops resolving.
pub async fn login(db: &Db, email: &str, password: &str) -> Result<(String, PublicUser), ApiError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    }
    let user = users::find_by_email(db, email)
        .await?
        .ok_or_else(ApiError::user_not_found)?;
    if !verify_password(&user.password_hash, password) {
        log::info!("failed login for {}", user.id);
        return Err(ApiError::InvalidCredentials);
    }
    let token = issue_token(db, &user.id).await?;
    log::info!("login {} ({})", user.username, user.id);
    Ok((token, user.into()))
}

/// Stores a fresh 256-bit token in the user's single token slot.
pub async fn issue_token(db: &Db, user_id: &str) -> Result<String, ApiError> {
    let token = random_hex(32);
    let res = sqlx::query("UPDATE users SET token = ?, updated_at = ? WHERE id = ?")
        .bind(&token)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&db.0)
        .await?;
    if res.rows_affected() == 0 {
        return Err(ApiError::user_not_found());
    }
    Ok(token)
}

/// Resolves a bearer token to its user. The empty token never matches, even
/// though users that never logged in carry it.
pub async fn resolve(db: &Db, token: &str) -> Result<User, ApiError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::user_not_found());
    }
    users::find_by_token(db, token)
        .await?
        .ok_or_else(ApiError::user_not_found)
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub user: User,
}

/// `Authorization: Bearer <token>` first, then a `token` query parameter.
fn request_token(req: &HttpRequest) -> Option<String> {
    if let Some(h) = req.headers().get("Authorization") {
        if let Ok(s) = h.to_str() {
            if let Some(token) = s.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }
    web::Query::<TokenQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().token)
}

#[derive(serde::Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let db = req.app_data::<web::Data<Db>>().cloned();
        let token = request_token(req).unwrap_or_default();
        Box::pin(async move {
            let db = db.ok_or(ApiError::Internal)?;
            let user = resolve(&db, &token).await?;
            Ok(AuthUser {
                user_id: user.id.clone(),
                user,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ada() -> Registration {
        Registration {
            name: "Ada Lovelace".into(),
            email: "Ada@Example.org".into(),
            password: "correct horse".into(),
            username: "Ada".into(),
        }
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password(&hash, "s3cret"));
        assert!(!verify_password(&hash, "other"));
        assert!(!verify_password("not a phc string", "s3cret"));
    }

    #[actix_web::test]
    async fn register_creates_user_and_empty_profile() {
        let db = Db::in_memory().await.unwrap();
        let name = register(&db, &ada()).await.unwrap();
        assert_eq!(name, "Ada Lovelace");

        let user = users::find_by_email(&db, "ada@example.org").await.unwrap().unwrap();
        assert_eq!(user.username, "ada");
        assert_eq!(user.token, "");
        assert!(user.active);
        let profile = profiles::find_by_user_id(&db, &user.id).await.unwrap().unwrap();
        assert!(profile.past_work.is_empty() && profile.education.is_empty());
    }

    #[actix_web::test]
    async fn register_requires_every_field() {
        let db = Db::in_memory().await.unwrap();
        let mut reg = ada();
        reg.username = "  ".into();
        assert!(matches!(register(&db, &reg).await, Err(ApiError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn duplicate_email_conflicts_without_orphans() {
        let db = Db::in_memory().await.unwrap();
        register(&db, &ada()).await.unwrap();
        let mut again = ada();
        again.username = "someone_else".into();
        assert!(matches!(register(&db, &again).await, Err(ApiError::Conflict(_))));

        let mut same_username = ada();
        same_username.email = "other@example.org".into();
        assert!(matches!(register(&db, &same_username).await, Err(ApiError::Conflict(_))));

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&db.0).await.unwrap();
        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles").fetch_one(&db.0).await.unwrap();
        assert_eq!((users, profiles), (1, 1));
    }

    #[actix_web::test]
    async fn login_rotates_token() {
        let db = Db::in_memory().await.unwrap();
        register(&db, &ada()).await.unwrap();

        let (first, user) = login(&db, " ADA@example.org ", "correct horse").await.unwrap();
        assert_eq!(user.username, "ada");
        assert_eq!(resolve(&db, &first).await.unwrap().id, user.id);

        let (second, _) = login(&db, "ada@example.org", "correct horse").await.unwrap();
        assert_ne!(first, second);
        assert!(matches!(resolve(&db, &first).await, Err(ApiError::NotFound(_))));
        assert_eq!(resolve(&db, &second).await.unwrap().id, user.id);
    }

    #[actix_web::test]
    async fn login_failures() {
        let db = Db::in_memory().await.unwrap();
        register(&db, &ada()).await.unwrap();
        assert!(matches!(login(&db, "nobody@example.org", "x").await, Err(ApiError::NotFound(_))));
        assert!(matches!(
            login(&db, "ada@example.org", "wrong").await,
            Err(ApiError::InvalidCredentials)
        ));
        assert!(matches!(login(&db, "", "x").await, Err(ApiError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn empty_token_never_resolves() {
        let db = Db::in_memory().await.unwrap();
        register(&db, &ada()).await.unwrap();
        // the registered user still carries the empty token
        assert!(matches!(resolve(&db, "").await, Err(ApiError::NotFound(_))));
        assert!(matches!(resolve(&db, "   ").await, Err(ApiError::NotFound(_))));
    }
}
