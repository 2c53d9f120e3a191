use chrono::Utc;
use sqlx::SqliteConnection;
use sqlx::types::Json;

use crate::{
    db::Db,
    errors::ApiError,
    models::profile::{Profile, ProfileWithUser},
    store::users,
};

const PROFILE_COLUMNS: &str =
    "id, user_id, bio, current_post, past_work, education, created_at, updated_at";

pub async fn find_by_user_id(db: &Db, user_id: &str) -> Result<Option<Profile>, ApiError> {
    let row = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?"))
        .bind(user_id)
        .fetch_optional(&db.0)
        .await?;
    Ok(row.as_ref().map(Profile::from_row))
}

/// The profile of `user_id` with its owner joined in.
pub async fn find_joined_by_user_id(db: &Db, user_id: &str) -> Result<Option<ProfileWithUser>, ApiError> {
    let Some(profile) = find_by_user_id(db, user_id).await? else {
        return Ok(None);
    };
    let user = users::find_by_id(db, &profile.user_id).await?.map(Into::into);
    Ok(Some(ProfileWithUser { profile, user }))
}

pub async fn all_joined(db: &Db) -> Result<Vec<ProfileWithUser>, ApiError> {
    let rows = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at ASC"))
        .fetch_all(&db.0)
        .await?;
    let profiles: Vec<Profile> = rows.iter().map(Profile::from_row).collect();
    let ids: Vec<String> = profiles.iter().map(|p| p.user_id.clone()).collect();
    let mut owners = users::find_public_many(db, &ids).await?;
    Ok(profiles
        .into_iter()
        .map(|profile| {
            let user = owners.remove(&profile.user_id);
            ProfileWithUser { profile, user }
        })
        .collect())
}

/// Inserts the empty companion profile of a freshly created user.
pub async fn create(conn: &mut SqliteConnection, user_id: &str) -> Result<Profile, ApiError> {
    let now = Utc::now();
    let profile = Profile {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        bio: String::new(),
        current_post: String::new(),
        past_work: Vec::new(),
        education: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    sqlx::query(&format!(
        "INSERT INTO profiles({PROFILE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&profile.id)
    .bind(&profile.user_id)
    .bind(&profile.bio)
    .bind(&profile.current_post)
    .bind(Json(&profile.past_work))
    .bind(Json(&profile.education))
    .bind(profile.created_at)
    .bind(profile.updated_at)
    .execute(conn)
    .await?;
    Ok(profile)
}

/// Writes back every mutable field of `profile` and bumps `updated_at`.
pub async fn save(db: &Db, profile: &mut Profile) -> Result<(), ApiError> {
    profile.updated_at = Utc::now();
    let res = sqlx::query(
        "UPDATE profiles SET bio = ?, current_post = ?, past_work = ?, education = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&profile.bio)
    .bind(&profile.current_post)
    .bind(Json(&profile.past_work))
    .bind(Json(&profile.education))
    .bind(profile.updated_at)
    .bind(&profile.id)
    .execute(&db.0)
    .await?;
    if res.rows_affected() == 0 {
        return Err(ApiError::NotFound("profile not found".into()));
    }
    Ok(())
}

/// Rewrites education entries stored under the legacy `filedOfStudy` key to
/// the canonical `fieldOfStudy` key, keeping a non-empty canonical value when
/// both are present. Returns the number of entries rewritten; a second run
/// finds nothing to do.
pub async fn rewrite_legacy_education_keys(db: &Db) -> Result<u64, ApiError> {
    let mut tx = db.0.begin().await?;
    let targets: Vec<(String, String)> = sqlx::query_as(
        "SELECT p.id, e.fullkey FROM profiles AS p, json_each(p.education) AS e \
         WHERE json_type(p.education, e.fullkey || '.filedOfStudy') IS NOT NULL",
    )
    .fetch_all(&mut *tx)
    .await?;

    let now = Utc::now();
    for (profile_id, entry) in &targets {
        sqlx::query(
            "UPDATE profiles SET education = json_remove( \
                CASE WHEN COALESCE(json_extract(education, ? || '.fieldOfStudy'), '') = '' \
                     THEN json_set(education, ? || '.fieldOfStudy', json_extract(education, ? || '.filedOfStudy')) \
                     ELSE education END, \
                ? || '.filedOfStudy'), updated_at = ? \
             WHERE id = ?",
        )
        .bind(entry)
        .bind(entry)
        .bind(entry)
        .bind(entry)
        .bind(now)
        .bind(profile_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(targets.len() as u64)
}
