use crate::{
    auth::{self, AuthUser, Registration},
    config::Config,
    db::Db,
    errors::ApiError,
    models::profile::{EducationEntry, WorkEntry},
    models::user::{DEFAULT_PROFILE_PICTURE, PublicUser},
    render,
    routes::files::{read_upload_form, remove_upload},
    store::{profiles, users},
};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct RegisterReq {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

pub async fn register(db: web::Data<Db>, body: web::Json<RegisterReq>) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let reg = Registration {
        name: body.name.unwrap_or_default(),
        email: body.email.unwrap_or_default(),
        password: body.password.unwrap_or_default(),
        username: body.username.unwrap_or_default(),
    };
    let name = auth::register(&db, &reg).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": format!("User registered successfully {name}"),
    })))
}

#[derive(Deserialize)]
pub struct LoginReq {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResp {
    message: &'static str,
    token: String,
    user: PublicUser,
}

pub async fn login(db: web::Data<Db>, body: web::Json<LoginReq>) -> Result<HttpResponse, ApiError> {
    let (token, user) = auth::login(
        &db,
        body.email.as_deref().unwrap_or_default(),
        body.password.as_deref().unwrap_or_default(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(LoginResp {
        message: "Login successful",
        token,
        user,
    }))
}

pub async fn upload_profile_picture(
    cfg: web::Data<Config>,
    db: web::Data<Db>,
    user: AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let form = read_upload_form(&cfg, payload, "profilePicture").await?;
    let saved = form.file.ok_or(ApiError::BadRequest("no file".into()))?;
    if !saved.mime_type.starts_with("image/") {
        saved.discard(&cfg).await;
        return Err(ApiError::BadRequest("profile picture must be an image".into()));
    }
    let upd = users::UserUpdate {
        profile_picture: Some(saved.stored_name.clone()),
        ..Default::default()
    };
    if let Err(e) = users::update_fields(&db, &user.user_id, &upd).await {
        saved.discard(&cfg).await;
        return Err(e);
    }

    // the default picture is shared by every account
    let previous = &user.user.profile_picture;
    if !previous.is_empty() && previous != DEFAULT_PROFILE_PICTURE && *previous != saved.stored_name {
        remove_upload(&cfg, previous).await;
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Profile picture updated",
        "profilePicture": saved.stored_name,
    })))
}

#[derive(Deserialize)]
pub struct UpdateUserReq {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

pub async fn update_user(
    db: web::Data<Db>,
    user: AuthUser,
    body: web::Json<UpdateUserReq>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    if [&body.name, &body.username, &body.email]
        .iter()
        .any(|f| f.as_deref().is_some_and(|s| s.trim().is_empty()))
    {
        return Err(ApiError::BadRequest("fields cannot be blank".into()));
    }
    if let Some(username) = &body.username {
        if let Some(other) = users::find_by_username(&db, username).await? {
            if other.id != user.user_id {
                return Err(ApiError::Conflict("username already taken".into()));
            }
        }
    }
    if let Some(email) = &body.email {
        if let Some(other) = users::find_by_email(&db, email).await? {
            if other.id != user.user_id {
                return Err(ApiError::Conflict("email already taken".into()));
            }
        }
    }
    let upd = users::UserUpdate {
        name: body.name,
        username: body.username,
        email: body.email,
        profile_picture: None,
    };
    let updated = users::update_fields(&db, &user.user_id, &upd).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User updated",
        "user": PublicUser::from(updated),
    })))
}

pub async fn get_user_and_profile(db: web::Data<Db>, user: AuthUser) -> Result<HttpResponse, ApiError> {
    let joined = profiles::find_joined_by_user_id(&db, &user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("profile not found".into()))?;
    Ok(HttpResponse::Ok().json(joined))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileReq {
    pub bio: Option<String>,
    pub current_post: Option<String>,
    pub past_work: Option<Vec<WorkEntry>>,
    pub education: Option<Vec<EducationEntry>>,
}

pub async fn update_profile_data(
    db: web::Data<Db>,
    user: AuthUser,
    body: web::Json<UpdateProfileReq>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let mut profile = profiles::find_by_user_id(&db, &user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("profile not found".into()))?;
    if let Some(bio) = body.bio {
        profile.bio = bio;
    }
    if let Some(current_post) = body.current_post {
        profile.current_post = current_post;
    }
    if let Some(past_work) = body.past_work {
        profile.past_work = past_work;
    }
    if let Some(education) = body.education {
        profile.education = education;
    }
    profiles::save(&db, &mut profile).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Profile updated",
        "profile": profile,
    })))
}

pub async fn all_user_profiles(db: web::Data<Db>) -> Result<HttpResponse, ApiError> {
    let all = profiles::all_joined(&db).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "profiles": all })))
}

#[derive(Deserialize)]
pub struct ResumeQuery {
    pub id: String,
}

/// Renders the resume of user `id` and returns the generated file's name; the
/// file itself is served by the static file service.
pub async fn download_resume(
    cfg: web::Data<Config>,
    db: web::Data<Db>,
    q: web::Query<ResumeQuery>,
) -> Result<HttpResponse, ApiError> {
    let joined = profiles::find_joined_by_user_id(&db, &q.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("profile not found".into()))?;
    let handle = render::render_profile(
        &joined.profile,
        joined.user.as_ref(),
        &cfg.uploads_path(),
        cfg.render_timeout(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": handle })))
}
