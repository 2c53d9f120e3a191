use crate::{
    auth::AuthUser,
    config::Config,
    db::Db,
    errors::ApiError,
    routes::files::{read_upload_form, remove_upload},
    store::posts::{self, NewPost},
};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

pub async fn create_post(
    cfg: web::Data<Config>,
    db: web::Data<Db>,
    user: AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let form = read_upload_form(&cfg, payload, "media").await?;
    let body = form.text("body").unwrap_or_default().to_string();
    if body.trim().is_empty() && form.file.is_none() {
        return Err(ApiError::BadRequest("post must have a body or media".into()));
    }
    let (media, file_type) = form
        .file
        .as_ref()
        .map(|f| (f.stored_name.clone(), f.mime_type.clone()))
        .unwrap_or_default();
    let post = match posts::create(&db, &user.user_id, NewPost { body, media, file_type }).await {
        Ok(post) => post,
        Err(e) => {
            if let Some(file) = &form.file {
                file.discard(&cfg).await;
            }
            return Err(e);
        }
    };
    log::info!("{} created post {}", user.user.username, post.id);
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Post created successfully!",
        "post": post,
    })))
}

pub async fn all_posts(db: web::Data<Db>) -> Result<HttpResponse, ApiError> {
    let list = posts::list_joined(&db).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "posts": list })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRef {
    pub post_id: String,
}

pub async fn delete_post(
    cfg: web::Data<Config>,
    db: web::Data<Db>,
    user: AuthUser,
    body: web::Json<PostRef>,
) -> Result<HttpResponse, ApiError> {
    let post = posts::delete_owned(&db, &user.user_id, &body.post_id).await?;
    if !post.media.is_empty() {
        remove_upload(&cfg, &post.media).await;
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Post deleted" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentReq {
    pub post_id: String,
    pub comment_body: String,
}

pub async fn comment_post(
    db: web::Data<Db>,
    user: AuthUser,
    body: web::Json<CommentReq>,
) -> Result<HttpResponse, ApiError> {
    let comment = posts::add_comment(&db, &user.user_id, &body.post_id, &body.comment_body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Comment added",
        "comment": comment,
    })))
}

pub async fn get_comments(db: web::Data<Db>, body: web::Json<PostRef>) -> Result<HttpResponse, ApiError> {
    let comments = posts::comments_joined(&db, &body.post_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "comments": comments })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRef {
    pub comment_id: String,
}

pub async fn delete_comment(
    db: web::Data<Db>,
    user: AuthUser,
    body: web::Json<CommentRef>,
) -> Result<HttpResponse, ApiError> {
    posts::delete_comment_owned(&db, &user.user_id, &body.comment_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Comment deleted" })))
}

pub async fn increment_likes(db: web::Data<Db>, body: web::Json<PostRef>) -> Result<HttpResponse, ApiError> {
    let likes = posts::increment_likes(&db, &body.post_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Likes incremented",
        "likes": likes,
    })))
}
