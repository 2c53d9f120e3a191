pub mod connections;
pub mod files;
pub mod health;
pub mod posts;
pub mod users;

use crate::errors::ApiError;
use actix_web::web;

/// Registers every API route. The static file service over the uploads
/// directory is mounted separately, after these, so it never shadows them.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| ApiError::BadRequest(format!("invalid request body: {err}")).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| ApiError::BadRequest(format!("invalid query: {err}")).into()),
    )
    .route("/", web::get().to(health::active_check))
    // users and profiles
    .route("/register", web::post().to(users::register))
    .route("/login", web::post().to(users::login))
    .route("/update_profile_picture", web::post().to(users::upload_profile_picture))
    .route("/user_update", web::post().to(users::update_user))
    .route("/get_user_and_profile", web::get().to(users::get_user_and_profile))
    .route("/update_profile_data", web::post().to(users::update_profile_data))
    .route("/user/all_user_profiles", web::get().to(users::all_user_profiles))
    .route("/user/download_resume", web::get().to(users::download_resume))
    // connections
    .route("/send_connection_request", web::post().to(connections::send_connection_request))
    .route("/user/connection_requests", web::get().to(connections::my_connection_requests))
    .route("/user/incoming_requests", web::get().to(connections::incoming_requests))
    .route("/respond_connection_request", web::post().to(connections::respond_connection_request))
    // posts
    .route("/createpost", web::post().to(posts::create_post))
    .route("/allposts", web::get().to(posts::all_posts))
    .route("/delete_post", web::delete().to(posts::delete_post))
    .route("/comment", web::post().to(posts::comment_post))
    .route("/get_comments", web::post().to(posts::get_comments))
    .route("/delete_comment", web::post().to(posts::delete_comment))
    .route("/increment_post_like", web::post().to(posts::increment_likes));
}
