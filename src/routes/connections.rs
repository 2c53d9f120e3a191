use crate::{auth::AuthUser, db::Db, errors::ApiError, store::connections};
use actix_web::{HttpResponse, web};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReq {
    pub connection_id: String,
}

pub async fn send_connection_request(
    db: web::Data<Db>,
    user: AuthUser,
    body: web::Json<SendReq>,
) -> Result<HttpResponse, ApiError> {
    let request = connections::create(&db, &user.user_id, &body.connection_id).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Request sent",
        "request": request,
    })))
}

pub async fn my_connection_requests(db: web::Data<Db>, user: AuthUser) -> Result<HttpResponse, ApiError> {
    let sent = connections::sent_by(&db, &user.user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "connections": sent })))
}

pub async fn incoming_requests(db: web::Data<Db>, user: AuthUser) -> Result<HttpResponse, ApiError> {
    let received = connections::received_by(&db, &user.user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "connections": received })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondReq {
    pub request_id: String,
    pub action_type: String,
}

pub async fn respond_connection_request(
    db: web::Data<Db>,
    user: AuthUser,
    body: web::Json<RespondReq>,
) -> Result<HttpResponse, ApiError> {
    let accept = match body.action_type.as_str() {
        "accept" => true,
        "reject" => false,
        _ => return Err(ApiError::BadRequest("actionType must be accept or reject".into())),
    };
    let request = connections::respond(&db, &user.user_id, &body.request_id, accept).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Request updated",
        "request": request,
    })))
}
