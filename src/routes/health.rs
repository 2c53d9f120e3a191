use actix_web::HttpResponse;

pub async fn active_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "message": "Server is running smoothly!" }))
}
