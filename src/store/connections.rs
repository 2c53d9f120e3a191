use chrono::Utc;

use crate::{
    db::Db,
    errors::{ApiError, is_unique_violation},
    models::connection::{ConnectionRequest, ConnectionStatus, ConnectionWithUser},
    store::users,
};

const REQUEST_COLUMNS: &str = "id, user_id, connection_id, status, created_at, updated_at";

/// Opens a pending request from `user_id` to `target_id`. At most one request
/// exists per ordered pair.
pub async fn create(db: &Db, user_id: &str, target_id: &str) -> Result<ConnectionRequest, ApiError> {
    if user_id == target_id {
        return Err(ApiError::BadRequest("cannot connect to yourself".into()));
    }
    if users::find_by_id(db, target_id).await?.is_none() {
        return Err(ApiError::user_not_found());
    }
    let now = Utc::now();
    let request = ConnectionRequest {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        connection_id: target_id.to_string(),
        status: ConnectionStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    let res = sqlx::query(&format!(
        "INSERT INTO connection_requests({REQUEST_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
    ))
    .bind(&request.id)
    .bind(&request.user_id)
    .bind(&request.connection_id)
    .bind(request.status.as_str())
    .bind(request.created_at)
    .bind(request.updated_at)
    .execute(&db.0)
    .await;
    match res {
        Ok(_) => Ok(request),
        Err(e) if is_unique_violation(&e) => Err(ApiError::Conflict("request already sent".into())),
        Err(e) => Err(e.into()),
    }
}

pub async fn find_by_id(db: &Db, id: &str) -> Result<Option<ConnectionRequest>, ApiError> {
    let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM connection_requests WHERE id = ?"))
        .bind(id)
        .fetch_optional(&db.0)
        .await?;
    Ok(row.as_ref().map(ConnectionRequest::from_row))
}

/// Requests sent by `user_id`, each joined with its target.
pub async fn sent_by(db: &Db, user_id: &str) -> Result<Vec<ConnectionWithUser>, ApiError> {
    let rows = sqlx::query(&format!(
        "SELECT {REQUEST_COLUMNS} FROM connection_requests WHERE user_id = ? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(&db.0)
    .await?;
    let requests: Vec<ConnectionRequest> = rows.iter().map(ConnectionRequest::from_row).collect();
    join_users(db, requests, |r| &r.connection_id).await
}

/// Requests addressed to `user_id`, each joined with its requester.
pub async fn received_by(db: &Db, user_id: &str) -> Result<Vec<ConnectionWithUser>, ApiError> {
    let rows = sqlx::query(&format!(
        "SELECT {REQUEST_COLUMNS} FROM connection_requests WHERE connection_id = ? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(&db.0)
    .await?;
    let requests: Vec<ConnectionRequest> = rows.iter().map(ConnectionRequest::from_row).collect();
    join_users(db, requests, |r| &r.user_id).await
}

async fn join_users(
    db: &Db,
    requests: Vec<ConnectionRequest>,
    other: fn(&ConnectionRequest) -> &String,
) -> Result<Vec<ConnectionWithUser>, ApiError> {
    let ids: Vec<String> = requests.iter().map(|r| other(r).clone()).collect();
    let people = users::find_public_many(db, &ids).await?;
    Ok(requests
        .into_iter()
        .filter_map(|request| {
            let user = people.get(other(&request))?.clone();
            Some(ConnectionWithUser { request, user })
        })
        .collect())
}

/// Accepts or rejects a pending request. Only its target may answer it.
pub async fn respond(
    db: &Db,
    user_id: &str,
    request_id: &str,
    accept: bool,
) -> Result<ConnectionRequest, ApiError> {
    let mut request = find_by_id(db, request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("connection request not found".into()))?;
    if request.connection_id != user_id {
        return Err(ApiError::Unauthorized);
    }
    if request.status != ConnectionStatus::Pending {
        return Err(ApiError::BadRequest("request already answered".into()));
    }
    request.status = if accept { ConnectionStatus::Accepted } else { ConnectionStatus::Rejected };
    request.updated_at = Utc::now();
    let res = sqlx::query(
        "UPDATE connection_requests SET status = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(request.status.as_str())
    .bind(request.updated_at)
    .bind(&request.id)
    .execute(&db.0)
    .await?;
    if res.rows_affected() == 0 {
        return Err(ApiError::BadRequest("request already answered".into()));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::users::tests::insert_user;

    #[actix_web::test]
    async fn one_request_per_ordered_pair() {
        let db = Db::in_memory().await.unwrap();
        let ada = insert_user(&db, "ada").await;
        let bob = insert_user(&db, "bob").await;

        create(&db, &ada.id, &bob.id).await.unwrap();
        let err = create(&db, &ada.id, &bob.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        // the reverse direction is a different pair
        create(&db, &bob.id, &ada.id).await.unwrap();
    }

    #[actix_web::test]
    async fn self_and_unknown_targets_are_rejected() {
        let db = Db::in_memory().await.unwrap();
        let ada = insert_user(&db, "ada").await;
        assert!(matches!(create(&db, &ada.id, &ada.id).await, Err(ApiError::BadRequest(_))));
        assert!(matches!(create(&db, &ada.id, "ghost").await, Err(ApiError::NotFound(_))));
    }

    #[actix_web::test]
    async fn only_target_answers_once() {
        let db = Db::in_memory().await.unwrap();
        let ada = insert_user(&db, "ada").await;
        let bob = insert_user(&db, "bob").await;
        let req = create(&db, &ada.id, &bob.id).await.unwrap();

        assert!(matches!(respond(&db, &ada.id, &req.id, true).await, Err(ApiError::Unauthorized)));
        let answered = respond(&db, &bob.id, &req.id, true).await.unwrap();
        assert_eq!(answered.status, ConnectionStatus::Accepted);
        assert!(matches!(respond(&db, &bob.id, &req.id, false).await, Err(ApiError::BadRequest(_))));

        let stored = find_by_id(&db, &req.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ConnectionStatus::Accepted);
    }

    #[actix_web::test]
    async fn listings_join_the_other_side() {
        let db = Db::in_memory().await.unwrap();
        let ada = insert_user(&db, "ada").await;
        let bob = insert_user(&db, "bob").await;
        create(&db, &ada.id, &bob.id).await.unwrap();

        let sent = sent_by(&db, &ada.id).await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user.username, "bob");

        let received = received_by(&db, &bob.id).await.unwrap();
        assert_eq!(received[0].user.username, "ada");
        assert!(received_by(&db, &ada.id).await.unwrap().is_empty());
    }
}
