use chrono::Utc;
use sqlx::Row;

use crate::{
    db::Db,
    errors::ApiError,
    models::post::{Comment, CommentWithUser, Post, PostWithUser},
    store::users,
};

const POST_COLUMNS: &str = "id, user_id, body, media, file_type, likes, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, post_id, user_id, body, created_at";

#[derive(Debug, Default, Clone)]
pub struct NewPost {
    pub body: String,
    pub media: String,
    pub file_type: String,
}

pub async fn create(db: &Db, user_id: &str, new: NewPost) -> Result<Post, ApiError> {
    let now = Utc::now();
    let post = Post {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        body: new.body,
        media: new.media,
        file_type: new.file_type,
        likes: 0,
        created_at: now,
        updated_at: now,
    };
    sqlx::query(&format!("INSERT INTO posts({POST_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"))
        .bind(&post.id)
        .bind(&post.user_id)
        .bind(&post.body)
        .bind(&post.media)
        .bind(&post.file_type)
        .bind(post.likes)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&db.0)
        .await?;
    Ok(post)
}

pub async fn find_by_id(db: &Db, id: &str) -> Result<Option<Post>, ApiError> {
    let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
        .bind(id)
        .fetch_optional(&db.0)
        .await?;
    Ok(row.as_ref().map(Post::from_row))
}

/// Every post, newest first, with its author.
pub async fn list_joined(db: &Db) -> Result<Vec<PostWithUser>, ApiError> {
    let rows = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC"))
        .fetch_all(&db.0)
        .await?;
    let posts: Vec<Post> = rows.iter().map(Post::from_row).collect();
    let ids: Vec<String> = posts.iter().map(|p| p.user_id.clone()).collect();
    let authors = users::find_public_many(db, &ids).await?;
    Ok(posts
        .into_iter()
        .filter_map(|post| {
            let user = authors.get(&post.user_id)?.clone();
            Some(PostWithUser { post, user })
        })
        .collect())
}

/// Deletes a post together with its comments. Only the owner may do this; any
/// other caller gets `Unauthorized` and the post is left untouched.
pub async fn delete_owned(db: &Db, user_id: &str, post_id: &str) -> Result<Post, ApiError> {
    let post = find_by_id(db, post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("post not found".into()))?;
    if post.user_id != user_id {
        return Err(ApiError::Unauthorized);
    }
    let mut tx = db.0.begin().await?;
    sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM posts WHERE id = ? AND user_id = ?")
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(post)
}

pub async fn add_comment(db: &Db, user_id: &str, post_id: &str, body: &str) -> Result<Comment, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::BadRequest("comment body required".into()));
    }
    if find_by_id(db, post_id).await?.is_none() {
        return Err(ApiError::NotFound("post not found".into()));
    }
    let comment = Comment {
        id: uuid::Uuid::new_v4().to_string(),
        post_id: post_id.to_string(),
        user_id: user_id.to_string(),
        body: body.to_string(),
        created_at: Utc::now(),
    };
    sqlx::query(&format!("INSERT INTO comments({COMMENT_COLUMNS}) VALUES (?, ?, ?, ?, ?)"))
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.user_id)
        .bind(&comment.body)
        .bind(comment.created_at)
        .execute(&db.0)
        .await?;
    Ok(comment)
}

/// Comments of a post, oldest first, each with its author.
pub async fn comments_joined(db: &Db, post_id: &str) -> Result<Vec<CommentWithUser>, ApiError> {
    if find_by_id(db, post_id).await?.is_none() {
        return Err(ApiError::NotFound("post not found".into()));
    }
    let rows = sqlx::query(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ? ORDER BY created_at ASC"
    ))
    .bind(post_id)
    .fetch_all(&db.0)
    .await?;
    let comments: Vec<Comment> = rows.iter().map(Comment::from_row).collect();
    let ids: Vec<String> = comments.iter().map(|c| c.user_id.clone()).collect();
    let authors = users::find_public_many(db, &ids).await?;
    Ok(comments
        .into_iter()
        .filter_map(|comment| {
            let user = authors.get(&comment.user_id)?.clone();
            Some(CommentWithUser { comment, user })
        })
        .collect())
}

pub async fn delete_comment_owned(db: &Db, user_id: &str, comment_id: &str) -> Result<(), ApiError> {
    let row = sqlx::query("SELECT user_id FROM comments WHERE id = ?")
        .bind(comment_id)
        .fetch_optional(&db.0)
        .await?;
    let row = row.ok_or_else(|| ApiError::NotFound("comment not found".into()))?;
    let owner: String = row.get("user_id");
    if owner != user_id {
        return Err(ApiError::Unauthorized);
    }
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment_id)
        .execute(&db.0)
        .await?;
    Ok(())
}

/// Adds one like in a single statement and returns the new count.
pub async fn increment_likes(db: &Db, post_id: &str) -> Result<i64, ApiError> {
    let row = sqlx::query("UPDATE posts SET likes = likes + 1 WHERE id = ? RETURNING likes")
        .bind(post_id)
        .fetch_optional(&db.0)
        .await?;
    let row = row.ok_or_else(|| ApiError::NotFound("post not found".into()))?;
    Ok(row.get("likes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::users::tests::insert_user;

    fn text(body: &str) -> NewPost {
        NewPost { body: body.into(), ..Default::default() }
    }

    #[actix_web::test]
    async fn non_owner_cannot_delete_post() {
        let db = Db::in_memory().await.unwrap();
        let ada = insert_user(&db, "ada").await;
        let bob = insert_user(&db, "bob").await;
        let post = create(&db, &ada.id, text("hello")).await.unwrap();

        let err = delete_owned(&db, &bob.id, &post.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert!(find_by_id(&db, &post.id).await.unwrap().is_some());

        delete_owned(&db, &ada.id, &post.id).await.unwrap();
        assert!(find_by_id(&db, &post.id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn deleting_missing_post_is_not_found() {
        let db = Db::in_memory().await.unwrap();
        let ada = insert_user(&db, "ada").await;
        let err = delete_owned(&db, &ada.id, "missing").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[actix_web::test]
    async fn likes_only_go_up() {
        let db = Db::in_memory().await.unwrap();
        let ada = insert_user(&db, "ada").await;
        let post = create(&db, &ada.id, text("hello")).await.unwrap();
        assert_eq!(increment_likes(&db, &post.id).await.unwrap(), 1);
        assert_eq!(increment_likes(&db, &post.id).await.unwrap(), 2);
        assert!(matches!(increment_likes(&db, "missing").await, Err(ApiError::NotFound(_))));
    }

    #[actix_web::test]
    async fn comments_are_owned_and_ordered() {
        let db = Db::in_memory().await.unwrap();
        let ada = insert_user(&db, "ada").await;
        let bob = insert_user(&db, "bob").await;
        let post = create(&db, &ada.id, text("hello")).await.unwrap();

        let first = add_comment(&db, &bob.id, &post.id, "first").await.unwrap();
        add_comment(&db, &ada.id, &post.id, "second").await.unwrap();
        assert!(matches!(add_comment(&db, &bob.id, &post.id, "  ").await, Err(ApiError::BadRequest(_))));

        let listed = comments_joined(&db, &post.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].comment.body, "first");
        assert_eq!(listed[0].user.username, "bob");

        let err = delete_comment_owned(&db, &ada.id, &first.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        delete_comment_owned(&db, &bob.id, &first.id).await.unwrap();
        assert_eq!(comments_joined(&db, &post.id).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn list_is_newest_first() {
        let db = Db::in_memory().await.unwrap();
        let ada = insert_user(&db, "ada").await;
        create(&db, &ada.id, text("older")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        create(&db, &ada.id, text("newer")).await.unwrap();
        let posts = list_joined(&db).await.unwrap();
        assert_eq!(posts[0].post.body, "newer");
        assert_eq!(posts[1].user.username, "ada");
    }
}
