use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::domain::content::{ContentItem, ContentKind};
use crate::domain::slug::Slug;
use crate::email_client::EmailClient;
use crate::notifications::trigger::{self, DispatchMode};
use crate::routes::{default_true, resolve_slug, ContentQueryError, SaveContentError};
use crate::startup::ApplicationBaseUrl;

#[derive(serde::Deserialize)]
pub struct PostBody {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: String,
    pub category_id: Uuid,
    #[serde(default = "default_true")]
    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub notify_subscribers: bool,
}

/// The operator's view of a post. `notification_sent_at` is included so a UI
/// can disable the notify checkbox once it is set and spot "stamped but
/// possibly undelivered" items.
#[derive(serde::Serialize)]
pub struct AdminPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub category_id: Uuid,
    pub is_published: bool,
    pub is_featured: bool,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notification_sent_at: Option<DateTime<Utc>>,
}

#[derive(serde::Serialize)]
pub struct AdminPostResponse {
    pub post: AdminPost,
    /// What happened to the operator's notify request: "queued", "sent",
    /// "no_recipients", "skipped" or "failed". Informational only; the save
    /// itself already succeeded.
    pub notification: &'static str,
}

fn map_admin_post(row: PgRow) -> AdminPost {
    AdminPost {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        category_id: row.get("category_id"),
        is_published: row.get("is_published"),
        is_featured: row.get("is_featured"),
        published_at: row.get("published_at"),
        updated_at: row.get("updated_at"),
        notification_sent_at: row.get("notification_sent_at"),
    }
}

impl AdminPost {
    fn as_content_item(&self) -> ContentItem {
        ContentItem {
            id: self.id,
            kind: ContentKind::Post,
            title: self.title.clone(),
            slug: self.slug.clone(),
            excerpt: self.excerpt.clone(),
            is_published: self.is_published,
            notification_sent_at: self.notification_sent_at,
        }
    }
}

/// Every post, drafts included, newest first.
#[tracing::instrument(name = "List posts for the admin", skip(db_pool))]
pub async fn list_posts_admin(
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, ContentQueryError> {
    let posts = sqlx::query(
        r#"
        SELECT id, title, slug, excerpt, category_id, is_published, is_featured,
               published_at, updated_at, notification_sent_at
        FROM posts
        ORDER BY published_at DESC
        "#,
    )
    .map(map_admin_post)
    .fetch_all(db_pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(posts))
}

#[tracing::instrument(
    name = "Create a post",
    skip(body, db_pool, email_client, base_url, dispatch_mode),
    fields(title = %body.title, notify_subscribers = body.notify_subscribers)
)]
pub async fn create_post(
    body: web::Json<PostBody>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseUrl>,
    dispatch_mode: web::Data<DispatchMode>,
) -> Result<HttpResponse, SaveContentError> {
    let body = body.into_inner();
    let slug =
        resolve_slug(&body.title, body.slug.clone()).map_err(SaveContentError::Validation)?;

    let post = insert_post(&db_pool, &body, &slug).await?;

    // The post is durably saved at this point; whatever happens to the
    // notification must not turn the response into a failure.
    let outcome = trigger::notify_on_save(
        db_pool.get_ref(),
        email_client.get_ref(),
        &base_url.0,
        *dispatch_mode.get_ref(),
        &post.as_content_item(),
        body.notify_subscribers,
    )
    .await;

    Ok(HttpResponse::Created().json(AdminPostResponse {
        post,
        notification: outcome.as_str(),
    }))
}

#[tracing::instrument(
    name = "Update a post",
    skip(body, db_pool, email_client, base_url, dispatch_mode),
    fields(post_id = %id, notify_subscribers = body.notify_subscribers)
)]
pub async fn update_post(
    id: web::Path<Uuid>,
    body: web::Json<PostBody>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseUrl>,
    dispatch_mode: web::Data<DispatchMode>,
) -> Result<HttpResponse, SaveContentError> {
    let body = body.into_inner();
    let slug =
        resolve_slug(&body.title, body.slug.clone()).map_err(SaveContentError::Validation)?;

    let post = update_post_row(&db_pool, *id, &body, &slug)
        .await?
        .ok_or(SaveContentError::NotFound)?;

    let outcome = trigger::notify_on_save(
        db_pool.get_ref(),
        email_client.get_ref(),
        &base_url.0,
        *dispatch_mode.get_ref(),
        &post.as_content_item(),
        body.notify_subscribers,
    )
    .await;

    Ok(HttpResponse::Ok().json(AdminPostResponse {
        post,
        notification: outcome.as_str(),
    }))
}

/// Deleting a post does not touch the notification queue: a leftover job
/// resolves itself when the worker finds the item gone.
#[tracing::instrument(name = "Delete a post", skip(db_pool))]
pub async fn delete_post(
    id: web::Path<Uuid>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, SaveContentError> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(*id)
        .execute(db_pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(SaveContentError::NotFound);
    }

    Ok(HttpResponse::NoContent().finish())
}

#[tracing::instrument(name = "Insert a new post into the database", skip(db_pool, body, slug))]
async fn insert_post(
    db_pool: &PgPool,
    body: &PostBody,
    slug: &Slug,
) -> Result<AdminPost, SaveContentError> {
    let now = Utc::now();

    let post = sqlx::query(
        r#"
        INSERT INTO posts (id, title, slug, excerpt, category_id, is_published, is_featured,
                           published_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
        RETURNING id, title, slug, excerpt, category_id, is_published, is_featured,
                  published_at, updated_at, notification_sent_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&body.title)
    .bind(slug.as_ref())
    .bind(&body.excerpt)
    .bind(body.category_id)
    .bind(body.is_published)
    .bind(body.is_featured)
    .bind(now)
    .map(map_admin_post)
    .fetch_one(db_pool)
    .await?;

    Ok(post)
}

/// Updates the row. `notification_sent_at` is deliberately absent from the
/// SET list: the stamp is monotonic and unpublishing does not clear it.
#[tracing::instrument(name = "Update a post in the database", skip(db_pool, body, slug))]
async fn update_post_row(
    db_pool: &PgPool,
    id: Uuid,
    body: &PostBody,
    slug: &Slug,
) -> Result<Option<AdminPost>, SaveContentError> {
    let post = sqlx::query(
        r#"
        UPDATE posts
        SET title = $1, slug = $2, excerpt = $3, category_id = $4,
            is_published = $5, is_featured = $6, updated_at = $7
        WHERE id = $8
        RETURNING id, title, slug, excerpt, category_id, is_published, is_featured,
                  published_at, updated_at, notification_sent_at
        "#,
    )
    .bind(&body.title)
    .bind(slug.as_ref())
    .bind(&body.excerpt)
    .bind(body.category_id)
    .bind(body.is_published)
    .bind(body.is_featured)
    .bind(Utc::now())
    .bind(id)
    .map(map_admin_post)
    .fetch_optional(db_pool)
    .await?;

    Ok(post)
}
