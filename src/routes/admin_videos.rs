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
pub struct VideoBody {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub description: String,
    pub video_url: String,
    pub category_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub notify_subscribers: bool,
}

#[derive(serde::Serialize)]
pub struct AdminVideo {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub description: String,
    pub video_url: String,
    pub category_id: Option<Uuid>,
    pub is_published: bool,
    pub is_featured: bool,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notification_sent_at: Option<DateTime<Utc>>,
}

#[derive(serde::Serialize)]
pub struct AdminVideoResponse {
    pub video: AdminVideo,
    pub notification: &'static str,
}

fn map_admin_video(row: PgRow) -> AdminVideo {
    AdminVideo {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        description: row.get("description"),
        video_url: row.get("video_url"),
        category_id: row.get("category_id"),
        is_published: row.get("is_published"),
        is_featured: row.get("is_featured"),
        published_at: row.get("published_at"),
        updated_at: row.get("updated_at"),
        notification_sent_at: row.get("notification_sent_at"),
    }
}

impl AdminVideo {
    fn as_content_item(&self) -> ContentItem {
        ContentItem {
            id: self.id,
            kind: ContentKind::Video,
            title: self.title.clone(),
            slug: self.slug.clone(),
            excerpt: self.excerpt.clone(),
            is_published: self.is_published,
            notification_sent_at: self.notification_sent_at,
        }
    }
}

/// Every video, drafts included, newest first.
#[tracing::instrument(name = "List videos for the admin", skip(db_pool))]
pub async fn list_videos_admin(
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, ContentQueryError> {
    let videos = sqlx::query(
        r#"
        SELECT id, title, slug, excerpt, description, video_url, category_id,
               is_published, is_featured, published_at, updated_at, notification_sent_at
        FROM videos
        ORDER BY published_at DESC
        "#,
    )
    .map(map_admin_video)
    .fetch_all(db_pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(videos))
}

#[tracing::instrument(
    name = "Create a video",
    skip(body, db_pool, email_client, base_url, dispatch_mode),
    fields(title = %body.title, notify_subscribers = body.notify_subscribers)
)]
pub async fn create_video(
    body: web::Json<VideoBody>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseUrl>,
    dispatch_mode: web::Data<DispatchMode>,
) -> Result<HttpResponse, SaveContentError> {
    let body = body.into_inner();
    let slug =
        resolve_slug(&body.title, body.slug.clone()).map_err(SaveContentError::Validation)?;

    let video = insert_video(&db_pool, &body, &slug).await?;

    let outcome = trigger::notify_on_save(
        db_pool.get_ref(),
        email_client.get_ref(),
        &base_url.0,
        *dispatch_mode.get_ref(),
        &video.as_content_item(),
        body.notify_subscribers,
    )
    .await;

    Ok(HttpResponse::Created().json(AdminVideoResponse {
        video,
        notification: outcome.as_str(),
    }))
}

#[tracing::instrument(
    name = "Update a video",
    skip(body, db_pool, email_client, base_url, dispatch_mode),
    fields(video_id = %id, notify_subscribers = body.notify_subscribers)
)]
pub async fn update_video(
    id: web::Path<Uuid>,
    body: web::Json<VideoBody>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseUrl>,
    dispatch_mode: web::Data<DispatchMode>,
) -> Result<HttpResponse, SaveContentError> {
    let body = body.into_inner();
    let slug =
        resolve_slug(&body.title, body.slug.clone()).map_err(SaveContentError::Validation)?;

    let video = update_video_row(&db_pool, *id, &body, &slug)
        .await?
        .ok_or(SaveContentError::NotFound)?;

    let outcome = trigger::notify_on_save(
        db_pool.get_ref(),
        email_client.get_ref(),
        &base_url.0,
        *dispatch_mode.get_ref(),
        &video.as_content_item(),
        body.notify_subscribers,
    )
    .await;

    Ok(HttpResponse::Ok().json(AdminVideoResponse {
        video,
        notification: outcome.as_str(),
    }))
}

#[tracing::instrument(name = "Delete a video", skip(db_pool))]
pub async fn delete_video(
    id: web::Path<Uuid>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, SaveContentError> {
    let result = sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(*id)
        .execute(db_pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(SaveContentError::NotFound);
    }

    Ok(HttpResponse::NoContent().finish())
}

#[tracing::instrument(name = "Insert a new video into the database", skip(db_pool, body, slug))]
async fn insert_video(
    db_pool: &PgPool,
    body: &VideoBody,
    slug: &Slug,
) -> Result<AdminVideo, SaveContentError> {
    let now = Utc::now();

    let video = sqlx::query(
        r#"
        INSERT INTO videos (id, title, slug, excerpt, description, video_url, category_id,
                            is_published, is_featured, published_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING id, title, slug, excerpt, description, video_url, category_id,
                  is_published, is_featured, published_at, updated_at, notification_sent_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&body.title)
    .bind(slug.as_ref())
    .bind(&body.excerpt)
    .bind(&body.description)
    .bind(&body.video_url)
    .bind(body.category_id)
    .bind(body.is_published)
    .bind(body.is_featured)
    .bind(now)
    .map(map_admin_video)
    .fetch_one(db_pool)
    .await?;

    Ok(video)
}

/// `notification_sent_at` never appears in the SET list; the stamp survives
/// every edit, including unpublishing.
#[tracing::instrument(name = "Update a video in the database", skip(db_pool, body, slug))]
async fn update_video_row(
    db_pool: &PgPool,
    id: Uuid,
    body: &VideoBody,
    slug: &Slug,
) -> Result<Option<AdminVideo>, SaveContentError> {
    let video = sqlx::query(
        r#"
        UPDATE videos
        SET title = $1, slug = $2, excerpt = $3, description = $4, video_url = $5,
            category_id = $6, is_published = $7, is_featured = $8, updated_at = $9
        WHERE id = $10
        RETURNING id, title, slug, excerpt, description, video_url, category_id,
                  is_published, is_featured, published_at, updated_at, notification_sent_at
        "#,
    )
    .bind(&body.title)
    .bind(slug.as_ref())
    .bind(&body.excerpt)
    .bind(&body.description)
    .bind(&body.video_url)
    .bind(body.category_id)
    .bind(body.is_published)
    .bind(body.is_featured)
    .bind(Utc::now())
    .bind(id)
    .map(map_admin_video)
    .fetch_optional(db_pool)
    .await?;

    Ok(video)
}
