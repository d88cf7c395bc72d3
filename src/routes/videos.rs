use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::routes::blog::PAGE_SIZE;
use crate::routes::{ContentQueryError, ListParams, Page};

#[derive(serde::Serialize)]
pub struct VideoSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub video_url: String,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub is_featured: bool,
    pub published_at: DateTime<Utc>,
}

#[derive(serde::Serialize)]
pub struct VideoDetail {
    #[serde(flatten)]
    pub video: VideoSummary,
    pub description: String,
    pub embed_url: String,
    pub related_videos: Vec<VideoSummary>,
}

fn map_video_summary(row: PgRow) -> VideoSummary {
    VideoSummary {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        video_url: row.get("video_url"),
        category_name: row.get("category_name"),
        category_slug: row.get("category_slug"),
        is_featured: row.get("is_featured"),
        published_at: row.get("published_at"),
    }
}

/// Rewrites YouTube watch/short links to the privacy-enhanced embed host.
/// Anything that is not recognizably YouTube passes through unchanged.
pub fn get_embed_url(video_url: &str) -> String {
    let url = video_url.trim();

    let video_id = if let Some(rest) = url.split("youtu.be/").nth(1) {
        rest.split(['?', '&']).next()
    } else if url.contains("youtube.com") {
        url.split("v=")
            .nth(1)
            .and_then(|rest| rest.split(['?', '&']).next())
    } else {
        None
    };

    match video_id {
        Some(id) if !id.is_empty() => format!("https://www.youtube-nocookie.com/embed/{}", id),
        _ => url.to_string(),
    }
}

/// Published videos, newest first, same paging and filters as the blog list.
/// A video without a category is only reachable without a category filter.
#[tracing::instrument(name = "List published videos", skip(params, db_pool))]
pub async fn list_videos(
    params: web::Query<ListParams>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, ContentQueryError> {
    let page = params.page.unwrap_or(1).max(1);
    let featured_only = params.featured.unwrap_or(false);

    let total_items: i64 = sqlx::query(
        r#"
        SELECT COUNT(*) AS total
        FROM videos v
        LEFT JOIN video_categories c ON c.id = v.category_id
        WHERE v.is_published = true
          AND ($1::text IS NULL OR c.slug = $1)
          AND (NOT $2 OR v.is_featured)
        "#,
    )
    .bind(params.category.as_deref())
    .bind(featured_only)
    .map(|row: PgRow| row.get("total"))
    .fetch_one(db_pool.get_ref())
    .await?;

    let items = sqlx::query(
        r#"
        SELECT v.id, v.title, v.slug, v.excerpt, v.video_url, v.is_featured, v.published_at,
               c.name AS category_name, c.slug AS category_slug
        FROM videos v
        LEFT JOIN video_categories c ON c.id = v.category_id
        WHERE v.is_published = true
          AND ($1::text IS NULL OR c.slug = $1)
          AND (NOT $2 OR v.is_featured)
        ORDER BY v.published_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(params.category.as_deref())
    .bind(featured_only)
    .bind(PAGE_SIZE)
    .bind((page - 1) * PAGE_SIZE)
    .map(map_video_summary)
    .fetch_all(db_pool.get_ref())
    .await?;

    let total_pages = (total_items + PAGE_SIZE - 1) / PAGE_SIZE;

    Ok(HttpResponse::Ok().json(Page {
        items,
        page,
        total_pages,
        total_items,
    }))
}

/// One published video by slug, with its embeddable player URL and up to 3
/// related videos from the same category (uncategorized videos relate to
/// other uncategorized ones).
#[tracing::instrument(name = "Get a published video", skip(db_pool))]
pub async fn get_video(
    slug: web::Path<String>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, ContentQueryError> {
    let row = sqlx::query(
        r#"
        SELECT v.id, v.title, v.slug, v.excerpt, v.video_url, v.description,
               v.is_featured, v.published_at,
               c.name AS category_name, c.slug AS category_slug
        FROM videos v
        LEFT JOIN video_categories c ON c.id = v.category_id
        WHERE v.is_published = true AND v.slug = $1
        "#,
    )
    .bind(slug.as_str())
    .map(|row: PgRow| {
        let description: String = row.get("description");
        (map_video_summary(row), description)
    })
    .fetch_optional(db_pool.get_ref())
    .await?;

    let (video, description) = match row {
        Some(found) => found,
        None => return Ok(HttpResponse::NotFound().finish()),
    };

    let related_videos = sqlx::query(
        r#"
        SELECT v.id, v.title, v.slug, v.excerpt, v.video_url, v.is_featured, v.published_at,
               c.name AS category_name, c.slug AS category_slug
        FROM videos v
        LEFT JOIN video_categories c ON c.id = v.category_id
        WHERE v.is_published = true
          AND c.slug IS NOT DISTINCT FROM $1
          AND v.id <> $2
        ORDER BY v.published_at DESC
        LIMIT 3
        "#,
    )
    .bind(video.category_slug.as_deref())
    .bind(video.id)
    .map(map_video_summary)
    .fetch_all(db_pool.get_ref())
    .await?;

    let embed_url = get_embed_url(&video.video_url);

    Ok(HttpResponse::Ok().json(VideoDetail {
        video,
        description,
        embed_url,
        related_videos,
    }))
}
