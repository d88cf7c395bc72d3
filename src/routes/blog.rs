use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::routes::{ContentQueryError, ListParams, Page};

pub const PAGE_SIZE: i64 = 9;

#[derive(serde::Serialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub category_name: String,
    pub category_slug: String,
    pub is_featured: bool,
    pub published_at: DateTime<Utc>,
}

#[derive(serde::Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostSummary,
    pub related_posts: Vec<PostSummary>,
}

fn map_post_summary(row: PgRow) -> PostSummary {
    PostSummary {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        category_name: row.get("category_name"),
        category_slug: row.get("category_slug"),
        is_featured: row.get("is_featured"),
        published_at: row.get("published_at"),
    }
}

/// Published posts, newest first, 9 per page. `category` filters by category
/// slug; `featured=true` narrows to featured posts, `featured=false` is a
/// no-op.
#[tracing::instrument(name = "List published posts", skip(params, db_pool))]
pub async fn list_posts(
    params: web::Query<ListParams>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, ContentQueryError> {
    let page = params.page.unwrap_or(1).max(1);
    let featured_only = params.featured.unwrap_or(false);

    let total_items: i64 = sqlx::query(
        r#"
        SELECT COUNT(*) AS total
        FROM posts p
        JOIN post_categories c ON c.id = p.category_id
        WHERE p.is_published = true
          AND ($1::text IS NULL OR c.slug = $1)
          AND (NOT $2 OR p.is_featured)
        "#,
    )
    .bind(params.category.as_deref())
    .bind(featured_only)
    .map(|row: PgRow| row.get("total"))
    .fetch_one(db_pool.get_ref())
    .await?;

    let items = sqlx::query(
        r#"
        SELECT p.id, p.title, p.slug, p.excerpt, p.is_featured, p.published_at,
               c.name AS category_name, c.slug AS category_slug
        FROM posts p
        JOIN post_categories c ON c.id = p.category_id
        WHERE p.is_published = true
          AND ($1::text IS NULL OR c.slug = $1)
          AND (NOT $2 OR p.is_featured)
        ORDER BY p.published_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(params.category.as_deref())
    .bind(featured_only)
    .bind(PAGE_SIZE)
    .bind((page - 1) * PAGE_SIZE)
    .map(map_post_summary)
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

/// One published post by slug, with up to 3 related posts from the same
/// category. Unpublished posts are indistinguishable from missing ones.
#[tracing::instrument(name = "Get a published post", skip(db_pool))]
pub async fn get_post(
    slug: web::Path<String>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, ContentQueryError> {
    let post = sqlx::query(
        r#"
        SELECT p.id, p.title, p.slug, p.excerpt, p.is_featured, p.published_at,
               c.name AS category_name, c.slug AS category_slug
        FROM posts p
        JOIN post_categories c ON c.id = p.category_id
        WHERE p.is_published = true AND p.slug = $1
        "#,
    )
    .bind(slug.as_str())
    .map(map_post_summary)
    .fetch_optional(db_pool.get_ref())
    .await?;

    let post = match post {
        Some(post) => post,
        None => return Ok(HttpResponse::NotFound().finish()),
    };

    let related_posts = sqlx::query(
        r#"
        SELECT p.id, p.title, p.slug, p.excerpt, p.is_featured, p.published_at,
               c.name AS category_name, c.slug AS category_slug
        FROM posts p
        JOIN post_categories c ON c.id = p.category_id
        WHERE p.is_published = true AND c.slug = $1 AND p.id <> $2
        ORDER BY p.published_at DESC
        LIMIT 3
        "#,
    )
    .bind(&post.category_slug)
    .bind(post.id)
    .map(map_post_summary)
    .fetch_all(db_pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(PostDetail {
        post,
        related_posts,
    }))
}
