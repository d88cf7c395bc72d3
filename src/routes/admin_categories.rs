use actix_web::{web, HttpResponse};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::routes::{resolve_slug, SaveContentError};

#[derive(serde::Deserialize)]
pub struct CategoryBody {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(serde::Serialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[tracing::instrument(name = "Create a post category", skip(body, db_pool), fields(name = %body.name))]
pub async fn create_post_category(
    body: web::Json<CategoryBody>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, SaveContentError> {
    let category = insert_category(&db_pool, "post_categories", body.into_inner()).await?;

    Ok(HttpResponse::Created().json(category))
}

#[tracing::instrument(name = "Create a video category", skip(body, db_pool), fields(name = %body.name))]
pub async fn create_video_category(
    body: web::Json<CategoryBody>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, SaveContentError> {
    let category = insert_category(&db_pool, "video_categories", body.into_inner()).await?;

    Ok(HttpResponse::Created().json(category))
}

/// Post and video categories live in separate tables with the same shape.
/// `table` is one of two literals chosen by the handlers above.
async fn insert_category(
    db_pool: &PgPool,
    table: &'static str,
    body: CategoryBody,
) -> Result<Category, SaveContentError> {
    let slug = resolve_slug(&body.name, body.slug).map_err(SaveContentError::Validation)?;

    let query = format!(
        r#"
        INSERT INTO {} (id, name, slug, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, slug, description
        "#,
        table
    );

    let category = sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(&body.name)
        .bind(slug.as_ref())
        .bind(&body.description)
        .map(|row: PgRow| Category {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get("slug"),
            description: row.get("description"),
        })
        .fetch_one(db_pool)
        .await?;

    Ok(category)
}
