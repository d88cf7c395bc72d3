use actix_web::{web, HttpResponse};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::domain::email_address::EmailAddress;
use crate::domain::subscriber::Subscriber;
use crate::routes::{ContentQueryError, SaveContentError};

#[derive(serde::Deserialize)]
pub struct SubscriberUpdateBody {
    pub is_active: bool,
}

fn map_subscriber(row: PgRow) -> Option<Subscriber> {
    let email: String = row.get("email");

    match EmailAddress::parse(email) {
        Ok(email) => Some(Subscriber {
            id: row.get("id"),
            email,
            is_active: row.get("is_active"),
            subscribed_at: row.get("subscribed_at"),
        }),
        Err(error) => {
            tracing::warn!("Skipping a subscriber whose stored address is invalid: {}", error);
            None
        }
    }
}

/// The full subscriber registry, newest first, for the operator.
#[tracing::instrument(name = "List subscribers for the admin", skip(db_pool))]
pub async fn list_subscribers(
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, ContentQueryError> {
    let subscribers: Vec<Subscriber> = sqlx::query(
        r#"
        SELECT id, email, is_active, subscribed_at
        FROM subscribers
        ORDER BY subscribed_at DESC
        "#,
    )
    .map(map_subscriber)
    .fetch_all(db_pool.get_ref())
    .await?
    .into_iter()
    .flatten()
    .collect();

    Ok(HttpResponse::Ok().json(subscribers))
}

/// Activates or deactivates a subscriber. The only subscriber mutation
/// besides the public subscribe; rows are never deleted here.
#[tracing::instrument(
    name = "Update a subscriber's active flag",
    skip(body, db_pool),
    fields(subscriber_id = %id, is_active = body.is_active)
)]
pub async fn update_subscriber(
    id: web::Path<Uuid>,
    body: web::Json<SubscriberUpdateBody>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, SaveContentError> {
    let subscriber = sqlx::query(
        r#"
        UPDATE subscribers
        SET is_active = $1
        WHERE id = $2
        RETURNING id, email, is_active, subscribed_at
        "#,
    )
    .bind(body.is_active)
    .bind(*id)
    .map(map_subscriber)
    .fetch_optional(db_pool.get_ref())
    .await?
    .flatten()
    .ok_or(SaveContentError::NotFound)?;

    Ok(HttpResponse::Ok().json(subscriber))
}
