use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::domain::email_address::EmailAddress;
use crate::domain::subscriber::Subscriber;
use crate::email_client::EmailClient;

#[derive(serde::Deserialize)]
pub struct SubscriptionBody {
    pub email: String,
}

/// Public subscribe action. Idempotent: re-subscribing an existing address is
/// a success that changes nothing and sends no mail.
#[tracing::instrument(
    name = "Creating a new subscriber handler",
    skip(body, db_pool, email_client),
    fields(subscriber_email = %body.email)
)]
pub async fn handle_create_subscription(
    body: web::Json<SubscriptionBody>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
) -> impl Responder {
    let email = match EmailAddress::parse(body.email.clone()) {
        Ok(email) => email,
        Err(error) => {
            tracing::error!("Validation error: {:?}", error);
            return HttpResponse::BadRequest()
                .json(serde_json::json!({ "message": "Valid email required." }));
        }
    };

    let inserted = match create_subscription(&email, &db_pool).await {
        Ok(inserted) => inserted,
        Err(error) => {
            tracing::error!("Failed to insert new subscriber: {:?}", error);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "message": "Error. Try again." }));
        }
    };

    match inserted {
        Some(subscriber) => {
            // Best effort: the subscription already succeeded, a lost welcome
            // email does not undo it.
            if let Err(error) = send_welcome_email(&email_client, &subscriber.email).await {
                tracing::error!(
                    "Failed to send the welcome email to {}: {:?}",
                    subscriber.email,
                    error
                );
            }

            HttpResponse::Created().json(serde_json::json!({
                "message": "Subscription successful!"
            }))
        }
        None => HttpResponse::Ok().json(serde_json::json!({
            "message": "You are already subscribed!"
        })),
    }
}

/// Inserts the subscriber, active by default. Returns `None` when the address
/// was already registered.
#[tracing::instrument(name = "Insert a new subscriber into the database", skip(email, db_pool))]
async fn create_subscription(
    email: &EmailAddress,
    db_pool: &PgPool,
) -> Result<Option<Subscriber>, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO subscribers (id, email, is_active, subscribed_at)
        VALUES ($1, $2, true, $3)
        ON CONFLICT (email) DO NOTHING
        RETURNING id, is_active, subscribed_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email.as_ref())
    .bind(Utc::now())
    .map(|row: PgRow| Subscriber {
        id: row.get("id"),
        email: email.clone(),
        is_active: row.get("is_active"),
        subscribed_at: row.get("subscribed_at"),
    })
    .fetch_optional(db_pool)
    .await
    .map_err(|error| {
        tracing::error!("Failed to execute query: {:?}", error);
        error
    })
}

#[tracing::instrument(name = "Send a welcome email to a new subscriber", skip(email_client))]
async fn send_welcome_email(
    email_client: &EmailClient,
    recipient: &EmailAddress,
) -> Result<(), reqwest::Error> {
    email_client
        .send_email(
            recipient,
            "Subscription Successful!",
            "Thank you for subscribing. You will receive updates on new posts.",
        )
        .await
}
