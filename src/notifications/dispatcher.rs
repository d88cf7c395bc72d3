use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::content::{ContentItem, ContentKind};
use crate::domain::email_address::EmailAddress;
use crate::email_client::EmailClient;
use crate::routes::error_chain_fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// One broadcast went out to this many blind-copied subscribers.
    Sent { recipients: usize },
    /// The item was already stamped — by an earlier dispatch or by a
    /// concurrent one that won the claim. Nothing was sent.
    AlreadySent,
    /// The item was stamped but nobody is subscribed. Nothing was sent.
    NoRecipients,
}

#[derive(thiserror::Error)]
pub enum DispatchError {
    #[error("{kind} {id} does not exist")]
    ItemNotFound { kind: ContentKind, id: Uuid },
    #[error("Failed to deliver the notification email.")]
    DeliveryFailed(#[source] reqwest::Error),
    #[error("Database error while dispatching a notification.")]
    Storage(#[from] sqlx::Error),
}

impl DispatchError {
    /// Whether a queued dispatch is worth another attempt. A vanished item
    /// never comes back; transport and database hiccups might.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DispatchError::ItemNotFound { .. })
    }
}

impl std::fmt::Debug for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Sends the one-time publish notification for a content item, if it is due.
///
/// Guard order: load, idempotency check, atomic claim, recipients, compose,
/// send. The claim (a conditional `UPDATE ... WHERE notification_sent_at IS
/// NULL`) happens before any mail goes out: of any number of concurrent
/// dispatchers exactly one sees the row change, and a retry after a failed
/// send finds the stamp in place and stops. The flip side is that
/// `notification_sent_at` records an *attempt* — a transport failure right
/// after the claim leaves the item stamped but the email undelivered, and
/// resending is a deliberate operator action, not something this function
/// will ever do on its own.
#[tracing::instrument(
    name = "Dispatch a publish notification",
    skip(pool, email_client, base_url),
    fields(kind = %kind, item_id = %item_id)
)]
pub async fn dispatch(
    pool: &PgPool,
    email_client: &EmailClient,
    base_url: &str,
    kind: ContentKind,
    item_id: Uuid,
) -> Result<DispatchOutcome, DispatchError> {
    let item = get_content_item(pool, kind, item_id)
        .await?
        .ok_or(DispatchError::ItemNotFound { kind, id: item_id })?;

    if item.notification_sent_at.is_some() {
        tracing::info!(
            "Notification for {} '{}' was already sent.",
            kind,
            item.title
        );
        return Ok(DispatchOutcome::AlreadySent);
    }

    if !claim_notification(pool, kind, item_id).await? {
        tracing::info!(
            "Lost the notification claim for {} '{}' to a concurrent dispatch.",
            kind,
            item.title
        );
        return Ok(DispatchOutcome::AlreadySent);
    }

    let recipients = get_active_recipients(pool).await?;

    if recipients.is_empty() {
        tracing::info!(
            "No active subscribers to notify about {} '{}'.",
            kind,
            item.title
        );
        return Ok(DispatchOutcome::NoRecipients);
    }

    let subject = item.notification_subject();
    let body = item.notification_body(base_url);

    email_client
        .send_broadcast(&recipients, &subject, &body)
        .await
        .map_err(DispatchError::DeliveryFailed)?;

    tracing::info!(
        "Sent notification for {} '{}' to {} subscribers.",
        kind,
        item.title,
        recipients.len()
    );

    Ok(DispatchOutcome::Sent {
        recipients: recipients.len(),
    })
}

#[tracing::instrument(name = "Load a content item", skip(pool))]
pub async fn get_content_item(
    pool: &PgPool,
    kind: ContentKind,
    item_id: Uuid,
) -> Result<Option<ContentItem>, sqlx::Error> {
    // The table name comes from the ContentKind enum, never from input.
    let query = format!(
        r#"
        SELECT id, title, slug, excerpt, is_published, notification_sent_at
        FROM {}
        WHERE id = $1
        "#,
        kind.table()
    );

    sqlx::query(&query)
        .bind(item_id)
        .map(|row: PgRow| ContentItem {
            id: row.get("id"),
            kind,
            title: row.get("title"),
            slug: row.get("slug"),
            excerpt: row.get("excerpt"),
            is_published: row.get("is_published"),
            notification_sent_at: row.get("notification_sent_at"),
        })
        .fetch_optional(pool)
        .await
}

/// The serialization point for concurrent dispatches: a single conditional
/// update, not a read followed by a write. Returns whether this caller won
/// the claim. Once set, the stamp is never cleared or overwritten.
#[tracing::instrument(name = "Claim the notification stamp", skip(pool))]
async fn claim_notification(
    pool: &PgPool,
    kind: ContentKind,
    item_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let query = format!(
        r#"
        UPDATE {}
        SET notification_sent_at = $1
        WHERE id = $2 AND notification_sent_at IS NULL
        "#,
        kind.table()
    );

    let result = sqlx::query(&query)
        .bind(Utc::now())
        .bind(item_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Exactly the addresses of active subscribers. A stored address that no
/// longer parses is skipped with a warning instead of sinking the dispatch.
#[tracing::instrument(name = "Get active subscriber addresses", skip(pool))]
pub async fn get_active_recipients(pool: &PgPool) -> Result<Vec<EmailAddress>, sqlx::Error> {
    let rows: Vec<String> = sqlx::query(
        r#"
        SELECT email
        FROM subscribers
        WHERE is_active = true
        "#,
    )
    .map(|row: PgRow| row.get("email"))
    .fetch_all(pool)
    .await?;

    let recipients = rows
        .into_iter()
        .filter_map(|email| match EmailAddress::parse(email) {
            Ok(address) => Some(address),
            Err(error) => {
                tracing::warn!(
                    "Skipping a subscriber whose stored address is invalid: {}",
                    error
                );
                None
            }
        })
        .collect();

    Ok(recipients)
}
