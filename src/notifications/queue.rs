use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::content::ContentKind;

pub type PgTransaction = Transaction<'static, Postgres>;

/// A pending request to notify subscribers about one content item. Lives as a
/// row in `notification_queue` until the worker resolves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationJob {
    pub kind: ContentKind,
    pub item_id: Uuid,
}

/// A job the worker has exclusively claimed, together with how many times it
/// has already been attempted.
#[derive(Debug)]
pub struct ClaimedJob {
    pub job: NotificationJob,
    pub attempts: i32,
}

/// Inserts a job, due immediately. The primary key is `(item_kind, item_id)`,
/// so enqueueing the same item twice is a no-op.
#[tracing::instrument(
    name = "Enqueue a notification job",
    skip(pool),
    fields(kind = %job.kind, item_id = %job.item_id)
)]
pub async fn enqueue(pool: &PgPool, job: &NotificationJob) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notification_queue (item_kind, item_id, attempts, enqueued_at, next_attempt_at)
        VALUES ($1, $2, 0, $3, $3)
        ON CONFLICT (item_kind, item_id) DO NOTHING
        "#,
    )
    .bind(job.kind.as_str())
    .bind(job.item_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Claims the oldest due job, keeping it locked for the lifetime of the
/// returned transaction. `FOR UPDATE SKIP LOCKED` lets concurrent workers
/// claim different jobs instead of queueing up behind the same row.
pub async fn claim_due_job(
    pool: &PgPool,
) -> Result<Option<(PgTransaction, ClaimedJob)>, sqlx::Error> {
    let mut transaction = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT item_kind, item_id, attempts
        FROM notification_queue
        WHERE next_attempt_at <= now()
        ORDER BY enqueued_at
        LIMIT 1
        FOR UPDATE
        SKIP LOCKED
        "#,
    )
    .fetch_optional(&mut transaction)
    .await?;

    let row: PgRow = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    // Rows are only ever written through `enqueue`, which serializes the kind
    // from the enum; a parse failure here means the table was corrupted.
    let kind_label: String = row.get("item_kind");
    let kind = ContentKind::parse(&kind_label).map_err(|error| sqlx::Error::Decode(error.into()))?;

    let claimed = ClaimedJob {
        job: NotificationJob {
            kind,
            item_id: row.get("item_id"),
        },
        attempts: row.get("attempts"),
    };

    Ok(Some((transaction, claimed)))
}

/// Removes a finished job. Used on success and on terminal failure alike.
pub async fn delete_job(
    transaction: &mut PgTransaction,
    job: &NotificationJob,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        DELETE FROM notification_queue
        WHERE item_kind = $1 AND item_id = $2
        "#,
    )
    .bind(job.kind.as_str())
    .bind(job.item_id)
    .execute(transaction)
    .await?;

    Ok(())
}

/// Records a failed attempt and pushes the job's due time into the future.
pub async fn schedule_retry(
    transaction: &mut PgTransaction,
    job: &NotificationJob,
    delay: std::time::Duration,
) -> Result<(), sqlx::Error> {
    let next_attempt_at = Utc::now() + chrono::Duration::seconds(delay.as_secs() as i64);

    sqlx::query(
        r#"
        UPDATE notification_queue
        SET attempts = attempts + 1, next_attempt_at = $1
        WHERE item_kind = $2 AND item_id = $3
        "#,
    )
    .bind(next_attempt_at)
    .bind(job.kind.as_str())
    .bind(job.item_id)
    .execute(transaction)
    .await?;

    Ok(())
}
