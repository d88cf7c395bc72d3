use sqlx::PgPool;
use std::time::Duration;

use crate::config::Settings;
use crate::email_client::EmailClient;
use crate::notifications::dispatcher;
use crate::notifications::queue;
use crate::startup::{get_connection_db_pool, get_email_client};

const BASE_RETRY_DELAY: Duration = Duration::from_secs(30);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

#[derive(Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    TaskCompleted,
    EmptyQueue,
}

/// Long-lived queue consumer, run beside the HTTP server. Builds its own pool
/// and email client so the worker and the server do not share connections.
pub async fn run_worker_until_stopped(config: Settings) -> std::io::Result<()> {
    let db_pool = get_connection_db_pool(&config.database);
    let email_client = get_email_client(&config);
    let base_url = config.get_app_base_url();
    let max_attempts = config.notification.max_attempts;
    let poll_interval = Duration::from_secs(config.notification.worker_poll_seconds);

    worker_loop(db_pool, email_client, base_url, max_attempts, poll_interval).await
}

async fn worker_loop(
    db_pool: PgPool,
    email_client: EmailClient,
    base_url: String,
    max_attempts: i32,
    poll_interval: Duration,
) -> std::io::Result<()> {
    loop {
        match try_execute_task(&db_pool, &email_client, &base_url, max_attempts).await {
            Ok(ExecutionOutcome::EmptyQueue) => tokio::time::sleep(poll_interval).await,
            Ok(ExecutionOutcome::TaskCompleted) => {}
            Err(error) => {
                tracing::error!("Failed to poll the notification queue: {:?}", error);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Claims one due job and resolves it. Dispatch outcomes (including
/// `AlreadySent` after an earlier failed attempt) complete the job; a
/// retryable error re-schedules it with backoff until the attempt budget runs
/// out; a terminal error drops it.
#[tracing::instrument(name = "Execute a queued notification job", skip_all)]
pub async fn try_execute_task(
    pool: &PgPool,
    email_client: &EmailClient,
    base_url: &str,
    max_attempts: i32,
) -> Result<ExecutionOutcome, sqlx::Error> {
    let (mut transaction, claimed) = match queue::claim_due_job(pool).await? {
        Some(claimed) => claimed,
        None => return Ok(ExecutionOutcome::EmptyQueue),
    };
    let job = claimed.job;

    match dispatcher::dispatch(pool, email_client, base_url, job.kind, job.item_id).await {
        Ok(outcome) => {
            tracing::info!("Notification job completed: {:?}", outcome);
            queue::delete_job(&mut transaction, &job).await?;
        }
        Err(error) if !error.is_retryable() => {
            tracing::warn!(
                "Dropping a notification job that can never succeed: {:?}",
                error
            );
            queue::delete_job(&mut transaction, &job).await?;
        }
        Err(error) => {
            let attempts = claimed.attempts + 1;

            if attempts >= max_attempts {
                tracing::error!(
                    "Notification job for {} {} failed permanently after {} attempts: {:?}",
                    job.kind,
                    job.item_id,
                    attempts,
                    error
                );
                queue::delete_job(&mut transaction, &job).await?;
            } else {
                tracing::warn!(
                    "Notification job for {} {} failed (attempt {}), will retry: {:?}",
                    job.kind,
                    job.item_id,
                    attempts,
                    error
                );
                queue::schedule_retry(&mut transaction, &job, retry_delay(claimed.attempts)).await?;
            }
        }
    }

    transaction.commit().await?;

    Ok(ExecutionOutcome::TaskCompleted)
}

/// Exponential backoff: 30s doubled per completed attempt, capped at one hour.
pub fn retry_delay(attempts: i32) -> Duration {
    let exponent = attempts.clamp(0, 7) as u32;

    std::cmp::min(BASE_RETRY_DELAY * 2u32.pow(exponent), MAX_RETRY_DELAY)
}
