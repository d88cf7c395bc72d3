use sqlx::PgPool;

use crate::domain::content::ContentItem;
use crate::email_client::EmailClient;
use crate::notifications::dispatcher::{self, DispatchOutcome};
use crate::notifications::queue::{self, NotificationJob};

/// How a save-time notification request reaches the dispatcher: pushed onto
/// the durable queue for the background worker, or run inside the save
/// request itself. Both paths share the dispatcher's idempotency guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Inline,
    Queued,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Inline => "inline",
            DispatchMode::Queued => "queued",
        }
    }
}

impl TryFrom<String> for DispatchMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "queued" => Ok(Self::Queued),
            unknown_mode => Err(format!(
                "{} is not a supported dispatch mode. Use either 'inline' or 'queued'.",
                unknown_mode
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotRequested,
    Unpublished,
    AlreadyNotified,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TriggerOutcome {
    Queued,
    Dispatched(DispatchOutcome),
    DispatchFailed,
    Skipped(SkipReason),
}

impl TriggerOutcome {
    /// Label reported back in the admin save response. By the time this is
    /// computed the save itself has already succeeded.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerOutcome::Queued => "queued",
            TriggerOutcome::Dispatched(DispatchOutcome::Sent { .. }) => "sent",
            TriggerOutcome::Dispatched(DispatchOutcome::NoRecipients) => "no_recipients",
            TriggerOutcome::Dispatched(DispatchOutcome::AlreadySent) => "skipped",
            TriggerOutcome::Skipped(_) => "skipped",
            TriggerOutcome::DispatchFailed => "failed",
        }
    }
}

/// Runs after a content item has been durably saved. Decides whether the
/// operator's "send to subscribers" request should do anything and, if so,
/// hands it to the dispatcher per the configured mode. Never fails the save:
/// content persistence and notification delivery are independent outcomes.
#[tracing::instrument(
    name = "Notification trigger on content save",
    skip(pool, email_client, base_url, item),
    fields(
        kind = %item.kind,
        item_id = %item.id,
        title = %item.title,
        notify_requested = notify_requested,
    )
)]
pub async fn notify_on_save(
    pool: &PgPool,
    email_client: &EmailClient,
    base_url: &str,
    mode: DispatchMode,
    item: &ContentItem,
    notify_requested: bool,
) -> TriggerOutcome {
    if !notify_requested {
        return TriggerOutcome::Skipped(SkipReason::NotRequested);
    }

    if !item.is_published {
        tracing::info!("Skipping notification: the item is not published.");
        return TriggerOutcome::Skipped(SkipReason::Unpublished);
    }

    if item.notification_sent_at.is_some() {
        // The operator asked again for an item that was already notified;
        // ignored, per the at-most-once contract.
        tracing::info!("Skipping notification: one was already sent.");
        return TriggerOutcome::Skipped(SkipReason::AlreadyNotified);
    }

    match mode {
        DispatchMode::Queued => {
            let job = NotificationJob {
                kind: item.kind,
                item_id: item.id,
            };

            match queue::enqueue(pool, &job).await {
                Ok(()) => TriggerOutcome::Queued,
                Err(error) => {
                    tracing::error!("Failed to enqueue a notification job: {:?}", error);
                    TriggerOutcome::DispatchFailed
                }
            }
        }
        DispatchMode::Inline => {
            match dispatcher::dispatch(pool, email_client, base_url, item.kind, item.id).await {
                Ok(outcome) => TriggerOutcome::Dispatched(outcome),
                Err(error) => {
                    tracing::error!("Inline notification dispatch failed: {:?}", error);
                    TriggerOutcome::DispatchFailed
                }
            }
        }
    }
}
