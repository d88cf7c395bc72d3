use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::email_address::EmailAddress;

/// A row in the subscriber registry. Subscribers are created through the
/// public subscribe action, toggled active/inactive by the operator, and
/// never deleted by the notification subsystem.
#[derive(Debug, serde::Serialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: EmailAddress,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
}
