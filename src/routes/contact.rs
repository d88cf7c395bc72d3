use actix_web::{web, HttpResponse, ResponseError};
use reqwest::StatusCode;

use crate::domain::contact::{ContactBody, ContactMessage};
use crate::email_client::EmailClient;
use crate::routes::error_chain_fmt;
use crate::startup::ContactRecipient;

#[derive(thiserror::Error)]
pub enum ContactError {
    #[error("Please fill in all required fields.")]
    Validation(#[source] ValidationFailure),
    #[error("Error sending message. Try again later.")]
    RelayFailed(#[source] reqwest::Error),
}

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct ValidationFailure(String);

impl std::fmt::Debug for ContactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ContactError {
    fn status_code(&self) -> StatusCode {
        match self {
            ContactError::Validation(_) => StatusCode::BAD_REQUEST,
            ContactError::RelayFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        tracing::error!("{:?}", self);

        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "message": self.to_string() }))
    }
}

/// Relays a contact-form submission to the configured site-owner address.
/// Unlike the notification paths, a transport failure here is the failure of
/// the request: relaying the message is this endpoint's whole job.
#[tracing::instrument(
    name = "Relay a contact message",
    skip(body, email_client, recipient),
    fields(sender_email = %body.email)
)]
pub async fn handle_contact_message(
    body: web::Json<ContactBody>,
    email_client: web::Data<EmailClient>,
    recipient: web::Data<ContactRecipient>,
) -> Result<HttpResponse, ContactError> {
    let message: ContactMessage = body
        .into_inner()
        .try_into()
        .map_err(|error| ContactError::Validation(ValidationFailure(error)))?;

    let subject = format!("New Contact Form Submission from {}", message.name.as_ref());
    let text_body = format!(
        "Name: {}\nEmail: {}\n\nMessage:\n{}",
        message.name.as_ref(),
        message.email,
        message.message
    );

    email_client
        .send_email(&recipient.0, &subject, &text_body)
        .await
        .map_err(ContactError::RelayFailed)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Your message has been sent successfully."
    })))
}
