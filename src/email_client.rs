use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::email_address::EmailAddress;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// Client for the SendGrid-style `/mail/send` HTTP API. `sender` is the
/// `from` address on every message; `noreply` is the placeholder primary
/// recipient used by broadcasts so that real subscriber addresses only ever
/// travel as blind copies.
#[derive(Clone)]
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: EmailAddress,
    noreply: EmailAddress,
    api_key: Secret<String>,
}

#[derive(serde::Serialize)]
struct SendEmailBody<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<MailContent<'a>>,
}

#[derive(serde::Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bcc: Option<Vec<Address<'a>>>,
}

#[derive(serde::Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(serde::Serialize)]
struct MailContent<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: EmailAddress,
        noreply: EmailAddress,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> EmailClient {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()
            .unwrap();

        EmailClient {
            http_client,
            base_url,
            sender,
            noreply,
            api_key,
        }
    }

    /// Sends a plain-text message to a single recipient.
    pub async fn send_email(
        &self,
        recipient: &EmailAddress,
        subject: &str,
        text_body: &str,
    ) -> Result<(), reqwest::Error> {
        let body = SendEmailBody {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: recipient.as_ref(),
                }],
                bcc: None,
            }],
            from: Address {
                email: self.sender.as_ref(),
            },
            subject,
            content: vec![MailContent {
                content_type: "text/plain",
                value: text_body,
            }],
        };

        self.post_mail(&body).await
    }

    /// Sends one plain-text message to many recipients as blind copies, with
    /// the no-reply placeholder in the `to` field. Recipient addresses are
    /// never visible to each other.
    pub async fn send_broadcast(
        &self,
        bcc: &[EmailAddress],
        subject: &str,
        text_body: &str,
    ) -> Result<(), reqwest::Error> {
        let bcc = bcc
            .iter()
            .map(|address| Address {
                email: address.as_ref(),
            })
            .collect();
        let body = SendEmailBody {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: self.noreply.as_ref(),
                }],
                bcc: Some(bcc),
            }],
            from: Address {
                email: self.sender.as_ref(),
            },
            subject,
            content: vec![MailContent {
                content_type: "text/plain",
                value: text_body,
            }],
        };

        self.post_mail(&body).await
    }

    async fn post_mail(&self, body: &SendEmailBody<'_>) -> Result<(), reqwest::Error> {
        let url = format!("{}/mail/send", self.base_url);

        self.http_client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(body)
            .send()
            .await?
            .error_for_status()?; // return an error when server response status code is 4xx or 5xx

        Ok(())
    }
}
