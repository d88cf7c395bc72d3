use serde::Deserialize;
use unicode_segmentation::UnicodeSegmentation;

use crate::domain::email_address::EmailAddress;

const MAX_NAME_LENGTH: usize = 256;
// The name is interpolated into the relayed email's subject line, so keep
// markup and header-ish characters out of it.
const FORBIDDEN_NAME_CHARS: [char; 11] = [
    '/', '{', '}', '"', '>', '<', '\\', '(', ')', '\r', '\n',
];

#[derive(Debug)]
pub struct ContactName(String);

impl ContactName {
    pub fn parse(name: String) -> Result<ContactName, String> {
        let name = name.trim().to_string();
        let is_too_long = name.graphemes(true).count() > MAX_NAME_LENGTH;
        let contains_forbidden_chars = name
            .chars()
            .any(|char| FORBIDDEN_NAME_CHARS.contains(&char));

        if name.is_empty() || is_too_long || contains_forbidden_chars {
            return Err(format!("{} is not a valid contact name", name));
        }

        Ok(Self(name))
    }
}

impl AsRef<str> for ContactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated contact-form submission, ready to be relayed to the site
/// owner. Never persisted.
#[derive(Debug)]
pub struct ContactMessage {
    pub name: ContactName,
    pub email: EmailAddress,
    pub message: String,
}

#[derive(Deserialize)]
pub struct ContactBody {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl TryFrom<ContactBody> for ContactMessage {
    type Error = String;

    fn try_from(body: ContactBody) -> Result<Self, Self::Error> {
        let name = ContactName::parse(body.name)?;
        let email = EmailAddress::parse(body.email)?;
        let message = body.message.trim().to_string();

        if message.is_empty() {
            return Err("message cannot be empty".to_string());
        }

        Ok(ContactMessage {
            name,
            email,
            message,
        })
    }
}
