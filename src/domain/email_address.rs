use validator::validate_email;

/// A syntactically valid email address. Every address the service touches
/// (subscribers, the configured sender, the no-reply placeholder, contact
/// senders) goes through `parse` before it is stored or put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(address: String) -> Result<EmailAddress, String> {
        if !validate_email(&address) {
            return Err(format!("{} is not a valid email address", address));
        }

        Ok(Self(address))
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
