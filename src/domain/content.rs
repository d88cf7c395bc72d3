use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The two publishable content types. They live in separate tables but are
/// structurally identical as far as notifications are concerned, so a single
/// dispatcher handles both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Post,
    Video,
}

impl ContentKind {
    pub fn parse(kind: &str) -> Result<ContentKind, String> {
        match kind {
            "post" => Ok(ContentKind::Post),
            "video" => Ok(ContentKind::Video),
            other => Err(format!("{} is not a valid content kind", other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Video => "video",
        }
    }

    /// Name of the table holding this kind. Only ever interpolated into SQL
    /// from this enum, never from user input.
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Post => "posts",
            ContentKind::Video => "videos",
        }
    }

    pub fn canonical_path(&self, slug: &str) -> String {
        match self {
            ContentKind::Post => format!("/blog/{}", slug),
            ContentKind::Video => format!("/videos/{}", slug),
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The notification subsystem's view of a post or video: exactly the fields
/// needed to decide whether to notify and to compose the email.
#[derive(Debug)]
pub struct ContentItem {
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub is_published: bool,
    pub notification_sent_at: Option<DateTime<Utc>>,
}

impl ContentItem {
    pub fn canonical_path(&self) -> String {
        self.kind.canonical_path(&self.slug)
    }

    pub fn canonical_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url, self.canonical_path())
    }

    pub fn notification_subject(&self) -> String {
        match self.kind {
            ContentKind::Post => format!("New Blog Post: {}", self.title),
            ContentKind::Video => format!("New Video Published: {}", self.title),
        }
    }

    /// Plain-text notification body. Built only from item fields and the
    /// configured base URL so that retries compose the identical message.
    pub fn notification_body(&self, base_url: &str) -> String {
        let url = self.canonical_url(base_url);

        match self.kind {
            ContentKind::Post => format!(
                "Hi there!\n\nA new post \"{}\" has been published.\n\n\
                 Read it here: {}\n\n\
                 Read the excerpt:\n{}\n\nStay tuned!",
                self.title, url, self.excerpt
            ),
            ContentKind::Video => format!(
                "Hi there!\n\nA new video \"{}\" has been published.\n\n\
                 Watch it here: {}\n\n\
                 About the video:\n{}\n\nStay tuned!",
                self.title, url, self.excerpt
            ),
        }
    }
}
