mod admin_categories;
mod admin_posts;
mod admin_subscribers;
mod admin_videos;
mod blog;
mod contact;
mod health_check;
mod subscriptions;
mod videos;

pub use admin_categories::*;
pub use admin_posts::*;
pub use admin_subscribers::*;
pub use admin_videos::*;
pub use blog::*;
pub use contact::*;
pub use health_check::*;
pub use subscriptions::*;
pub use videos::*;

use actix_web::{HttpResponse, ResponseError};
use reqwest::StatusCode;

use crate::domain::slug::Slug;

/// Query parameters shared by the public list endpoints.
#[derive(serde::Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub category: Option<String>,
    pub featured: Option<bool>,
}

/// One page of a public listing.
#[derive(serde::Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub total_pages: i64,
    pub total_items: i64,
}

/// Walks the source chain so that `{:?}` on a route error shows every cause,
/// not only the outermost message.
pub fn error_chain_fmt(
    error: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", error)?;

    let mut current = error.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }

    Ok(())
}

// Content is live by default, matching the public site's behavior.
pub(crate) fn default_true() -> bool {
    true
}

/// Uses the client's slug when one was provided, otherwise derives one from
/// the title.
pub(crate) fn resolve_slug(title: &str, provided: Option<String>) -> Result<Slug, String> {
    match provided {
        Some(slug) => Slug::parse(slug),
        None => Slug::generate(title),
    }
}

/// Failures of the admin write endpoints. Postgres constraint violations are
/// translated into their HTTP meanings instead of a blanket 500.
#[derive(thiserror::Error)]
pub enum SaveContentError {
    #[error("{0}")]
    Validation(String),
    #[error("An item with this slug already exists.")]
    DuplicateSlug,
    #[error("The referenced category does not exist.")]
    UnknownCategory,
    #[error("The item does not exist.")]
    NotFound,
    #[error("Database error while saving content.")]
    Storage(#[source] sqlx::Error),
}

impl std::fmt::Debug for SaveContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<sqlx::Error> for SaveContentError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            match db_error.code().as_deref() {
                // unique_violation: the only unique columns we write are slugs
                // and the subscriber email.
                Some("23505") => return SaveContentError::DuplicateSlug,
                // foreign_key_violation: a category id that does not exist.
                Some("23503") => return SaveContentError::UnknownCategory,
                _ => {}
            }
        }

        SaveContentError::Storage(error)
    }
}

impl ResponseError for SaveContentError {
    fn status_code(&self) -> StatusCode {
        match self {
            SaveContentError::Validation(_) => StatusCode::BAD_REQUEST,
            SaveContentError::DuplicateSlug => StatusCode::CONFLICT,
            SaveContentError::UnknownCategory => StatusCode::NOT_FOUND,
            SaveContentError::NotFound => StatusCode::NOT_FOUND,
            SaveContentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        tracing::error!("{:?}", self);

        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "message": self.to_string() }))
    }
}

/// Failures of the public read endpoints.
#[derive(thiserror::Error)]
pub enum ContentQueryError {
    #[error("Database error while loading content.")]
    Storage(#[from] sqlx::Error),
}

impl std::fmt::Debug for ContentQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ContentQueryError {
    fn status_code(&self) -> StatusCode {
        match self {
            ContentQueryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
