use unicode_segmentation::UnicodeSegmentation;

const MAX_SLUG_LENGTH: usize = 200;

/// URL-safe content identifier: lowercase ASCII alphanumerics separated by
/// single hyphens, at most 200 graphemes. Stored uniquely per content table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Slug(String);

impl Slug {
    /// Accepts a client-provided slug as-is, if it is already in canonical
    /// form. No normalization happens here: a slug is an identifier and two
    /// spellings of "the same" slug must not both pass.
    pub fn parse(slug: String) -> Result<Slug, String> {
        let well_formed = !slug.is_empty()
            && !slug.starts_with('-')
            && !slug.ends_with('-')
            && !slug.contains("--")
            && slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

        if !well_formed || slug.graphemes(true).count() > MAX_SLUG_LENGTH {
            return Err(format!("{} is not a valid slug", slug));
        }

        Ok(Self(slug))
    }

    /// Derives a slug from a title: lowercase, alphanumeric runs joined by
    /// single hyphens, everything else dropped. Fails when the title has no
    /// usable characters at all.
    pub fn generate(title: &str) -> Result<Slug, String> {
        let mut slug = String::with_capacity(title.len());

        for c in title.to_lowercase().chars() {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                slug.push(c);
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }

        let slug: String = slug.graphemes(true).take(MAX_SLUG_LENGTH).collect();
        let slug = slug.trim_end_matches('-').to_string();

        Self::parse(slug).map_err(|_| format!("cannot derive a slug from title {:?}", title))
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
