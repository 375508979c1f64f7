//! Character domain model.
//!
//! # Responsibility
//! - Define the canonical catalog record and its caller-facing input shape.
//! - Normalize `info_url` into its canonical scheme-less form.
//!
//! # Invariants
//! - `id` is storage-assigned, unique and never reused.
//! - `info_url` never carries a leading `http://`/`https://` while stored.
//! - `image = None` is a valid permanent "no image" state, not an error.

use crate::media::ImageSource;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LEADING_SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?://)+").expect("valid scheme regex"));

/// Storage-assigned identifier for one catalog record.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type CharacterId = i64;

/// Canonical persisted record of the character catalog.
///
/// Field content is caller-validated; the store persists what it is given
/// apart from URL normalization and image encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Auto-incremented primary key, immutable once assigned.
    pub id: CharacterId,
    pub name: String,
    pub description: String,
    /// Free-form date text (`"1981"`, `"13/07/1985"`, ...).
    pub appearance_date: String,
    /// Canonical scheme-less URL; use [`Character::info_link`] to render it.
    pub info_url: String,
    /// Self-contained `data:<mime>;base64,...` payload, or `None`.
    pub image: Option<String>,
    /// Category label from an externally-defined closed set.
    pub category: String,
}

impl Character {
    /// Re-adds the scheme consumers need to render `info_url` as a link.
    pub fn info_link(&self) -> String {
        format!("https://{}", self.info_url)
    }
}

/// Caller-supplied field set for insert/update operations.
///
/// No field validation happens past this point: name format, required
/// fields and category membership are the calling form's responsibility.
#[derive(Debug, Clone, Default)]
pub struct CharacterDraft {
    pub name: String,
    pub description: String,
    pub appearance_date: String,
    /// May still carry a scheme; it is stripped before persistence.
    pub info_url: String,
    /// `None` means "no image"; on update this clears any stored image.
    pub image: Option<ImageSource>,
    pub category: String,
}

/// Normalized, storage-ready field set: scheme stripped, image already
/// encoded. This is the shape the repository layer accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterFields {
    pub name: String,
    pub description: String,
    pub appearance_date: String,
    pub info_url: String,
    pub image: Option<String>,
    pub category: String,
}

/// Strips every leading `http://`/`https://` prefix from a URL.
///
/// Stacked prefixes (`https://https://...`) collapse in one pass, so the
/// stored form is always scheme-less. Scheme text elsewhere in the value
/// is preserved untouched.
pub fn strip_url_scheme(raw: &str) -> String {
    LEADING_SCHEME_RE.replace(raw, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::strip_url_scheme;

    #[test]
    fn strips_leading_http_and_https() {
        assert_eq!(strip_url_scheme("https://example.com/mario"), "example.com/mario");
        assert_eq!(strip_url_scheme("http://example.com"), "example.com");
    }

    #[test]
    fn collapses_stacked_scheme_prefixes() {
        assert_eq!(
            strip_url_scheme("https://https://example.com/mario"),
            "example.com/mario"
        );
        assert_eq!(
            strip_url_scheme("http://https://example.com"),
            "example.com"
        );
    }

    #[test]
    fn leaves_scheme_less_urls_untouched() {
        assert_eq!(strip_url_scheme("example.com/mario"), "example.com/mario");
        assert_eq!(strip_url_scheme(""), "");
    }

    #[test]
    fn inner_scheme_text_is_preserved() {
        assert_eq!(
            strip_url_scheme("https://example.com/?next=https://other.org"),
            "example.com/?next=https://other.org"
        );
    }
}
