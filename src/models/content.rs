use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use super::language::Language;

/// Pages whose copy is editable from the admin panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKey {
    Home,
    Podcast,
    Kitchen,
    Stories,
    Contact,
    Privacy,
    Impressum,
    Terms,
    Cookies,
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown page: {0}")]
pub struct UnknownPage(pub String);

impl PageKey {
    pub const ALL: [PageKey; 9] = [
        PageKey::Home,
        PageKey::Podcast,
        PageKey::Kitchen,
        PageKey::Stories,
        PageKey::Contact,
        PageKey::Privacy,
        PageKey::Impressum,
        PageKey::Terms,
        PageKey::Cookies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PageKey::Home => "home",
            PageKey::Podcast => "podcast",
            PageKey::Kitchen => "kitchen",
            PageKey::Stories => "stories",
            PageKey::Contact => "contact",
            PageKey::Privacy => "privacy",
            PageKey::Impressum => "impressum",
            PageKey::Terms => "terms",
            PageKey::Cookies => "cookies",
        }
    }

    /// Sections every rendering of the page fills in, from the database or
    /// from the bundled default.
    pub fn sections(self) -> &'static [&'static str] {
        match self {
            PageKey::Home => &[
                "hero_title",
                "hero_subtitle",
                "hero_image",
                "intro_text",
                "podcast_teaser",
                "kitchen_teaser",
                "stories_teaser",
            ],
            PageKey::Podcast | PageKey::Kitchen | PageKey::Stories => {
                &["hero_title", "hero_subtitle", "hero_image", "intro_text"]
            }
            PageKey::Contact => &["hero_title", "intro_text", "email", "address"],
            PageKey::Privacy | PageKey::Impressum | PageKey::Terms | PageKey::Cookies => {
                &["title", "body"]
            }
        }
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PageKey {
    type Err = UnknownPage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageKey::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPage(s.to_string()))
    }
}

/// One row of the `content` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentRow {
    pub id: Uuid,
    pub page_key: String,
    pub section_key: String,
    pub language_code: String,
    pub content_text: Option<String>,
    pub content_html: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for PUT /api/admin/content.
#[derive(Debug, Deserialize)]
pub struct UpsertContentRequest {
    pub page_key: String,
    pub section_key: String,
    pub language_code: Language,
    pub content_text: Option<String>,
    pub content_html: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub is_published: bool,
    /// Restricts an episode publish toggle to a single language variant.
    pub language_code: Option<Language>,
}

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub page_key: Option<String>,
    pub language: Option<Language>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionSource {
    Database,
    Default,
}

/// A page section as served to visitors.
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub section_key: String,
    pub content_text: String,
    pub content_html: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub source: SectionSource,
}

#[derive(Debug, Serialize)]
pub struct PageView {
    pub page_key: PageKey,
    pub language: Language,
    pub sections: Vec<SectionView>,
}

impl PageView {
    pub fn section(&self, key: &str) -> Option<&SectionView> {
        self.sections.iter().find(|s| s.section_key == key)
    }
}

/// Response of POST /api/admin/uploads.
#[derive(Debug, Serialize)]
pub struct UploadedMedia {
    pub media_url: String,
    pub storage_path: String,
    pub media_type: String,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_page_parses_back_from_its_key() {
        for page in PageKey::ALL {
            assert_eq!(page.as_str().parse::<PageKey>(), Ok(page));
            assert!(!page.sections().is_empty());
        }
        assert!("admin".parse::<PageKey>().is_err());
    }
}
