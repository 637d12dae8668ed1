use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use super::language::Language;

/// Listing bucket an episode is shown under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Podcast,
    Kitchen,
    Stories,
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: [Category; 3] = [Category::Podcast, Category::Kitchen, Category::Stories];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Podcast => "podcast",
            Category::Kitchen => "kitchen",
            Category::Stories => "stories",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "podcast" | "podcasts" => Ok(Category::Podcast),
            "kitchen" | "recipes" | "recipe" | "cooking" => Ok(Category::Kitchen),
            "stories" | "story" => Ok(Category::Stories),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// One language variant of an episode. Rows sharing `id` form one logical episode.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EpisodeRow {
    pub id: Uuid,
    pub language_code: String,
    pub title: String,
    pub description: Option<String>,
    pub youtube_url: Option<String>,
    pub category: Option<String>,
    pub episode_number: Option<i32>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public representation of an episode variant.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeView {
    pub id: Uuid,
    pub language_code: String,
    pub title: String,
    pub description: Option<String>,
    pub youtube_url: Option<String>,
    pub youtube_id: Option<String>,
    pub embed_url: Option<String>,
    pub category: Category,
    pub episode_number: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Admin view: every language variant of one episode, published or not.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeGroup {
    pub id: Uuid,
    pub episode_number: Option<i32>,
    pub category: Category,
    pub languages: Vec<String>,
    pub variants: Vec<EpisodeRow>,
}

/// One variant in a create/replace request.
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeVariantInput {
    pub language_code: Language,
    pub title: String,
    pub description: Option<String>,
    pub youtube_url: Option<String>,
    pub category: Option<String>,
    pub episode_number: Option<i32>,
    #[serde(default)]
    pub is_published: bool,
}

/// Body for POST /api/admin/episodes and PUT /api/admin/episodes/{id}.
#[derive(Debug, Deserialize)]
pub struct SaveEpisodeRequest {
    pub variants: Vec<EpisodeVariantInput>,
}

#[derive(Debug, Deserialize)]
pub struct EpisodeListQuery {
    pub category: Option<Category>,
}

#[derive(Debug, Serialize, Default, PartialEq)]
pub struct CategoryCounts {
    pub podcast: i64,
    pub kitchen: i64,
    pub stories: i64,
}

impl CategoryCounts {
    pub fn get(&self, category: Category) -> i64 {
        match category {
            Category::Podcast => self.podcast,
            Category::Kitchen => self.kitchen,
            Category::Stories => self.stories,
        }
    }
}
