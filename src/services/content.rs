use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::{
    content::{ContentRow, PageKey, UpsertContentRequest},
    language::Language,
};

const CONTENT_COLS: &str = "id, page_key, section_key, language_code, content_text, content_html,
     media_url, media_type, is_published, created_at, updated_at";

pub struct ContentService;

#[derive(FromRow)]
struct Upserted {
    #[sqlx(flatten)]
    row: ContentRow,
    inserted: bool,
}

impl ContentService {
    /// Rows a visitor may see: one page, one language, published only.
    pub async fn list_published(
        pool: &PgPool,
        page: PageKey,
        language: Language,
    ) -> anyhow::Result<Vec<ContentRow>> {
        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {CONTENT_COLS} FROM content
             WHERE page_key = $1 AND language_code = $2 AND is_published = TRUE
             ORDER BY section_key"
        ))
        .bind(page.as_str())
        .bind(language.code())
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Admin listing, regardless of the publish flag.
    pub async fn list_all(
        pool: &PgPool,
        page_key: Option<&str>,
        language: Option<Language>,
    ) -> anyhow::Result<Vec<ContentRow>> {
        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {CONTENT_COLS} FROM content
             WHERE ($1::TEXT IS NULL OR page_key = $1)
               AND ($2::TEXT IS NULL OR language_code = $2)
             ORDER BY page_key, section_key, language_code"
        ))
        .bind(page_key)
        .bind(language.map(Language::code))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Insert or overwrite the row for `(page_key, section_key, language_code)`.
    /// Returns the row and whether it was newly inserted.
    pub async fn upsert(
        pool: &PgPool,
        req: &UpsertContentRequest,
    ) -> anyhow::Result<(ContentRow, bool)> {
        let upserted = sqlx::query_as::<_, Upserted>(&format!(
            "INSERT INTO content
                 (page_key, section_key, language_code, content_text, content_html,
                  media_url, media_type, is_published)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (page_key, section_key, language_code) DO UPDATE SET
                 content_text = EXCLUDED.content_text,
                 content_html = EXCLUDED.content_html,
                 media_url = EXCLUDED.media_url,
                 media_type = EXCLUDED.media_type,
                 is_published = EXCLUDED.is_published,
                 updated_at = NOW()
             RETURNING {CONTENT_COLS}, (xmax = 0) AS inserted"
        ))
        .bind(req.page_key.trim())
        .bind(req.section_key.trim())
        .bind(req.language_code.code())
        .bind(&req.content_text)
        .bind(&req.content_html)
        .bind(&req.media_url)
        .bind(&req.media_type)
        .bind(req.is_published)
        .fetch_one(pool)
        .await?;
        Ok((upserted.row, upserted.inserted))
    }

    pub async fn set_published(
        pool: &PgPool,
        id: Uuid,
        is_published: bool,
    ) -> anyhow::Result<Option<ContentRow>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "UPDATE content SET is_published = $1, updated_at = NOW()
             WHERE id = $2
             RETURNING {CONTENT_COLS}"
        ))
        .bind(is_published)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<ContentRow>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "DELETE FROM content WHERE id = $1 RETURNING {CONTENT_COLS}"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }
}

/// Page and section keys: lowercase ASCII letters, digits, `_` and `-`, 1–64 chars.
pub fn is_valid_key(s: &str) -> bool {
    (1..=64).contains(&s.len())
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_keys() {
        assert!(is_valid_key("home"));
        assert!(is_valid_key("hero_title"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("Hero"));
        assert!(!is_valid_key("hero title"));
        assert!(!is_valid_key(&"x".repeat(65)));
    }
}
