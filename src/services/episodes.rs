use std::collections::{BTreeMap, HashSet};

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    episode::{
        Category, CategoryCounts, EpisodeGroup, EpisodeRow, EpisodeVariantInput, EpisodeView,
    },
    language::Language,
};

const EPISODE_COLS: &str = "id, language_code, title, description, youtube_url, category,
     episode_number, is_published, created_at, updated_at";

const KITCHEN_KEYWORDS: &[&str] = &[
    "recipe", "rezept", "recept", "kuhinj", "küche", "kueche", "kitchen", "cooking", "kochen",
    "kuvanje", "kuvamo", "jelo",
];

const STORIES_KEYWORDS: &[&str] = &[
    "story", "stories", "priča", "prica", "priče", "price", "geschichte", "erzähl",
];

/// Bucket for an episode: the explicit category when it names one, else a
/// keyword guess on the title (kitchen before stories), else podcast.
pub fn categorize(category: Option<&str>, title: &str) -> Category {
    if let Some(explicit) = category.and_then(|c| c.parse::<Category>().ok()) {
        return explicit;
    }
    let title = title.to_lowercase();
    if KITCHEN_KEYWORDS.iter().any(|k| title.contains(k)) {
        Category::Kitchen
    } else if STORIES_KEYWORDS.iter().any(|k| title.contains(k)) {
        Category::Stories
    } else {
        Category::Podcast
    }
}

/// Video id from the usual YouTube URL shapes.
pub fn youtube_id(url: &str) -> Option<String> {
    let url = url.trim();
    let candidate = if let Some((_, rest)) = url.split_once("youtu.be/") {
        rest
    } else if let Some((_, query)) = url.split_once('?') {
        match query.split('&').find_map(|p| p.strip_prefix("v=")) {
            Some(v) => v,
            None => embedded_id(url)?,
        }
    } else {
        embedded_id(url)?
    };
    let id: String = candidate
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (id.len() == 11).then_some(id)
}

fn embedded_id(url: &str) -> Option<&str> {
    ["/embed/", "/shorts/", "/live/"]
        .iter()
        .find_map(|marker| url.split_once(marker).map(|(_, rest)| rest))
}

pub fn to_view(row: &EpisodeRow) -> EpisodeView {
    let youtube_id = row.youtube_url.as_deref().and_then(youtube_id);
    EpisodeView {
        id: row.id,
        language_code: row.language_code.clone(),
        title: row.title.clone(),
        description: row.description.clone(),
        youtube_url: row.youtube_url.clone(),
        embed_url: youtube_id
            .as_ref()
            .map(|id| format!("https://www.youtube.com/embed/{id}")),
        youtube_id,
        category: categorize(row.category.as_deref(), &row.title),
        episode_number: row.episode_number,
        created_at: row.created_at,
    }
}

pub fn count_by_category(views: &[EpisodeView]) -> CategoryCounts {
    views.iter().fold(CategoryCounts::default(), |mut acc, v| {
        match v.category {
            Category::Podcast => acc.podcast += 1,
            Category::Kitchen => acc.kitchen += 1,
            Category::Stories => acc.stories += 1,
        }
        acc
    })
}

/// Gather language variants sharing an id, keeping the row order of the
/// first variant seen.
pub fn group_variants(rows: Vec<EpisodeRow>) -> Vec<EpisodeGroup> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut by_id: BTreeMap<Uuid, Vec<EpisodeRow>> = BTreeMap::new();
    for row in rows {
        if !by_id.contains_key(&row.id) {
            order.push(row.id);
        }
        by_id.entry(row.id).or_default().push(row);
    }

    order
        .into_iter()
        .filter_map(|id| {
            let variants = by_id.remove(&id)?;
            let first = variants.first()?;
            let category = categorize(first.category.as_deref(), &first.title);
            let episode_number = variants.iter().find_map(|v| v.episode_number);
            Some(EpisodeGroup {
                id,
                episode_number,
                category,
                languages: variants.iter().map(|v| v.language_code.clone()).collect(),
                variants,
            })
        })
        .collect()
}

/// At least one variant, one per language, each with a title.
pub fn validate_variants(variants: &[EpisodeVariantInput]) -> Result<(), String> {
    if variants.is_empty() {
        return Err("An episode needs at least one language variant".into());
    }
    let mut seen = HashSet::new();
    for v in variants {
        if !seen.insert(v.language_code) {
            return Err(format!("Duplicate variant for language {}", v.language_code));
        }
        if v.title.trim().is_empty() {
            return Err(format!("Title is required ({})", v.language_code));
        }
    }
    Ok(())
}

pub struct EpisodeService;

impl EpisodeService {
    pub async fn list_published(pool: &PgPool, language: Language) -> anyhow::Result<Vec<EpisodeRow>> {
        let rows = sqlx::query_as::<_, EpisodeRow>(&format!(
            "SELECT {EPISODE_COLS} FROM episodes
             WHERE language_code = $1 AND is_published = TRUE
             ORDER BY episode_number DESC NULLS LAST, created_at DESC"
        ))
        .bind(language.code())
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_published(
        pool: &PgPool,
        id: Uuid,
        language: Language,
    ) -> anyhow::Result<Option<EpisodeRow>> {
        let row = sqlx::query_as::<_, EpisodeRow>(&format!(
            "SELECT {EPISODE_COLS} FROM episodes
             WHERE id = $1 AND language_code = $2 AND is_published = TRUE"
        ))
        .bind(id)
        .bind(language.code())
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Every variant, published or not, newest episodes first.
    pub async fn list_all(pool: &PgPool) -> anyhow::Result<Vec<EpisodeRow>> {
        let rows = sqlx::query_as::<_, EpisodeRow>(&format!(
            "SELECT {EPISODE_COLS} FROM episodes
             ORDER BY episode_number DESC NULLS LAST, created_at DESC, language_code"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(pool: &PgPool, variants: &[EpisodeVariantInput]) -> anyhow::Result<Vec<EpisodeRow>> {
        let id = Uuid::new_v4();
        let mut tx = pool.begin().await?;
        let rows = Self::insert_variants(&mut tx, id, variants).await?;
        tx.commit().await?;
        Ok(rows)
    }

    /// Replace every language variant of an episode. Delete and re-insert run
    /// in one transaction, so a failed insert leaves the old variants intact.
    /// Returns `None` when the episode does not exist.
    pub async fn replace(
        pool: &PgPool,
        id: Uuid,
        variants: &[EpisodeVariantInput],
    ) -> anyhow::Result<Option<Vec<EpisodeRow>>> {
        let mut tx = pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM episodes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let rows = Self::insert_variants(&mut tx, id, variants).await?;
        tx.commit().await?;
        Ok(Some(rows))
    }

    async fn insert_variants(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
        variants: &[EpisodeVariantInput],
    ) -> anyhow::Result<Vec<EpisodeRow>> {
        let mut rows = Vec::with_capacity(variants.len());
        for v in variants {
            let row = sqlx::query_as::<_, EpisodeRow>(&format!(
                "INSERT INTO episodes
                     (id, language_code, title, description, youtube_url, category,
                      episode_number, is_published)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING {EPISODE_COLS}"
            ))
            .bind(id)
            .bind(v.language_code.code())
            .bind(v.title.trim())
            .bind(&v.description)
            .bind(&v.youtube_url)
            .bind(v.category.as_deref().map(str::trim).filter(|c| !c.is_empty()))
            .bind(v.episode_number)
            .bind(v.is_published)
            .fetch_one(&mut **tx)
            .await?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Toggle publication for one variant or, without a language, all of them.
    /// Returns the number of rows changed.
    pub async fn set_published(
        pool: &PgPool,
        id: Uuid,
        is_published: bool,
        language: Option<Language>,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "UPDATE episodes SET is_published = $1, updated_at = NOW()
             WHERE id = $2 AND ($3::TEXT IS NULL OR language_code = $3)",
        )
        .bind(is_published)
        .bind(id)
        .bind(language.map(Language::code))
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM episodes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(id: Uuid, lang: &str, title: &str, category: Option<&str>) -> EpisodeRow {
        EpisodeRow {
            id,
            language_code: lang.into(),
            title: title.into(),
            description: None,
            youtube_url: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10".into()),
            category: category.map(Into::into),
            episode_number: Some(3),
            is_published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn uncategorized_episodes_default_to_podcast() {
        assert_eq!(categorize(None, "Conversation with Ana"), Category::Podcast);
        assert_eq!(categorize(Some(""), "Razgovor sa Markom"), Category::Podcast);
    }

    #[test]
    fn title_keywords_pick_kitchen_or_stories() {
        assert_eq!(categorize(None, "Bakina kuhinja: sarma"), Category::Kitchen);
        assert_eq!(categorize(None, "Omas Rezept für Strudel"), Category::Kitchen);
        assert_eq!(categorize(None, "A Recipe from Belgrade"), Category::Kitchen);
        assert_eq!(categorize(None, "Priča o hlebu"), Category::Stories);
        assert_eq!(categorize(None, "Eine Geschichte vom Meer"), Category::Stories);
        // kitchen wins when both match
        assert_eq!(categorize(None, "Story of a recipe"), Category::Kitchen);
    }

    #[test]
    fn explicit_category_beats_title() {
        assert_eq!(categorize(Some("stories"), "Recipe night"), Category::Stories);
        assert_eq!(categorize(Some("Recipes"), "Talk"), Category::Kitchen);
        // unknown values fall through to the heuristic
        assert_eq!(categorize(Some("misc"), "Kochen mit Oma"), Category::Kitchen);
    }

    #[test]
    fn youtube_ids_from_common_urls() {
        let expected = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(youtube_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), expected);
        assert_eq!(youtube_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"), expected);
        assert_eq!(youtube_id("https://youtu.be/dQw4w9WgXcQ?t=42"), expected);
        assert_eq!(youtube_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), expected);
        assert_eq!(youtube_id("https://youtube.com/shorts/dQw4w9WgXcQ"), expected);
        assert_eq!(youtube_id("https://vimeo.com/12345"), None);
        assert_eq!(youtube_id("https://www.youtube.com/watch?v=short"), None);
    }

    #[test]
    fn views_carry_embed_url_and_bucket() {
        let view = to_view(&row(Uuid::new_v4(), "sr", "Kuvanje sa bakom", None));
        assert_eq!(view.category, Category::Kitchen);
        assert_eq!(
            view.embed_url.as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
    }

    #[test]
    fn counts_per_bucket() {
        let views: Vec<EpisodeView> = [
            row(Uuid::new_v4(), "en", "Talk one", None),
            row(Uuid::new_v4(), "en", "Talk two", None),
            row(Uuid::new_v4(), "en", "Cooking class", None),
            row(Uuid::new_v4(), "en", "Short story", None),
        ]
        .iter()
        .map(to_view)
        .collect();
        let counts = count_by_category(&views);
        assert_eq!(counts, CategoryCounts { podcast: 2, kitchen: 1, stories: 1 });
        let total: i64 = Category::ALL.iter().map(|c| counts.get(*c)).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn variants_are_grouped_by_shared_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let groups = group_variants(vec![
            row(b, "sr", "Priča", None),
            row(a, "en", "Talk", None),
            row(b, "de", "Geschichte", None),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, b);
        assert_eq!(groups[0].languages, vec!["sr", "de"]);
        assert_eq!(groups[0].category, Category::Stories);
        assert_eq!(groups[1].variants.len(), 1);
    }

    fn input(lang: Language, title: &str) -> EpisodeVariantInput {
        EpisodeVariantInput {
            language_code: lang,
            title: title.into(),
            description: None,
            youtube_url: None,
            category: None,
            episode_number: None,
            is_published: false,
        }
    }

    #[test]
    fn variant_validation() {
        assert!(validate_variants(&[]).is_err());
        assert!(validate_variants(&[input(Language::En, "A"), input(Language::En, "B")]).is_err());
        assert!(validate_variants(&[input(Language::De, "  ")]).is_err());
        assert!(validate_variants(&[input(Language::Sr, "A"), input(Language::De, "B")]).is_ok());
    }
}
