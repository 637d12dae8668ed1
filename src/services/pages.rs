use crate::{
    models::{
        content::{ContentRow, PageKey, PageView, SectionSource, SectionView},
        language::Language,
    },
    services::i18n::Catalog,
};

/// Catalog key holding the default copy of a page section.
pub fn default_key(page: PageKey, section: &str) -> String {
    format!("pages.{page}.{section}")
}

/// Builds the visitor-facing page: every declared section is filled from a
/// published row in `language` when one exists, otherwise from the catalog
/// default (empty when the catalog has none). Published rows for sections
/// the page does not declare are appended after the declared ones.
pub fn compose_page(
    page: PageKey,
    language: Language,
    rows: &[ContentRow],
    catalog: &Catalog,
) -> PageView {
    let visible: Vec<&ContentRow> = rows
        .iter()
        .filter(|r| {
            r.is_published && r.page_key == page.as_str() && r.language_code == language.code()
        })
        .collect();

    let mut sections: Vec<SectionView> = page
        .sections()
        .iter()
        .map(|section| match visible.iter().find(|r| r.section_key == *section) {
            Some(row) => from_row(row),
            None => SectionView {
                section_key: section.to_string(),
                content_text: catalog
                    .get(&default_key(page, section))
                    .unwrap_or_default()
                    .to_string(),
                content_html: None,
                media_url: None,
                media_type: None,
                source: SectionSource::Default,
            },
        })
        .collect();

    let mut extra: Vec<&ContentRow> = visible
        .into_iter()
        .filter(|r| !page.sections().iter().any(|s| *s == r.section_key))
        .collect();
    extra.sort_by(|a, b| a.section_key.cmp(&b.section_key));
    sections.extend(extra.into_iter().map(from_row));

    PageView {
        page_key: page,
        language,
        sections,
    }
}

fn from_row(row: &ContentRow) -> SectionView {
    SectionView {
        section_key: row.section_key.clone(),
        content_text: row.content_text.clone().unwrap_or_default(),
        content_html: row.content_html.clone(),
        media_url: row.media_url.clone(),
        media_type: row.media_type.clone(),
        source: SectionSource::Database,
    }
}
