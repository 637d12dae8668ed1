use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Languages the site is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Sr,
    De,
    En,
}

#[derive(Debug, Error, PartialEq)]
#[error("unsupported language code: {0}")]
pub struct UnsupportedLanguage(pub String);

impl Language {
    pub const ALL: [Language; 3] = [Language::Sr, Language::De, Language::En];

    pub fn code(self) -> &'static str {
        match self {
            Language::Sr => "sr",
            Language::De => "de",
            Language::En => "en",
        }
    }

    /// Picks the first supported language out of an `Accept-Language` header,
    /// honouring q-weights. Region subtags are ignored (`de-AT` → `de`).
    pub fn from_accept_language(header: &str) -> Option<Language> {
        let mut candidates: Vec<(f32, Language)> = header
            .split(',')
            .filter_map(|part| {
                let mut pieces = part.trim().split(';');
                let tag = pieces.next()?.trim();
                let primary = tag.split('-').next()?;
                let lang = primary.parse::<Language>().ok()?;
                let q = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                // q=0 means "not acceptable"
                (q > 0.0).then_some((q, lang))
            })
            .collect();
        // stable sort keeps header order among equal weights
        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        candidates.first().map(|(_, lang)| *lang)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sr" | "sr-latn" => Ok(Language::Sr),
            "de" => Ok(Language::De),
            "en" => Ok(Language::En),
            _ => Err(UnsupportedLanguage(s.to_string())),
        }
    }
}
