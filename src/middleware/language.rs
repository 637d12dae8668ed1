use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::models::language::Language;

/// Cookie holding the visitor's language choice.
pub const LANG_COOKIE: &str = "lang";

/// Language of the current request: `?lang=`, then the `lang` cookie, then
/// `Accept-Language`, then Serbian. Unsupported values are skipped.
#[derive(Debug, Clone, Copy)]
pub struct RequestLanguage(pub Language);

impl<S> FromRequestParts<S> for RequestLanguage
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestLanguage(resolve(parts.uri.query(), &parts.headers)))
    }
}

pub fn resolve(query: Option<&str>, headers: &HeaderMap) -> Language {
    let from_query = query.and_then(|q| {
        q.split('&')
            .find_map(|pair| pair.strip_prefix("lang="))
            .and_then(|v| v.parse().ok())
    });

    from_query
        .or_else(|| get_cookie(headers, LANG_COOKIE).and_then(|v| v.parse().ok()))
        .or_else(|| {
            headers
                .get(header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok())
                .and_then(Language::from_accept_language)
        })
        .unwrap_or_default()
}

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|part| part.trim().strip_prefix(&prefix).map(str::to_string))
}

/// `Set-Cookie` value for a one-year, site-wide preference cookie.
pub fn preference_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; Path=/; Max-Age=31536000; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn query_wins_over_cookie_and_header() {
        let h = headers(&[
            (header::COOKIE, "theme=dark; lang=de"),
            (header::ACCEPT_LANGUAGE, "en"),
        ]);
        assert_eq!(resolve(Some("page=1&lang=en"), &h), Language::En);
        assert_eq!(resolve(None, &h), Language::De);
    }

    #[test]
    fn unsupported_values_fall_through() {
        let h = headers(&[(header::COOKIE, "lang=fr"), (header::ACCEPT_LANGUAGE, "fr, de;q=0.5")]);
        assert_eq!(resolve(Some("lang=xx"), &h), Language::De);
        assert_eq!(resolve(None, &HeaderMap::new()), Language::Sr);
    }

    #[test]
    fn cookies_across_multiple_headers() {
        let h = headers(&[(header::COOKIE, "a=1"), (header::COOKIE, "cookie_consent=accepted")]);
        assert_eq!(get_cookie(&h, "cookie_consent").as_deref(), Some("accepted"));
        assert_eq!(get_cookie(&h, "missing"), None);
    }
}
