use axum::{
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::json;

/// Checks a rate limit stored in Redis. Without Redis every request passes.
///
/// Uses the INCR + EXPIRE strategy:
/// - Increments a counter for `key`
/// - On first increment, sets TTL to `window_secs`
/// - Returns 429 if counter exceeds `max_attempts`
pub async fn check_rate_limit(
    redis: Option<&redis::aio::MultiplexedConnection>,
    key: &str,
    max_attempts: u64,
    window_secs: u64,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    let Some(conn) = redis else {
        return Ok(());
    };
    let mut conn = conn.clone();

    let count: u64 = redis::cmd("INCR")
        .arg(key)
        .query_async(&mut conn)
        .await
        .unwrap_or(0);

    if count == 1 {
        // Set TTL only on first increment to avoid resetting the window on each attempt
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .query_async(&mut conn)
            .await;
    }

    if count > max_attempts {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many requests. Please try again later." })),
        ));
    }

    Ok(())
}

/// Client address as reported by the reverse proxy.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get("X-Forwarded-For")
                .and_then(|h| h.to_str().ok())
                .and_then(|v| v.split(',').next())
        })
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn real_ip_preferred_over_forwarded_chain() {
        let mut h = HeaderMap::new();
        h.insert("X-Forwarded-For", HeaderValue::from_static("198.51.100.7, 10.0.0.1"));
        assert_eq!(client_ip(&h), "198.51.100.7");
        h.insert("X-Real-IP", HeaderValue::from_static("203.0.113.9"));
        assert_eq!(client_ip(&h), "203.0.113.9");
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[tokio::test]
    async fn no_redis_means_no_limit() {
        for _ in 0..10 {
            assert!(check_rate_limit(None, "form:test", 1, 60).await.is_ok());
        }
    }
}
