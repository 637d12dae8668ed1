use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    forms::{
        ConsentRecord, GuestRequest, GuestRequestStatus, GuestRequestSubmission,
        NewsletterSubscriber,
    },
    language::Language,
};

const GUEST_COLS: &str =
    "id, name, email, phone, topic, message, language_code, status, created_at";
const SUBSCRIBER_COLS: &str = "id, email, language_code, is_active, created_at, updated_at";

/// Loose shape check: one `@`, non-empty local part, dotted domain, no spaces.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn validate_guest_request(req: &GuestRequestSubmission) -> Result<(), &'static str> {
    if !req.gdpr_consent {
        return Err("Consent to data processing is required");
    }
    if req.name.trim().is_empty() {
        return Err("Name is required");
    }
    if !is_plausible_email(&req.email) {
        return Err("A valid email address is required");
    }
    if req.message.trim().is_empty() {
        return Err("Message is required");
    }
    if req.message.len() > 5000 {
        return Err("Message is too long");
    }
    Ok(())
}

/// Client IPs are only kept as a SHA-256 digest.
pub fn hash_ip(ip: &str) -> String {
    hex::encode(Sha256::digest(ip.as_bytes()))
}

/// CSV export of the subscriber list for mailing tools.
pub fn subscribers_csv(subscribers: &[NewsletterSubscriber]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["email", "language", "active", "subscribed_at"])?;
    for s in subscribers {
        let subscribed_at = s.created_at.to_rfc3339();
        writer.write_record([
            s.email.as_str(),
            s.language_code.as_str(),
            if s.is_active { "true" } else { "false" },
            subscribed_at.as_str(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("csv flush failed: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

pub struct FormService;

impl FormService {
    pub async fn submit_guest_request(
        pool: &PgPool,
        req: &GuestRequestSubmission,
        language: Language,
    ) -> anyhow::Result<GuestRequest> {
        let row = sqlx::query_as::<_, GuestRequest>(&format!(
            "INSERT INTO guest_requests (name, email, phone, topic, message, language_code)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {GUEST_COLS}"
        ))
        .bind(req.name.trim())
        .bind(req.email.trim().to_lowercase())
        .bind(req.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()))
        .bind(req.topic.as_deref().map(str::trim).filter(|t| !t.is_empty()))
        .bind(req.message.trim())
        .bind(language.code())
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    /// Subscribing an address that already exists re-activates it and
    /// updates its language instead of adding a second row.
    pub async fn subscribe_newsletter(
        pool: &PgPool,
        email: &str,
        language: Language,
    ) -> anyhow::Result<NewsletterSubscriber> {
        let row = sqlx::query_as::<_, NewsletterSubscriber>(&format!(
            "INSERT INTO newsletter_subscribers (email, language_code)
             VALUES ($1, $2)
             ON CONFLICT (email) DO UPDATE SET
                 language_code = EXCLUDED.language_code,
                 is_active = TRUE,
                 updated_at = NOW()
             RETURNING {SUBSCRIBER_COLS}"
        ))
        .bind(email.trim().to_lowercase())
        .bind(language.code())
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn record_consent(pool: &PgPool, consent: &ConsentRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO gdpr_consents (consent_type, granted, language_code, ip_hash, user_agent)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(consent.consent_type.as_str())
        .bind(consent.granted)
        .bind(consent.language.code())
        .bind(&consent.ip_hash)
        .bind(&consent.user_agent)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list_guest_requests(pool: &PgPool) -> anyhow::Result<Vec<GuestRequest>> {
        let rows = sqlx::query_as::<_, GuestRequest>(&format!(
            "SELECT {GUEST_COLS} FROM guest_requests ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn update_guest_request_status(
        pool: &PgPool,
        id: Uuid,
        status: GuestRequestStatus,
    ) -> anyhow::Result<Option<GuestRequest>> {
        let row = sqlx::query_as::<_, GuestRequest>(&format!(
            "UPDATE guest_requests SET status = $1 WHERE id = $2 RETURNING {GUEST_COLS}"
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn list_subscribers(pool: &PgPool) -> anyhow::Result<Vec<NewsletterSubscriber>> {
        let rows = sqlx::query_as::<_, NewsletterSubscriber>(&format!(
            "SELECT {SUBSCRIBER_COLS} FROM newsletter_subscribers ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete_subscriber(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM newsletter_subscribers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn submission(consent: bool, email: &str, message: &str) -> GuestRequestSubmission {
        GuestRequestSubmission {
            name: "Ana".into(),
            email: email.into(),
            phone: None,
            topic: Some("Guest".into()),
            message: message.into(),
            language_code: None,
            gdpr_consent: consent,
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_plausible_email("ana@example.rs"));
        assert!(is_plausible_email("  ana.m+pod@mail.example.de "));
        assert!(!is_plausible_email("ana"));
        assert!(!is_plausible_email("ana@localhost"));
        assert!(!is_plausible_email("a na@example.rs"));
        assert!(!is_plausible_email("ana@@example.rs"));
    }

    #[test]
    fn guest_requests_need_consent_and_content() {
        assert_eq!(
            validate_guest_request(&submission(false, "ana@example.rs", "Hi")),
            Err("Consent to data processing is required")
        );
        assert!(validate_guest_request(&submission(true, "nope", "Hi")).is_err());
        assert!(validate_guest_request(&submission(true, "ana@example.rs", "  ")).is_err());
        assert!(validate_guest_request(&submission(true, "ana@example.rs", "Hi")).is_ok());
    }

    #[test]
    fn ip_hash_is_stable_hex() {
        let h = hash_ip("203.0.113.9");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_ip("203.0.113.9"));
        assert_ne!(h, hash_ip("203.0.113.10"));
    }

    #[test]
    fn csv_export_has_header_and_rows() {
        let subs = vec![NewsletterSubscriber {
            id: Uuid::new_v4(),
            email: "ana@example.rs".into(),
            language_code: "sr".into(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }];
        let csv = subscribers_csv(&subs).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("email,language,active,subscribed_at"));
        assert!(lines.next().unwrap().starts_with("ana@example.rs,sr,true,"));
    }
}
