use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::language::Language;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GuestRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub topic: Option<String>,
    pub message: String,
    pub language_code: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct GuestRequestSubmission {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub topic: Option<String>,
    pub message: String,
    pub language_code: Option<Language>,
    #[serde(default)]
    pub gdpr_consent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestRequestStatus {
    New,
    Contacted,
    Archived,
}

impl GuestRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GuestRequestStatus::New => "new",
            GuestRequestStatus::Contacted => "contacted",
            GuestRequestStatus::Archived => "archived",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateGuestRequestStatus {
    pub status: GuestRequestStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NewsletterSubscriber {
    pub id: Uuid,
    pub email: String,
    pub language_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewsletterSubscription {
    pub email: String,
    pub language_code: Option<Language>,
    #[serde(default)]
    pub gdpr_consent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    Cookies,
    Newsletter,
    GuestRequest,
}

impl ConsentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsentType::Cookies => "cookies",
            ConsentType::Newsletter => "newsletter",
            ConsentType::GuestRequest => "guest_request",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CookieConsentRequest {
    pub granted: bool,
}

/// Metadata recorded next to every consent decision.
#[derive(Debug, Clone)]
pub struct ConsentRecord {
    pub consent_type: ConsentType,
    pub granted: bool,
    pub language: Language,
    pub ip_hash: Option<String>,
    pub user_agent: Option<String>,
}
