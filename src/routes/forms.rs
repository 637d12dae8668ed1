use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::{
        language::{preference_cookie, RequestLanguage},
        rate_limit::{check_rate_limit, client_ip},
    },
    models::{
        auth::AdminUser,
        forms::{
            ConsentRecord, ConsentType, CookieConsentRequest, GuestRequest,
            GuestRequestSubmission, NewsletterSubscriber, NewsletterSubscription,
            UpdateGuestRequestStatus,
        },
        language::Language,
    },
    routes::{bad_request, internal_error, not_found, ApiError},
    services::{
        audit::{self, AuditEntry},
        forms::{hash_ip, is_plausible_email, subscribers_csv, validate_guest_request, FormService},
        metrics,
    },
    AppState,
};

/// Cookie remembering the visitor's cookie-banner decision.
pub const CONSENT_COOKIE: &str = "cookie_consent";

fn consent_record(
    consent_type: ConsentType,
    granted: bool,
    language: Language,
    headers: &HeaderMap,
) -> ConsentRecord {
    ConsentRecord {
        consent_type,
        granted,
        language,
        ip_hash: Some(hash_ip(&client_ip(headers))),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

/// POST /api/guest-requests
pub async fn submit_guest_request(
    State(state): State<AppState>,
    RequestLanguage(request_language): RequestLanguage,
    headers: HeaderMap,
    Json(body): Json<GuestRequestSubmission>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate_guest_request(&body).map_err(bad_request)?;

    // 5 submissions per hour per client
    let key = format!("form:guest:{}", client_ip(&headers));
    check_rate_limit(state.redis.as_ref(), &key, 5, 3600).await?;

    let language = body.language_code.unwrap_or(request_language);
    let request = FormService::submit_guest_request(&state.db, &body, language)
        .await
        .map_err(internal_error)?;
    FormService::record_consent(
        &state.db,
        &consent_record(ConsentType::GuestRequest, true, language, &headers),
    )
    .await
    .map_err(internal_error)?;

    metrics::FORM_SUBMISSIONS
        .with_label_values(&["guest_request", language.code()])
        .inc();

    if let Some(email) = state.email.clone() {
        let notify = request.clone();
        tokio::spawn(async move {
            if let Err(e) = email.send_guest_request_notification(&notify).await {
                tracing::error!("Failed to send guest request notification: {e}");
            }
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": request.id })),
    ))
}

/// POST /api/newsletter
pub async fn subscribe_newsletter(
    State(state): State<AppState>,
    RequestLanguage(request_language): RequestLanguage,
    headers: HeaderMap,
    Json(body): Json<NewsletterSubscription>,
) -> Result<Json<Value>, ApiError> {
    if !body.gdpr_consent {
        return Err(bad_request("Consent to data processing is required"));
    }
    if !is_plausible_email(&body.email) {
        return Err(bad_request("A valid email address is required"));
    }

    let key = format!("form:newsletter:{}", client_ip(&headers));
    check_rate_limit(state.redis.as_ref(), &key, 5, 3600).await?;

    let language = body.language_code.unwrap_or(request_language);
    FormService::subscribe_newsletter(&state.db, &body.email, language)
        .await
        .map_err(internal_error)?;
    FormService::record_consent(
        &state.db,
        &consent_record(ConsentType::Newsletter, true, language, &headers),
    )
    .await
    .map_err(internal_error)?;

    metrics::FORM_SUBMISSIONS
        .with_label_values(&["newsletter", language.code()])
        .inc();

    Ok(Json(json!({ "success": true })))
}

/// POST /api/consents: stores the cookie-banner decision.
pub async fn record_cookie_consent(
    State(state): State<AppState>,
    RequestLanguage(language): RequestLanguage,
    headers: HeaderMap,
    Json(body): Json<CookieConsentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    FormService::record_consent(
        &state.db,
        &consent_record(ConsentType::Cookies, body.granted, language, &headers),
    )
    .await
    .map_err(internal_error)?;

    metrics::FORM_SUBMISSIONS
        .with_label_values(&["cookie_consent", language.code()])
        .inc();

    let value = if body.granted { "accepted" } else { "rejected" };
    Ok((
        [(header::SET_COOKIE, preference_cookie(CONSENT_COOKIE, value))],
        Json(json!({ "consent": value })),
    ))
}

/// GET /api/admin/guest-requests
pub async fn list_guest_requests(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<GuestRequest>>, ApiError> {
    FormService::list_guest_requests(&state.db)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// PUT /api/admin/guest-requests/{id}/status
pub async fn update_guest_request_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateGuestRequestStatus>,
) -> Result<Json<GuestRequest>, ApiError> {
    let row = FormService::update_guest_request_status(&state.db, id, body.status)
        .await
        .map_err(internal_error)?
        .ok_or_else(not_found)?;

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: "guest_request.status",
            resource_type: "guest_request",
            resource_id: Some(id.to_string()),
            resource_label: Some(body.status.as_str().to_string()),
        },
    );

    Ok(Json(row))
}

/// GET /api/admin/newsletter
pub async fn list_subscribers(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<NewsletterSubscriber>>, ApiError> {
    FormService::list_subscribers(&state.db)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// GET /api/admin/newsletter/export
pub async fn export_subscribers(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let subscribers = FormService::list_subscribers(&state.db)
        .await
        .map_err(internal_error)?;
    let body = subscribers_csv(&subscribers).map_err(internal_error)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"newsletter-subscribers.csv\"",
            ),
        ],
        body,
    ))
}

/// DELETE /api/admin/newsletter/{id}
pub async fn delete_subscriber(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = FormService::delete_subscriber(&state.db, id)
        .await
        .map_err(internal_error)?;
    if !deleted {
        return Err(not_found());
    }

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: "newsletter.delete",
            resource_type: "newsletter_subscriber",
            resource_id: Some(id.to_string()),
            resource_label: None,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
