use sqlx::PgPool;
use uuid::Uuid;

/// An admin action to record.
pub struct AuditEntry {
    pub actor_id:       Uuid,
    pub action:         &'static str,
    pub resource_type:  &'static str,
    pub resource_id:    Option<String>,
    pub resource_label: Option<String>,
}

/// Fire-and-forget audit log entry.
/// Spawns a background task, never blocks the request handler and
/// never propagates errors (logs a warning on failure).
pub fn log(pool: PgPool, entry: AuditEntry) {
    tokio::spawn(async move {
        let res = sqlx::query(
            "INSERT INTO audit_log (actor_id, action, resource_type, resource_id, resource_label)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.actor_id)
        .bind(entry.action)
        .bind(entry.resource_type)
        .bind(entry.resource_id)
        .bind(entry.resource_label)
        .execute(&pool)
        .await;

        if let Err(e) = res {
            tracing::warn!("audit log insert failed for {}: {e}", entry.action);
        }
    });
}
