use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::Config,
    models::{
        auth::{Claims, RefreshClaims},
        user::{AuthResponse, Profile, RefreshToken, SessionView, UserRole},
    },
};

const PROFILE_COLS: &str = "id, email, password_hash, display_name, role, created_at, updated_at";

pub const MIN_PASSWORD_LEN: usize = 8;

/// Failures a client can act on, kept apart from infrastructure errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("Refresh token invalid, expired or revoked")]
    TokenInvalid,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Refresh tokens are long JWTs; a SHA-256 digest is what gets stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct AuthService;

impl AuthService {
    pub async fn sign_up(
        pool: &PgPool,
        config: &Config,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(email);
        let role = if config.bootstrap_super_admin_email.as_deref() == Some(email.as_str()) {
            UserRole::SuperAdmin
        } else {
            UserRole::User
        };

        let password_hash =
            bcrypt::hash(password, 12).map_err(|e| AuthError::Internal(e.into()))?;
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO profiles (email, password_hash, display_name, role)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (email) DO NOTHING
             RETURNING {PROFILE_COLS}"
        ))
        .bind(&email)
        .bind(password_hash)
        .bind(display_name.map(str::trim).filter(|n| !n.is_empty()))
        .bind(role.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::EmailTaken)?;

        if role == UserRole::SuperAdmin {
            tracing::info!("bootstrap super admin registered: {}", profile.email);
        }

        Self::issue_tokens(pool, config, profile).await
    }

    pub async fn sign_in(
        pool: &PgPool,
        config: &Config,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLS} FROM profiles WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        let valid = bcrypt::verify(password, &profile.password_hash).unwrap_or(false);
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        Self::issue_tokens(pool, config, profile).await
    }

    async fn issue_tokens(
        pool: &PgPool,
        config: &Config,
        profile: Profile,
    ) -> Result<AuthResponse, AuthError> {
        let access_token = Self::generate_access_token(
            profile.id,
            profile.role(),
            &config.jwt_secret,
            config.jwt_expiry_seconds,
        )?;
        let (refresh_token, jti) = Self::generate_refresh_token(
            &profile.id,
            &config.jwt_refresh_secret,
            config.jwt_refresh_expiry_days,
        )?;

        let expires_at = Utc::now() + chrono::Duration::days(config.jwt_refresh_expiry_days as i64);
        sqlx::query(
            "INSERT INTO refresh_tokens (id, profile_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(jti)
        .bind(profile.id)
        .bind(hash_token(&refresh_token))
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            session: profile.into(),
        })
    }

    pub fn generate_access_token(
        user_id: Uuid,
        role: UserRole,
        secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    fn generate_refresh_token(
        user_id: &Uuid,
        secret: &str,
        ttl_days: u64,
    ) -> anyhow::Result<(String, Uuid)> {
        let now = Utc::now().timestamp() as usize;
        let jti = Uuid::new_v4();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            jti: jti.to_string(),
            iat: now,
            exp: now + (ttl_days * 86400) as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok((token, jti))
    }

    fn decode_refresh_token(token: &str, secret: &str) -> anyhow::Result<RefreshClaims> {
        let key = DecodingKey::from_secret(secret.as_bytes());
        let data = decode::<RefreshClaims>(token, &key, &Validation::new(Algorithm::HS256))?;
        Ok(data.claims)
    }

    /// Rotate refresh token: revoke old, issue new pair. The revoke is the
    /// check, so a token can be rotated at most once.
    pub async fn refresh(
        pool: &PgPool,
        config: &Config,
        refresh_token_str: &str,
    ) -> Result<AuthResponse, AuthError> {
        let rc = Self::decode_refresh_token(refresh_token_str, &config.jwt_refresh_secret)
            .map_err(|_| AuthError::TokenInvalid)?;
        let jti: Uuid = rc.jti.parse().map_err(|_| AuthError::TokenInvalid)?;
        let profile_id: Uuid = rc.sub.parse().map_err(|_| AuthError::TokenInvalid)?;

        sqlx::query_as::<_, RefreshToken>(
            "UPDATE refresh_tokens SET revoked = TRUE
             WHERE id = $1 AND profile_id = $2 AND token_hash = $3
               AND revoked = FALSE AND expires_at > NOW()
             RETURNING id, profile_id, token_hash, expires_at, revoked, created_at",
        )
        .bind(jti)
        .bind(profile_id)
        .bind(hash_token(refresh_token_str))
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::TokenInvalid)?;

        let profile = Self::profile(pool, profile_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        Self::issue_tokens(pool, config, profile).await
    }

    /// Revoke a refresh token. Unparseable tokens are ignored.
    pub async fn sign_out(pool: &PgPool, config: &Config, refresh_token_str: &str) -> anyhow::Result<()> {
        if let Ok(rc) = Self::decode_refresh_token(refresh_token_str, &config.jwt_refresh_secret) {
            let jti: Uuid = rc.jti.parse()?;
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
                .bind(jti)
                .execute(pool)
                .await?;
        }
        Ok(())
    }

    pub async fn profile(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(profile)
    }

    /// Role as currently stored, which may be newer than the one in the token.
    pub async fn session(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<SessionView>> {
        Ok(Self::profile(pool, id).await?.map(SessionView::from))
    }

    pub async fn list_profiles(pool: &PgPool) -> anyhow::Result<Vec<SessionView>> {
        let profiles = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLS} FROM profiles ORDER BY created_at"
        ))
        .fetch_all(pool)
        .await?;
        Ok(profiles.into_iter().map(SessionView::from).collect())
    }

    pub async fn set_role(pool: &PgPool, id: Uuid, role: UserRole) -> anyhow::Result<Option<SessionView>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles SET role = $1, updated_at = NOW()
             WHERE id = $2
             RETURNING {PROFILE_COLS}"
        ))
        .bind(role.to_string())
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(profile.map(SessionView::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_access_token;

    #[test]
    fn access_token_round_trips_role() {
        let id = Uuid::new_v4();
        let token = AuthService::generate_access_token(id, UserRole::Admin, "secret", 60).unwrap();
        let user = decode_access_token(&token, "secret").unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.role, UserRole::Admin);
        assert!(decode_access_token(&token, "other-secret").is_err());
    }

    #[test]
    fn refresh_tokens_do_not_validate_as_access_tokens() {
        let (refresh, _) = AuthService::generate_refresh_token(&Uuid::new_v4(), "secret", 1).unwrap();
        assert!(decode_access_token(&refresh, "secret").is_err());
        let claims = AuthService::decode_refresh_token(&refresh, "secret").unwrap();
        assert!(claims.jti.parse::<Uuid>().is_ok());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ana@Example.RS "), "ana@example.rs");
        assert_eq!(hash_token("abc").len(), 64);
    }
}
