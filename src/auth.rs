use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, Utc};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use moka::future::Cache;
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin e-mail.
    pub sub: String,
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Signs admin tokens and tracks which sessions are still live. A token whose
/// session was revoked or aged out of the cache is rejected even when its
/// signature and `exp` are valid.
#[derive(Clone)]
pub struct SessionStore {
    secret: Arc<Vec<u8>>,
    ttl_seconds: i64,
    live: Cache<String, String>,
}

impl SessionStore {
    pub fn new(secret: Option<&str>, ttl_seconds: u64) -> Self {
        let secret = match secret {
            Some(value) => value.as_bytes().to_vec(),
            None => {
                tracing::warn!(
                    "SESSION_SECRET is not set; using an ephemeral secret, sessions end on restart"
                );
                format!("{}{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4()).into_bytes()
            }
        };
        let ttl_seconds = ttl_seconds.max(60);
        Self {
            secret: Arc::new(secret),
            ttl_seconds: ttl_seconds as i64,
            live: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(ttl_seconds))
                .build(),
        }
    }

    pub async fn issue(&self, subject: &str) -> AppResult<IssuedSession> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            sid: uuid::Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + self.ttl_seconds,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|error| AppError::Internal(format!("Could not sign session token: {error}")))?;

        self.live.insert(claims.sid.clone(), claims.sub.clone()).await;
        Ok(IssuedSession {
            access_token: token,
            token_type: "bearer",
            expires_at: DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or(now),
        })
    }

    pub async fn verify(&self, token: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AppError::Unauthorized("Invalid or expired session token.".to_string()))?;

        match self.live.get(&data.claims.sid).await {
            Some(subject) if subject == data.claims.sub => Ok(data.claims),
            _ => Err(AppError::Unauthorized(
                "Session has ended. Sign in again.".to_string(),
            )),
        }
    }

    pub async fn revoke(&self, session_id: &str) {
        self.live.invalidate(session_id).await;
    }
}

/// Checks `password` against an Argon2 PHC string such as the one in
/// `ADMIN_PASSWORD_HASH`. A malformed hash never verifies.
pub fn verify_password(password: &str, phc_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(phc_hash.trim()) else {
        tracing::warn!("ADMIN_PASSWORD_HASH is not a valid Argon2 PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Argon2id PHC string for `password` with a fresh random salt.
#[cfg(test)]
pub fn hash_password(password: &str) -> String {
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

/// Checks the admin credential and opens a session.
pub async fn login(
    config: &AppConfig,
    sessions: &SessionStore,
    email: &str,
    password: &str,
) -> AppResult<IssuedSession> {
    let Some(expected_hash) = config.admin_password_hash.as_deref() else {
        return Err(AppError::Unauthorized(
            "Admin login is disabled on this server.".to_string(),
        ));
    };

    let email_matches = email.trim().eq_ignore_ascii_case(&config.admin_email);
    let password_matches = verify_password(password, expected_hash);
    if !(email_matches && password_matches) {
        tracing::warn!("Rejected admin login attempt");
        return Err(AppError::Unauthorized(
            "Invalid email or password.".to_string(),
        ));
    }

    let session = sessions.issue(&config.admin_email).await?;
    tracing::info!(admin = %config.admin_email, "Admin signed in");
    Ok(session)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> AppResult<Claims> {
    let token = bearer_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token.".to_string()))?;
    state.sessions.verify(token).await
}

#[cfg(test)]
mod tests {
    use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::{bearer_token, hash_password, login, verify_password, Claims, SessionStore};
    use crate::config::AppConfig;
    use crate::error::AppError;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "zz"));
        assert!(!verify_password("hunter2", ""));
    }

    #[test]
    fn same_password_hashes_differently() {
        let first = hash_password("hunter2");
        let second = hash_password("hunter2");
        assert_ne!(first, second);
        assert!(verify_password("hunter2", &second));
    }

    #[tokio::test]
    async fn issued_tokens_verify_until_revoked() {
        let sessions = SessionStore::new(Some("secret"), 3600);
        let issued = sessions.issue("admin@autoshop.local").await.unwrap();

        let claims = sessions.verify(&issued.access_token).await.unwrap();
        assert_eq!(claims.sub, "admin@autoshop.local");

        sessions.revoke(&claims.sid).await;
        assert!(matches!(
            sessions.verify(&issued.access_token).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn tokens_from_another_secret_are_rejected() {
        let ours = SessionStore::new(Some("secret"), 3600);
        let theirs = SessionStore::new(Some("other"), 3600);
        let issued = theirs.issue("admin@autoshop.local").await.unwrap();
        assert!(ours.verify(&issued.access_token).await.is_err());
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected() {
        let sessions = SessionStore::new(Some("secret"), 3600);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "admin@autoshop.local".to_string(),
            sid: "stale".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(sessions.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn login_checks_email_and_password() {
        let mut config = AppConfig::for_tests();
        let sessions = SessionStore::new(Some("secret"), 3600);

        assert!(matches!(
            login(&config, &sessions, "admin@autoshop.local", "hunter2").await,
            Err(AppError::Unauthorized(_))
        ));

        config.admin_password_hash = Some(hash_password("hunter2"));
        assert!(login(&config, &sessions, "ADMIN@autoshop.local", "hunter2")
            .await
            .is_ok());
        assert!(login(&config, &sessions, "someone@else.test", "hunter2")
            .await
            .is_err());
        assert!(login(&config, &sessions, "admin@autoshop.local", "wrong")
            .await
            .is_err());
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
