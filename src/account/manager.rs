/// Account manager using runtime sqlx queries
///
/// Owns the identity reconciliation rules (password and Google login) and
/// the access/refresh token lifecycle.

use crate::{
    account::UpdateProfileRequest,
    config::ServerConfig,
    db::models::{RefreshToken, User},
    error::{is_unique_violation, ApiError, ApiResult},
    identity::GoogleClaims,
};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Freshly minted access + refresh credentials
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    #[serde(rename = "type")]
    token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
    iat: i64,
    exp: i64,
}

/// Normalize an email address for lookup and storage
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Register a new password account
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> ApiResult<(User, TokenPair)> {
        let email = normalize_email(email);

        if self.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::DuplicateEmail);
        }

        let password_hash = hash_password(password)?;
        let user = self
            .insert_user(&email, &password_hash, full_name, None, None, None)
            .await
            .map_err(|e| match e {
                // Concurrent registration with the same email
                ApiError::Database(db) if is_unique_violation(&db) => ApiError::DuplicateEmail,
                other => other,
            })?;

        let tokens = self.issue_tokens(user.id).await?;
        Ok((user, tokens))
    }

    /// Authenticate with email + password
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<(User, TokenPair)> {
        let email = normalize_email(email);
        let user = self.find_user_by_email(&email).await?;

        // Provider-bound accounts have no password login path; telling the
        // caller which provider to use is the defined conflict message.
        if let Some(user) = &user {
            if let Some(provider) = &user.oauth_provider {
                return Err(ApiError::IdentityConflict(format!(
                    "This email is registered via {}. Please sign in with {}.",
                    provider,
                    titlecase(provider)
                )));
            }
        }

        let user = match user {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => return Err(ApiError::InvalidCredentials),
        };

        let tokens = self.issue_tokens(user.id).await?;
        Ok((user, tokens))
    }

    /// Resolve a verified Google identity assertion to exactly one account
    ///
    /// The claims must already be authenticated (signature, audience, expiry,
    /// email verification) by the caller; this resolves them against the
    /// identity store, creating or linking an account when no binding
    /// constraint is violated.
    pub async fn login_google(&self, claims: &GoogleClaims) -> ApiResult<(User, TokenPair)> {
        let email = normalize_email(&claims.email);

        // 1. Exact (provider, subject) match wins: idempotent repeat login.
        if let Some(user) = self.find_user_by_identity("google", &claims.sub).await? {
            let tokens = self.issue_tokens(user.id).await?;
            return Ok((user, tokens));
        }

        // 2. Fall back to the email.
        let user = match self.find_user_by_email(&email).await? {
            None => {
                // Fresh account. The random hash satisfies the non-null
                // password column without opening a password login path.
                let password_hash = hash_password(&random_secret())?;
                self.insert_user(
                    &email,
                    &password_hash,
                    claims.name.clone(),
                    claims.picture.clone(),
                    Some("google"),
                    Some(&claims.sub),
                )
                .await
                .map_err(|e| match e {
                    ApiError::Database(db) if is_unique_violation(&db) => {
                        ApiError::IdentityConflict(
                            "This Google account is already linked to another user.".to_string(),
                        )
                    }
                    other => other,
                })?
            }
            Some(user) => {
                let provider = user.oauth_provider.clone();
                let subject = user.oauth_id.clone();
                match (provider.as_deref(), subject.as_deref()) {
                    // First-time linking of an existing password account.
                    (None, _) => self.bind_identity(&user, "google", &claims.sub).await?,
                    (Some("google"), Some(id)) if id == claims.sub => user,
                    (Some("google"), _) => {
                        return Err(ApiError::IdentityConflict(
                            "This email is already linked to a different Google profile."
                                .to_string(),
                        ));
                    }
                    (Some(p), _) => {
                        return Err(ApiError::IdentityConflict(format!(
                            "This email is already linked with {}. Please continue with {}.",
                            p,
                            titlecase(p)
                        )));
                    }
                }
            }
        };

        let tokens = self.issue_tokens(user.id).await?;
        Ok((user, tokens))
    }

    /// Mint an access + refresh pair and persist the refresh hash
    pub async fn issue_tokens(&self, user_id: Uuid) -> ApiResult<TokenPair> {
        let access = self.generate_token(user_id, "access")?;
        let refresh = self.generate_token(user_id, "refresh")?;

        let now = Utc::now();
        let expires_at = now + Duration::days(self.config.auth.refresh_token_expire_days);

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, revoked, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(hash_token(&refresh))
        .bind(expires_at)
        .bind(false)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(TokenPair { access, refresh })
    }

    /// Rotate a refresh token: revoke the presented one, mint a new pair
    ///
    /// Refresh tokens are single-use; a token consumed by a prior rotation
    /// is already revoked and fails here.
    pub async fn refresh_session(&self, raw: &str) -> ApiResult<(Uuid, TokenPair)> {
        let claims = self.decode_token(raw)?;
        if claims.token_type != "refresh" {
            return Err(ApiError::InvalidToken("Not a refresh token".to_string()));
        }

        let token_hash = hash_token(raw);
        let row = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token_hash, expires_at, revoked, created_at
             FROM refresh_tokens WHERE token_hash = ?1",
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::InvalidToken("Unknown refresh token".to_string()))?;

        if row.revoked {
            return Err(ApiError::InvalidToken(
                "Refresh token already used".to_string(),
            ));
        }
        if Utc::now() > row.expires_at {
            return Err(ApiError::InvalidToken("Refresh token expired".to_string()));
        }

        // The revoked guard makes rotation single-winner under concurrent
        // replays of the same token.
        let updated = sqlx::query(
            "UPDATE refresh_tokens SET revoked = 1 WHERE id = ?1 AND revoked = 0",
        )
        .bind(row.id)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::InvalidToken(
                "Refresh token already used".to_string(),
            ));
        }

        let tokens = self.issue_tokens(row.user_id).await?;
        Ok((row.user_id, tokens))
    }

    /// Revoke a refresh token; succeeds even when the token is unknown
    pub async fn logout(&self, raw: &str) -> ApiResult<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE token_hash = ?1")
            .bind(hash_token(raw))
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Validate an access token and load its account
    pub async fn validate_access_token(&self, token: &str) -> ApiResult<User> {
        let claims = self.decode_token(token)?;
        if claims.token_type != "access" {
            return Err(ApiError::InvalidToken("Not an access token".to_string()));
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::InvalidToken("Malformed subject claim".to_string()))?;

        self.get_user(user_id).await
    }

    /// Get account by id
    pub async fn get_user(&self, id: Uuid) -> ApiResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, full_name, avatar_url, oauth_provider, oauth_id,
                    created_at, updated_at
             FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))
    }

    /// Update profile fields; absent fields keep their value
    pub async fn update_profile(&self, id: Uuid, req: &UpdateProfileRequest) -> ApiResult<User> {
        let user = self.get_user(id).await?;

        let full_name = req.full_name.clone().or(user.full_name);
        let avatar_url = req.avatar_url.clone().or(user.avatar_url);

        sqlx::query(
            "UPDATE users SET full_name = ?1, avatar_url = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(&full_name)
        .bind(&avatar_url)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?;

        self.get_user(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, full_name, avatar_url, oauth_provider, oauth_id,
                    created_at, updated_at
             FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn find_user_by_identity(
        &self,
        provider: &str,
        subject: &str,
    ) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, full_name, avatar_url, oauth_provider, oauth_id,
                    created_at, updated_at
             FROM users WHERE oauth_provider = ?1 AND oauth_id = ?2",
        )
        .bind(provider)
        .bind(subject)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: Option<String>,
        avatar_url: Option<String>,
        oauth_provider: Option<&str>,
        oauth_id: Option<&str>,
    ) -> ApiResult<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, full_name, avatar_url,
                                oauth_provider, oauth_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(&full_name)
        .bind(&avatar_url)
        .bind(oauth_provider)
        .bind(oauth_id)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        self.get_user(id).await
    }

    async fn bind_identity(&self, user: &User, provider: &str, subject: &str) -> ApiResult<User> {
        sqlx::query(
            "UPDATE users SET oauth_provider = ?1, oauth_id = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(provider)
        .bind(subject)
        .bind(Utc::now())
        .bind(user.id)
        .execute(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                // Raced with another account claiming this identity
                ApiError::IdentityConflict(
                    "This Google account is already linked to another user.".to_string(),
                )
            } else {
                ApiError::Database(e)
            }
        })?;

        self.get_user(user.id).await
    }

    fn generate_token(&self, user_id: Uuid, token_type: &str) -> ApiResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = Utc::now();
        let ttl = match token_type {
            "refresh" => Duration::days(self.config.auth.refresh_token_expire_days),
            _ => Duration::minutes(self.config.auth.access_token_expire_minutes),
        };
        let jti = (token_type == "refresh").then(|| Uuid::new_v4().to_string());

        let claims = TokenClaims {
            sub: user_id.to_string(),
            token_type: token_type.to_string(),
            jti,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    fn decode_token(&self, token: &str) -> ApiResult<TokenClaims> {
        use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;

        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::InvalidToken("Token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::InvalidToken("Invalid token signature".to_string())
            }
            _ => ApiError::InvalidToken("Malformed token".to_string()),
        })
    }
}

/// Hash a password with Argon2id
fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored Argon2id hash (constant-time)
fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Hash a raw refresh token for storage and lookup
fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Random high-entropy secret for identity-only accounts
fn random_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn titlecase(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::test_config, db::test_support::memory_pool};

    async fn test_manager() -> AccountManager {
        let db = memory_pool().await;
        AccountManager::new(db, Arc::new(test_config()))
    }

    fn google_claims(sub: &str, email: &str) -> GoogleClaims {
        GoogleClaims {
            sub: sub.to_string(),
            email: email.to_string(),
            email_verified: true,
            name: Some("Test User".to_string()),
            picture: None,
        }
    }

    #[tokio::test]
    async fn register_then_login_returns_same_account() {
        let manager = test_manager().await;

        let (registered, _) = manager
            .register("alice@example.com", "password123", Some("Alice".into()))
            .await
            .unwrap();

        let (logged_in, tokens) = manager
            .login("alice@example.com", "password123")
            .await
            .unwrap();

        assert_eq!(registered.id, logged_in.id);
        assert!(!tokens.access.is_empty());
        assert!(!tokens.refresh.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let manager = test_manager().await;

        manager
            .register("A@x.com", "password123", None)
            .await
            .unwrap();

        let result = manager.register("a@x.com", "password456", None).await;
        assert!(matches!(result, Err(ApiError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn login_with_wrong_password_fails() {
        let manager = test_manager().await;

        manager
            .register("bob@example.com", "password123", None)
            .await
            .unwrap();

        let result = manager.login("bob@example.com", "wrong-password").await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials)));

        let result = manager.login("nobody@example.com", "password123").await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn google_login_is_idempotent() {
        let manager = test_manager().await;
        let claims = google_claims("sub-1", "carol@example.com");

        let (first, _) = manager.login_google(&claims).await.unwrap();
        let (second, _) = manager.login_google(&claims).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.oauth_provider.as_deref(), Some("google"));
        assert_eq!(first.oauth_id.as_deref(), Some("sub-1"));
    }

    #[tokio::test]
    async fn google_login_links_existing_password_account() {
        let manager = test_manager().await;

        let (registered, _) = manager
            .register("dave@example.com", "password123", None)
            .await
            .unwrap();
        assert!(registered.oauth_provider.is_none());

        let (linked, _) = manager
            .login_google(&google_claims("sub-dave", "dave@example.com"))
            .await
            .unwrap();

        assert_eq!(linked.id, registered.id);
        assert_eq!(linked.oauth_provider.as_deref(), Some("google"));
        assert_eq!(linked.oauth_id.as_deref(), Some("sub-dave"));
    }

    #[tokio::test]
    async fn google_login_with_different_subject_conflicts() {
        let manager = test_manager().await;

        manager
            .login_google(&google_claims("sub-a", "erin@example.com"))
            .await
            .unwrap();

        let result = manager
            .login_google(&google_claims("sub-b", "erin@example.com"))
            .await;
        assert!(matches!(result, Err(ApiError::IdentityConflict(_))));

        // The original binding is untouched.
        let (user, _) = manager
            .login_google(&google_claims("sub-a", "erin@example.com"))
            .await
            .unwrap();
        assert_eq!(user.oauth_id.as_deref(), Some("sub-a"));
    }

    #[tokio::test]
    async fn google_login_against_other_provider_conflicts() {
        let manager = test_manager().await;

        let (user, _) = manager
            .register("frank@example.com", "password123", None)
            .await
            .unwrap();
        sqlx::query("UPDATE users SET oauth_provider = 'github', oauth_id = 'gh-1' WHERE id = ?1")
            .bind(user.id)
            .execute(&manager.db)
            .await
            .unwrap();

        let result = manager
            .login_google(&google_claims("sub-f", "frank@example.com"))
            .await;
        assert!(matches!(result, Err(ApiError::IdentityConflict(_))));
    }

    #[tokio::test]
    async fn password_login_on_provider_bound_account_conflicts() {
        let manager = test_manager().await;

        manager
            .login_google(&google_claims("sub-g", "grace@example.com"))
            .await
            .unwrap();

        let result = manager.login("grace@example.com", "anything").await;
        assert!(matches!(result, Err(ApiError::IdentityConflict(_))));
    }

    #[tokio::test]
    async fn refresh_tokens_are_single_use() {
        let manager = test_manager().await;

        let (user, tokens) = manager
            .register("heidi@example.com", "password123", None)
            .await
            .unwrap();

        let (refreshed_id, rotated) = manager.refresh_session(&tokens.refresh).await.unwrap();
        assert_eq!(refreshed_id, user.id);
        assert_ne!(rotated.refresh, tokens.refresh);

        // Replay of the consumed token fails; the rotated one still works.
        let replay = manager.refresh_session(&tokens.refresh).await;
        assert!(matches!(replay, Err(ApiError::InvalidToken(_))));
        assert!(manager.refresh_session(&rotated.refresh).await.is_ok());
    }

    #[tokio::test]
    async fn logout_revokes_and_is_idempotent() {
        let manager = test_manager().await;

        let (_, tokens) = manager
            .register("ivan@example.com", "password123", None)
            .await
            .unwrap();

        manager.logout(&tokens.refresh).await.unwrap();
        let result = manager.refresh_session(&tokens.refresh).await;
        assert!(matches!(result, Err(ApiError::InvalidToken(_))));

        // Unknown and already-revoked tokens still succeed.
        manager.logout(&tokens.refresh).await.unwrap();
        manager.logout("not-a-real-token").await.unwrap();
    }

    #[tokio::test]
    async fn access_token_round_trip() {
        let manager = test_manager().await;

        let (user, tokens) = manager
            .register("judy@example.com", "password123", None)
            .await
            .unwrap();

        let validated = manager.validate_access_token(&tokens.access).await.unwrap();
        assert_eq!(validated.id, user.id);

        // A refresh token is not accepted where an access token is required.
        let result = manager.validate_access_token(&tokens.refresh).await;
        assert!(matches!(result, Err(ApiError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn update_profile_keeps_absent_fields() {
        let manager = test_manager().await;

        let (user, _) = manager
            .register("kim@example.com", "password123", Some("Kim".into()))
            .await
            .unwrap();

        let updated = manager
            .update_profile(
                user.id,
                &UpdateProfileRequest {
                    full_name: None,
                    avatar_url: Some("https://cdn.example.com/kim.png".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name.as_deref(), Some("Kim"));
        assert_eq!(
            updated.avatar_url.as_deref(),
            Some("https://cdn.example.com/kim.png")
        );
    }
}
