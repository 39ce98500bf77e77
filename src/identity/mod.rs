/// External identity verification
///
/// Verifies Google ID tokens against the tokeninfo endpoint and produces the
/// authenticated claims the account manager reconciles against the store.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Verified claims from a Google ID token
///
/// `sub` is the stable per-user identifier; the email may change across
/// logins for the same subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    sub: String,
    email: String,
    #[serde(default)]
    email_verified: String,
    aud: String,
    name: Option<String>,
    picture: Option<String>,
}

/// Verifier for Google ID tokens
pub struct GoogleTokenVerifier {
    client: reqwest::Client,
    client_id: String,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self { client, client_id }
    }

    /// Verify a raw ID token and return its claims
    ///
    /// The tokeninfo endpoint checks the signature and expiry; audience and
    /// email verification are enforced here. Network failure maps to
    /// `UpstreamUnavailable`, a rejected or malformed token to `InvalidToken`.
    pub async fn verify(&self, id_token: &str) -> ApiResult<GoogleClaims> {
        let response = self
            .client
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Google tokeninfo request failed: {}", e);
                ApiError::UpstreamUnavailable("Google token verification unavailable".to_string())
            })?;

        if !response.status().is_success() {
            return Err(ApiError::InvalidToken(
                "Google rejected the ID token".to_string(),
            ));
        }

        let info: TokenInfoResponse = response.json().await.map_err(|_| {
            ApiError::InvalidToken("Malformed tokeninfo response".to_string())
        })?;

        if info.aud != self.client_id {
            return Err(ApiError::InvalidToken(
                "ID token issued for a different client".to_string(),
            ));
        }

        // Google serializes booleans as strings in tokeninfo responses.
        if info.email_verified != "true" {
            return Err(ApiError::InvalidToken(
                "Google account email is not verified".to_string(),
            ));
        }

        Ok(GoogleClaims {
            sub: info.sub,
            email: info.email,
            email_verified: true,
            name: info.name,
            picture: info.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokeninfo_response_parses_google_shape() {
        let body = r#"{
            "sub": "110169484474386276334",
            "email": "user@example.com",
            "email_verified": "true",
            "aud": "client-123.apps.googleusercontent.com",
            "name": "Example User",
            "picture": "https://lh3.googleusercontent.com/a/photo"
        }"#;

        let info: TokenInfoResponse = serde_json::from_str(body).unwrap();
        assert_eq!(info.sub, "110169484474386276334");
        assert_eq!(info.email_verified, "true");
        assert_eq!(info.aud, "client-123.apps.googleusercontent.com");
    }

    #[test]
    fn tokeninfo_response_tolerates_missing_optionals() {
        let body = r#"{
            "sub": "1",
            "email": "user@example.com",
            "aud": "client"
        }"#;

        let info: TokenInfoResponse = serde_json::from_str(body).unwrap();
        assert!(info.name.is_none());
        assert!(info.picture.is_none());
        assert_eq!(info.email_verified, "");
    }
}
