//! Service-account OAuth: RS256 bearer grant with a cached access token.
//!
//! One assertion JWT is signed per refresh and exchanged at the credential's
//! token endpoint. The resulting access token is cached and reused until
//! shortly before expiry.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::ServiceAccountKey;
use crate::errors::PushError;

/// OAuth scope for FCM sends.
const FIREBASE_MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Assertion validity requested from the token endpoint (1 hour, the
/// maximum Google accepts).
const ASSERTION_VALIDITY_SECONDS: i64 = 3600;

/// Refresh the cached token this many seconds before it expires.
const TOKEN_EXPIRY_BUFFER_SECONDS: i64 = 300;

/// JWT claims for the service-account bearer grant.
#[derive(Debug, Serialize, Deserialize)]
struct BearerClaims {
    /// Issuer (service-account email).
    iss: String,
    /// Requested scope.
    scope: String,
    /// Audience (the token endpoint itself).
    aud: String,
    /// Issued at (Unix timestamp).
    iat: i64,
    /// Expiry (Unix timestamp).
    exp: i64,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Cached access token with expiry tracking.
struct CachedToken {
    token: String,
    /// Expiry in epoch milliseconds, already shortened by the refresh buffer.
    expires_at: i64,
}

/// Current time in epoch milliseconds.
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Signs bearer assertions and caches the exchanged access token.
pub struct TokenService {
    client_email: String,
    token_uri: String,
    encoding_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service from a parsed service-account credential.
    ///
    /// Parses the RSA private key eagerly so a bad key fails at startup,
    /// not on the first delivery.
    pub fn new(account: &ServiceAccountKey) -> Result<Self, PushError> {
        let encoding_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| PushError::KeyParse {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client_email: account.client_email.clone(),
            token_uri: account.token_uri.clone(),
            encoding_key,
            cached: Mutex::new(None),
        })
    }

    /// Get a cached access token, refreshing through the token endpoint when
    /// stale.
    pub async fn access_token(&self, client: &reqwest::Client) -> Result<String, PushError> {
        let mut cached = self.cached.lock().await;

        if let Some(ref token) = *cached {
            if now_ms() < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        match self.fetch_token(client).await {
            Ok(token) => {
                metrics::counter!("push_token_refresh_total", "status" => "success").increment(1);
                let access_token = token.token.clone();
                *cached = Some(token);
                Ok(access_token)
            }
            Err(e) => {
                metrics::counter!("push_token_refresh_total", "status" => "failure").increment(1);
                Err(e)
            }
        }
    }

    /// Exchange a fresh assertion for an access token.
    async fn fetch_token(&self, client: &reqwest::Client) -> Result<CachedToken, PushError> {
        let assertion = self.sign_assertion()?;

        info!(token_uri = %self.token_uri, "refreshing FCM access token");
        let resp = client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let message = resp.text().await.unwrap_or_default();
            return Err(PushError::Auth { status, message });
        }

        let data: TokenResponse = resp.json().await?;
        let usable_seconds = (data.expires_in - TOKEN_EXPIRY_BUFFER_SECONDS).max(0);
        Ok(CachedToken {
            token: data.access_token,
            expires_at: now_ms() + usable_seconds * 1000,
        })
    }

    /// Sign a new RS256 bearer assertion.
    fn sign_assertion(&self) -> Result<String, PushError> {
        let header = Header::new(Algorithm::RS256);
        let iat = Utc::now().timestamp();
        let claims = BearerClaims {
            iss: self.client_email.clone(),
            scope: FIREBASE_MESSAGING_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_VALIDITY_SECONDS,
        };

        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            PushError::JwtSign {
                reason: e.to_string(),
            }
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY_PEM: &str =
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/rsa_test_key.pem"));

    fn account(token_uri: &str) -> ServiceAccountKey {
        ServiceAccountKey {
            project_id: "test-project".into(),
            client_email: "push@test-project.iam.gserviceaccount.com".into(),
            private_key: TEST_KEY_PEM.into(),
            token_uri: token_uri.into(),
        }
    }

    #[test]
    fn invalid_key_fails_at_construction() {
        let mut bad = account("https://oauth2.googleapis.com/token");
        bad.private_key = "not a valid PEM key".into();
        let err = TokenService::new(&bad).unwrap_err();
        assert_matches!(err, PushError::KeyParse { .. });
    }

    #[test]
    fn bearer_claims_serialize() {
        let claims = BearerClaims {
            iss: "push@test.iam".into(),
            scope: FIREBASE_MESSAGING_SCOPE.into(),
            aud: "https://oauth2.googleapis.com/token".into(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["iss"], "push@test.iam");
        assert_eq!(json["scope"], FIREBASE_MESSAGING_SCOPE);
        assert_eq!(json["exp"], 1_700_003_600);
    }

    #[test]
    fn assertion_is_a_signed_jwt() {
        let service = TokenService::new(&account("https://oauth2.googleapis.com/token")).unwrap();
        let jwt = service.sign_assertion().unwrap();
        assert_eq!(jwt.split('.').count(), 3);
    }

    #[tokio::test]
    async fn exchanges_assertion_for_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("jwt-bearer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test-token",
                "expires_in": 3600,
                "token_type": "Bearer",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = TokenService::new(&account(&format!("{}/token", server.uri()))).unwrap();
        let client = reqwest::Client::new();

        let token = service.access_token(&client).await.unwrap();
        assert_eq!(token, "ya29.test-token");

        // Second call is served from cache (mock expects exactly 1 request).
        let token = service.access_token(&client).await.unwrap();
        assert_eq!(token, "ya29.test-token");
    }

    #[tokio::test]
    async fn token_endpoint_rejection_surfaces_as_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#),
            )
            .mount(&server)
            .await;

        let service = TokenService::new(&account(&format!("{}/token", server.uri()))).unwrap();
        let err = service
            .access_token(&reqwest::Client::new())
            .await
            .unwrap_err();
        assert_matches!(err, PushError::Auth { status: 400, .. });
    }

    #[tokio::test]
    async fn expired_cache_refreshes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "short-lived",
                // Below the refresh buffer: cached entry is immediately stale.
                "expires_in": 10,
                "token_type": "Bearer",
            })))
            .expect(2)
            .mount(&server)
            .await;

        let service = TokenService::new(&account(&format!("{}/token", server.uri()))).unwrap();
        let client = reqwest::Client::new();
        let _ = service.access_token(&client).await.unwrap();
        let _ = service.access_token(&client).await.unwrap();
    }
}
