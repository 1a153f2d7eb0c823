// Credential bundle handling and access-token exchange.
//
// Two kinds of pre-issued credential files are accepted:
// - `service_account`: a key file; we sign a JWT assertion with its
//   private key and trade it for a bearer token.
// - `authorized_user`: a refresh token obtained elsewhere; we trade it
//   for a bearer token.
// Nothing is written back to disk.

use crate::error::{AuthError, BackendError};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::blocking::Client;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::path::Path;

/// Full read/write access to the storage backend.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize, Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize, Clone)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// A pre-issued credential file. Immutable once loaded.
#[derive(Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialBundle {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

// Keep secrets out of logs.
impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialBundle::ServiceAccount(k) => f
                .debug_struct("ServiceAccount")
                .field("client_email", &k.client_email)
                .finish_non_exhaustive(),
            CredentialBundle::AuthorizedUser(u) => f
                .debug_struct("AuthorizedUser")
                .field("client_id", &u.client_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Claims of the signed service-account assertion.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Bearer token valid for the lifetime of one session.
#[derive(Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl CredentialBundle {
    /// Read and parse a credential file.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let data = std::fs::read_to_string(path).map_err(|e| AuthError::Credentials {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&data).map_err(|reason| AuthError::Credentials {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn parse(data: &str) -> Result<Self, String> {
        serde_json::from_str(data).map_err(|e| e.to_string())
    }

    fn token_uri(&self) -> &str {
        match self {
            CredentialBundle::ServiceAccount(k) => &k.token_uri,
            CredentialBundle::AuthorizedUser(u) => &u.token_uri,
        }
    }

    /// Exchange the bundle for a bearer token carrying `scope`.
    pub fn fetch_token(&self, client: &Client, scope: &str) -> Result<AccessToken, AuthError> {
        let now = Utc::now();
        let form: Vec<(&str, String)> = match self {
            CredentialBundle::ServiceAccount(key) => vec![
                ("grant_type", JWT_BEARER_GRANT.to_string()),
                ("assertion", sign_assertion(key, scope, now)?),
            ],
            CredentialBundle::AuthorizedUser(user) => vec![
                ("grant_type", "refresh_token".to_string()),
                ("client_id", user.client_id.clone()),
                ("client_secret", user.client_secret.clone()),
                ("refresh_token", user.refresh_token.clone()),
            ],
        };

        tracing::debug!(token_uri = self.token_uri(), "requesting access token");
        let res = client
            .post(self.token_uri())
            .form(&form)
            .send()
            .map_err(|e| AuthError::Token(e.into()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorBody>(&body) {
                Ok(err) => match err.error_description {
                    Some(desc) => format!("{}: {desc}", err.error),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(AuthError::Token(BackendError::Status {
                status: status.as_u16(),
                message,
            }));
        }

        let token: TokenResponse = res.json().map_err(|e| AuthError::Token(e.into()))?;
        Ok(AccessToken {
            value: token.access_token,
            expires_at: token.expires_in.and_then(|secs| expiry(now, secs)),
        })
    }
}

/// `None` when `secs` does not fit a representable instant.
fn expiry(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_seconds(secs).and_then(|d| now.checked_add_signed(d))
}

pub fn claims_for(key: &ServiceAccountKey, scope: &str, now: DateTime<Utc>) -> Claims {
    let iat = now.timestamp();
    Claims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: key.token_uri.clone(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    }
}

/// Build the RS256-signed JWT used for the bearer grant.
pub fn sign_assertion(
    key: &ServiceAccountKey,
    scope: &str,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let private_key = RsaPrivateKey::from_pkcs8_pem(&key.private_key)
        .map_err(|e| AuthError::Signing(e.to_string()))?;

    let mut header = serde_json::json!({ "alg": "RS256", "typ": "JWT" });
    if let Some(kid) = &key.private_key_id {
        header["kid"] = serde_json::Value::String(kid.clone());
    }
    let claims = claims_for(key, scope, now);
    let header_json = serde_json::to_vec(&header).map_err(|e| AuthError::Signing(e.to_string()))?;
    let claims_json = serde_json::to_vec(&claims).map_err(|e| AuthError::Signing(e.to_string()))?;
    let signing_input = format!("{}.{}", encode(&header_json), encode(&claims_json));

    let signer = SigningKey::<Sha256>::new(private_key);
    let signature = signer.sign(signing_input.as_bytes());
    Ok(format!("{signing_input}.{}", encode(&signature.to_bytes())))
}

fn encode(value: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(value)
}
