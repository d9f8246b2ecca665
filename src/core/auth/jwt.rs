//! Signed session tokens
//!
//! The session strategy is a self-contained HS256 JWT. [`Token`] is the claim
//! set: the subject, the application claims written by the token enrichment
//! callback, and the registered claims stamped when the token is signed.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::{Config, DEFAULT_ISSUER, DEFAULT_SESSION_MAX_AGE_SECS};
use crate::core::db::models::{Role, SubRole, TokenUser};

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token lifetime in seconds
    pub max_age_secs: i64,
    /// Token issuer
    pub issuer: String,
}

impl JwtConfig {
    /// Create a new JWT configuration
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    /// Build from the application config
    pub fn from_config(config: &Config) -> Result<Self, JwtError> {
        let secret = config.signing_secret().ok_or(JwtError::MissingSecret)?;

        Ok(Self {
            secret: secret.to_string(),
            max_age_secs: config.session_max_age_secs,
            issuer: config.issuer.clone(),
        })
    }

    /// Set token lifetime
    pub fn max_age(mut self, secs: i64) -> Self {
        self.max_age_secs = secs;
        self
    }

    /// Set issuer
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

/// JWT errors
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("AUTH_SECRET environment variable not set")]
    MissingSecret,

    #[error("Token encoding failed: {0}")]
    EncodingError(String),

    #[error("Token decoding failed: {0}")]
    DecodingError(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    InvalidToken,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidIssuer => JwtError::InvalidToken,
            _ => JwtError::DecodingError(err.to_string()),
        }
    }
}

/// Session token claims.
///
/// Every application claim is optional: a freshly created token only has `sub`,
/// and a token whose user disappeared keeps whatever it had.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Subject (user ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Id of the mentor or admin profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_role: Option<SubRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiration time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// JWT ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Token {
    /// The token created at sign-in, before enrichment
    pub fn for_subject(sub: impl Into<String>) -> Self {
        Self {
            sub: Some(sub.into()),
            ..Default::default()
        }
    }

    /// Overwrite the application claims with the user's current values
    pub fn apply_user(&mut self, user: &TokenUser) {
        self.id = Some(user.id.clone());
        self.email = Some(user.email.clone());
        self.role = Some(user.role);
        self.sub_role = user.sub_role;
        self.image = user.image.clone();
        self.name = user.name.clone();
        self.real_id = user.real_id.clone();
    }
}

/// A signed token and the claims it was signed with
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: Token,
    pub expires_at: DateTime<Utc>,
}

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Stamp `iat`, `exp`, `jti` and `iss` onto the claims and sign them.
    ///
    /// A lifetime that overflows the timestamp range is an `EncodingError`.
    pub fn issue(&self, mut claims: Token) -> Result<SignedToken, JwtError> {
        let now = Utc::now();
        let expires_at = Duration::try_seconds(self.config.max_age_secs)
            .and_then(|max_age| now.checked_add_signed(max_age))
            .ok_or_else(|| {
                JwtError::EncodingError(format!(
                    "token lifetime of {}s is out of range",
                    self.config.max_age_secs
                ))
            })?;

        claims.iat = Some(now.timestamp());
        claims.exp = Some(expires_at.timestamp());
        claims.jti = Some(Uuid::new_v4().to_string());
        claims.iss = Some(self.config.issuer.clone());

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok(SignedToken {
            token,
            claims,
            expires_at,
        })
    }

    /// Validate signature, issuer and expiry, and decode the claims
    pub fn verify(&self, token: &str) -> Result<Token, JwtError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.leeway = 0;

        let token_data = decode::<Token>(token, &self.decoding_key, &validation)?;

        Ok(token_data.claims)
    }
}
