//! Bearer-token authentication for the contribution API
//!
//! API users are configured up front (there is no user table here; corpus
//! accounts live elsewhere). Each one maps a login to the corpus `user_id`
//! stamped on the contributions it records, plus a permission set.
//!
//! ```bash
//! CONTRIB_JWT_SECRET=your-super-secret-key-at-least-32-chars
//! CONTRIB_USERS=sentences:pw1:1:write,mod:pw2:2:moderate,ops:pw3:3:*
//!
//! curl -X POST http://localhost:3040/auth/token \
//!   -H "Content-Type: application/json" \
//!   -d '{"username":"mod","password":"pw2"}'
//! ```

use std::collections::HashMap;

use bcrypt::DEFAULT_COST;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// May record contributions and propagate languages
pub const PERMISSION_WRITE: &str = "write";
/// May see license entries, moderation listings and IP usage
pub const PERMISSION_MODERATE: &str = "moderate";
/// Grants every permission
pub const PERMISSION_ALL: &str = "*";

const MIN_SECRET_LEN: usize = 32;
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Signed token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Login name
    pub sub: String,
    /// Corpus user id, stamped on contributions
    pub uid: i64,
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn for_user(user: &ApiUser, ttl: Duration) -> Self {
        let issued = Utc::now();
        Self {
            sub: user.username.clone(),
            uid: user.user_id,
            permissions: user.permissions.clone(),
            iat: issued.timestamp(),
            exp: (issued + ttl).timestamp(),
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        grants(&self.permissions, permission)
    }
}

fn grants(permissions: &[String], permission: &str) -> bool {
    permissions
        .iter()
        .any(|p| p == permission || p == PERMISSION_ALL)
}

/// A configured API login
#[derive(Debug, Clone)]
pub struct ApiUser {
    pub username: String,
    pub user_id: i64,
    pub password_hash: String,
    pub permissions: Vec<String>,
}

impl ApiUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        grants(&self.permissions, permission)
    }
}

/// Response body of the token endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until expiry
    pub expires_in: i64,
}

/// Authentication errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),
    #[error("Invalid configuration for {var}: {reason}")]
    InvalidConfig { var: &'static str, reason: String },
    #[error("Token error: {0}")]
    TokenError(String),
    #[error("Token has expired")]
    TokenExpired,
    #[error("Hash error: {0}")]
    HashError(String),
    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

/// Issues and verifies HS256 access tokens for the configured API users
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    users: HashMap<String, ApiUser>,
    token_ttl: Duration,
    hash_cost: u32,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            users: HashMap::new(),
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            hash_cost: DEFAULT_COST,
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// bcrypt work factor for passwords added afterwards
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Read the secret and API users from the process environment
    ///
    /// - CONTRIB_JWT_SECRET: signing secret (required, at least 32 characters)
    /// - CONTRIB_USERS: comma-separated `name:password:user_id[:perm|perm]`
    /// - CONTRIB_ACCESS_TOKEN_TTL: token lifetime in seconds (default 3600)
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("CONTRIB_JWT_SECRET")
            .ok_or_else(|| AuthError::InvalidSecret("CONTRIB_JWT_SECRET is not set".to_string()))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::InvalidSecret(format!(
                "CONTRIB_JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        let mut auth = Self::new(&secret);

        if let Some(ttl) = lookup("CONTRIB_ACCESS_TOKEN_TTL") {
            let seconds = ttl
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| AuthError::InvalidConfig {
                    var: "CONTRIB_ACCESS_TOKEN_TTL",
                    reason: format!("'{}' is not a positive number of seconds", ttl),
                })?;
            auth.token_ttl = Duration::seconds(seconds);
        }

        if let Some(users) = lookup("CONTRIB_USERS") {
            for entry in users.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                let (username, password, user_id, permissions) =
                    parse_user_entry(entry).ok_or_else(|| AuthError::InvalidConfig {
                        var: "CONTRIB_USERS",
                        reason: "expected name:password:user_id[:perm|perm]".to_string(),
                    })?;
                auth.add_user(username, password, user_id, permissions)?;
            }
        }

        if auth.users.is_empty() {
            warn!("no API users configured; write and moderation endpoints are unreachable");
        }
        info!("Loaded {} API users", auth.users.len());

        Ok(auth)
    }

    /// Register a login; the password is stored bcrypt-hashed
    pub fn add_user(
        &mut self,
        username: &str,
        password: &str,
        user_id: i64,
        permissions: Vec<String>,
    ) -> Result<(), AuthError> {
        let password_hash = bcrypt::hash(password, self.hash_cost)
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.users.insert(
            username.to_string(),
            ApiUser {
                username: username.to_string(),
                user_id,
                password_hash,
                permissions,
            },
        );
        Ok(())
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<&ApiUser, AuthError> {
        let user = self.users.get(username).ok_or(AuthError::InvalidCredentials)?;

        match bcrypt::verify(password, &user.password_hash) {
            Ok(true) => Ok(user),
            _ => {
                debug!(username, "rejected login");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    pub fn generate_token(&self, user: &ApiUser) -> Result<AccessToken, AuthError> {
        let claims = Claims::for_user(user, self.token_ttl);
        let access_token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(e.to_string()))?;

        Ok(AccessToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_ttl.num_seconds(),
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenError(e.to_string()),
            })
    }

    /// Validate an `Authorization` header value (`Bearer <token>`)
    pub fn validate_authorization(&self, header: &str) -> Result<Claims, AuthError> {
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthError::TokenError("expected a Bearer token".to_string()))?;
        self.validate_token(token.trim())
    }
}

/// `name:password:user_id[:perm|perm]`, permissions default to `write`
fn parse_user_entry(entry: &str) -> Option<(&str, &str, i64, Vec<String>)> {
    let mut parts = entry.splitn(4, ':');
    let username = parts.next().filter(|s| !s.is_empty())?;
    let password = parts.next()?;
    let user_id = parts.next()?.parse::<i64>().ok()?;
    let permissions = match parts.next() {
        Some(perms) => perms
            .split('|')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        None => vec![PERMISSION_WRITE.to_string()],
    };

    Some((username, password, user_id, permissions))
}
