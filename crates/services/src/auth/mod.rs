use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use argon2::password_hash::rand_core::OsRng;
use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use bistro_config::SessionSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Session expired")]
    SessionExpired,
    #[error("Session revoked")]
    SessionRevoked,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Password hash error: {0}")]
    HashError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    /// Session id, matched against the `sessions` collection.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
    pub max_age_secs: u64,
}

pub struct AuthService {
    settings: SessionSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(settings: SessionSettings) -> Self {
        let encoding_key = EncodingKey::from_secret(settings.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(settings.secret.as_bytes());
        Self {
            settings,
            encoding_key,
            decoding_key,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.settings.cookie_name
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?;
        Ok(hash.to_string())
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    pub fn issue_session(&self, user_id: ObjectId, email: &str) -> Result<IssuedSession, AuthError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.settings.ttl_secs as i64);
        let jti = uuid::Uuid::new_v4().simple().to_string();

        let claims = Claims {
            sub: user_id.to_hex(),
            email: email.to_string(),
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.settings.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(IssuedSession {
            token,
            jti,
            expires_at,
            max_age_secs: self.settings.ttl_secs,
        })
    }

    /// Checks signature, issuer and expiry. Revocation is checked by the
    /// caller against the session store.
    pub fn verify_session_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.settings.issuer]);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::SessionExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            },
        )?;

        Ok(token_data.claims)
    }

    /// `Set-Cookie` value carrying a freshly issued session.
    pub fn session_cookie(&self, session: &IssuedSession) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            self.settings.cookie_name, session.token, session.max_age_secs
        );
        if self.settings.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0",
            self.settings.cookie_name
        )
    }
}
