use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::JwtConfig, error::ApiError, state::AppState};

/// Claims carried by a bearer token: the user identity, issuance time and
/// expiry. Nothing is persisted server-side; expiry is the only lifecycle.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Signing/verification keys derived from process configuration at startup.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expire: TimeDuration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("expire", &self.expire)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    /// Fails with a configuration error when the signing secret is absent.
    /// `AppConfig::from_env` already guarantees presence at startup, so this
    /// surfacing as a runtime 500 means the deployment is broken.
    pub fn from_config(config: &JwtConfig) -> Result<Self, ApiError> {
        if config.secret.is_empty() {
            return Err(ApiError::Config(
                "JWT_SECRET is not set in environment variables".into(),
            ));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            expire: TimeDuration::days(config.expire_days),
        })
    }

    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + self.expire;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Rejects bad signatures, malformed tokens, and expired tokens.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Extracts and validates the bearer token, yielding the user id for
/// downstream handlers. Rejection is the uniform 401 failure envelope.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Auth("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Auth("Invalid Authorization header".into()))?;

        let keys = JwtKeys::from_config(&state.config.jwt)?;
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Auth("Invalid or expired token".into())
        })?;

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(expire_days: i64) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "dev-secret".into(),
            expire_days,
        })
        .expect("keys should construct")
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys(7);
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let keys = make_keys(7);
        let other = JwtKeys::from_config(&JwtConfig {
            secret: "other-secret".into(),
            expire_days: 7,
        })
        .unwrap();
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        // Negative expiry puts exp well past the validation leeway.
        let keys = make_keys(-1);
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_malformed_token() {
        let keys = make_keys(7);
        assert!(keys.verify("not.a.jwt").is_err());
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        let err = JwtKeys::from_config(&JwtConfig {
            secret: String::new(),
            expire_days: 7,
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
