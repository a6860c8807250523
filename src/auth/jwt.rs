use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::claims::{Claims, TokenError, UserRole},
    config::JwtConfig,
    state::AppState,
};

/// Holds JWT signing and verification keys plus the configured TTL.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: TimeDuration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig { secret, ttl_days } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: TimeDuration::days(ttl_days),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid, email: &str, role: UserRole) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + self.ttl;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, role = ?role, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::default();
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, "jwt verified");
                Ok(data.claims)
            }
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidToken | ErrorKind::InvalidSignature => TokenError::Invalid,
                _ => TokenError::Unverifiable,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    // AppState::fake() builds a lazy pool, which needs a runtime to spawn
    // its maintenance tasks, hence tokio::test throughout.
    fn make_keys() -> JwtKeys {
        JwtKeys::from_ref(&AppState::fake())
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "a@x.com", UserRole::User).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, UserRole::User);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn expired_token_is_distinguished() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc();
        // Expired two hours ago, well past the default leeway.
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@x.com".into(),
            role: UserRole::User,
            iat: (now - TimeDuration::hours(3)).unix_timestamp() as usize,
            exp: (now - TimeDuration::hours(2)).unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert_eq!(keys.verify(&token), Err(TokenError::Expired));
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let keys = make_keys();
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"other-secret"),
            decoding: DecodingKey::from_secret(b"other-secret"),
            ttl: TimeDuration::days(7),
        };
        let token = other
            .sign(Uuid::new_v4(), "a@x.com", UserRole::Admin)
            .expect("sign");
        assert_eq!(keys.verify(&token), Err(TokenError::Invalid));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let keys = make_keys();
        let err = keys.verify("not.a.token").unwrap_err();
        assert_ne!(err, TokenError::Expired);
    }

    #[tokio::test]
    async fn demoted_admin_token_keeps_old_role_until_expiry() {
        // Tokens carry role claims verbatim; there is no revocation list.
        let keys = make_keys();
        let token = keys
            .sign(Uuid::new_v4(), "boss@x.com", UserRole::Admin)
            .expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.role, UserRole::Admin);
    }
}
