use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::User;

/// Request body for user registration. Presence of name/email/password is
/// validated in the handler so missing fields produce a 400 with the
/// expected message rather than a deserialization failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub farm_name: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Public part of the user returned to clients. The password hash never
/// appears here; `User` itself is not serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub farm_name: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            phone: user.phone,
            location: user.location,
            farm_name: user.farm_name,
        }
    }
}

/// Payload for register/login responses.
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: PublicUser,
}

/// Payload for identity lookups.
#[derive(Debug, Serialize)]
pub struct UserPayload {
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".into(),
            role: "farmer".into(),
            phone: Some("555-0100".into()),
            location: Some("Vinales".into()),
            farm_name: Some("Finca Ana".into()),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn public_user_never_carries_the_hash() {
        let public: PublicUser = sample_user().into();
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"farmName\""));
        assert!(json.contains("a@x.com"));
    }

    #[test]
    fn auth_payload_serializes_token_and_user() {
        let payload = AuthPayload {
            token: "abc.def.ghi".into(),
            user: sample_user().into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["token"], "abc.def.ghi");
        assert_eq!(json["user"]["email"], "a@x.com");
        assert!(json["user"].get("password").is_none());
    }

    #[test]
    fn register_request_accepts_partial_bodies() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"secret123"}"#).unwrap();
        assert!(req.name.is_none());
        assert_eq!(req.email.as_deref(), Some("a@x.com"));
    }
}
