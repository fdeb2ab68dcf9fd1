use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthPayload, LoginRequest, PublicUser, RegisterRequest, UserPayload},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo::{CreateUserError, NewUser, User},
    },
    error::ApiError,
    response::Envelope,
    state::AppState,
};

/// Identical for unknown email and wrong password, so a caller cannot tell
/// which factor failed.
const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Creating the record and signing the token are not transactional. If the
/// sign fails after the insert, the request surfaces a 500 but the user
/// exists and login derives a fresh token from the stored credentials.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<AuthPayload>>), ApiError> {
    let (name, email, password) = match (
        required(&payload.name),
        required(&payload.email),
        required(&payload.password),
    ) {
        (Some(name), Some(email), Some(password)) => (name, email, password),
        _ => {
            warn!("registration missing fields");
            return Err(ApiError::Validation(
                "Name, email, and password are required".into(),
            ));
        }
    };
    let email = email.to_lowercase();

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    // Friendly pre-check; the unique constraint still backstops the race.
    let existing = User::find_by_email(&state.db, &email)
        .await
        .map_err(|e| ApiError::internal("Server error during registration", e))?;
    if existing.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Validation(
            "User already exists with this email".into(),
        ));
    }

    let password_hash = hash_password(password)
        .map_err(|e| ApiError::internal("Server error during registration", e))?;

    let user = User::create(
        &state.db,
        NewUser {
            name,
            email: &email,
            password_hash: &password_hash,
            role: payload.role.as_deref().unwrap_or("user"),
            phone: payload.phone.as_deref(),
            location: payload.location.as_deref(),
            farm_name: payload.farm_name.as_deref(),
        },
    )
    .await
    .map_err(|e| match e {
        CreateUserError::DuplicateEmail => {
            ApiError::Validation("User already exists with this email".into())
        }
        CreateUserError::Database(e) => {
            ApiError::internal("Server error during registration", e)
        }
    })?;

    let keys = JwtKeys::from_config(&state.config.jwt)?;
    let token = keys
        .sign(user.id)
        .map_err(|e| ApiError::internal("Server error during registration", e))?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "User registered successfully",
            AuthPayload {
                token,
                user: PublicUser::from(user),
            },
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Envelope<AuthPayload>>, ApiError> {
    let (email, password) = match (required(&payload.email), required(&payload.password)) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            warn!("login missing fields");
            return Err(ApiError::Validation(
                "Email and password are required".into(),
            ));
        }
    };
    let email = email.to_lowercase();

    let user = match User::find_by_email(&state.db, &email)
        .await
        .map_err(|e| ApiError::internal("Server error during login", e))?
    {
        Some(user) => user,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::Auth(INVALID_CREDENTIALS.into()));
        }
    };

    let ok = verify_password(password, &user.password_hash)
        .map_err(|e| ApiError::internal("Server error during login", e))?;
    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Auth(INVALID_CREDENTIALS.into()));
    }

    let keys = JwtKeys::from_config(&state.config.jwt)?;
    let token = keys
        .sign(user.id)
        .map_err(|e| ApiError::internal("Server error during login", e))?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(Envelope::with_message(
        "Login successful",
        AuthPayload {
            token,
            user: PublicUser::from(user),
        },
    )))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Envelope<UserPayload>>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| ApiError::internal("Server error", e))?
        .ok_or_else(|| {
            warn!(user_id = %user_id, "authenticated user no longer exists");
            ApiError::NotFound("User not found".into())
        })?;

    Ok(Json(Envelope::ok(UserPayload {
        user: PublicUser::from(user),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_email_and_wrong_password_share_one_message() {
        // Both login failure paths return this exact constant; equality here
        // pins the indistinguishability guarantee.
        let unknown_email = ApiError::Auth(INVALID_CREDENTIALS.into());
        let wrong_password = ApiError::Auth(INVALID_CREDENTIALS.into());
        assert_eq!(unknown_email.to_string(), wrong_password.to_string());
        assert_eq!(unknown_email.to_string(), "Invalid email or password");
    }

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("ana.perez@farm.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
    }

    #[test]
    fn required_rejects_blank_fields() {
        assert_eq!(required(&Some("  Ana ".into())), Some("Ana"));
        assert_eq!(required(&Some("   ".into())), None);
        assert_eq!(required(&None), None);
    }
}
