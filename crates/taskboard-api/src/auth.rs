use std::sync::LazyLock;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rand_core::OsRng;
use tracing::{info, warn};
use uuid::Uuid;

use taskboard_db::is_unique_violation;
use taskboard_types::api::{LoginRequest, RegisterRequest, TokenResponse};

use crate::error::ApiError;
use crate::extract::AppJson;
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Same message for unknown email and wrong password.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Verified against when the email is unknown, so both login failures cost
/// one Argon2 verify.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("taskboard-dummy-password").ok());

pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_string();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let lookup = email.clone();
    if state
        .with_db(move |db| db.get_user_by_email(&lookup))
        .await?
        .is_some()
    {
        warn!("Registration rejected: email already registered");
        return Err(email_taken());
    }

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

    let user_id = Uuid::new_v4();
    let (id, stored_email) = (user_id.to_string(), email.clone());
    // The pre-check can race with a concurrent registration; the UNIQUE
    // constraint settles it.
    match state
        .with_db(move |db| Ok(db.create_user(&id, &stored_email, &password_hash)))
        .await?
    {
        Ok(()) => {}
        Err(e) if is_unique_violation(&e) => return Err(email_taken()),
        Err(e) => return Err(e.into()),
    }

    info!("Registered user {}", user_id);
    let token = state.tokens.issue(user_id, &email)?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = req.email.trim().to_string();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let lookup = email.clone();
    let user = state
        .with_db(move |db| db.get_user_by_email(&lookup))
        .await?;

    let password = req.password;
    let stored_hash = user.as_ref().map(|u| u.password.clone());
    let matches = tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_password(&password, &hash),
        None => {
            burn_verify(&password);
            Ok(false)
        }
    })
    .await??;

    let Some(user) = user else {
        warn!("Login failed: unknown email");
        return Err(ApiError::Auth(INVALID_CREDENTIALS.into()));
    };
    if !matches {
        warn!("Login failed: wrong password for user {}", user.id);
        return Err(ApiError::Auth(INVALID_CREDENTIALS.into()));
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("Corrupt user id '{}': {}", user.id, e))?;
    let token = state.tokens.issue(user_id, &user.email)?;

    Ok(Json(TokenResponse { token }))
}

fn email_taken() -> ApiError {
    ApiError::Conflict("Email already registered".into())
}

/// Argon2id with a fresh random salt, as a PHC string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// Runs a full verify against the dummy hash and discards the result.
fn burn_verify(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

/// `Ok(false)` on mismatch; `Err` only if the stored hash is unreadable.
pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted_phc_string() {
        let a = hash_password("secret1").unwrap();
        let b = hash_password("secret1").unwrap();

        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b, "each hash gets its own salt");
        assert!(!a.contains("secret1"));
    }

    #[test]
    fn verify_accepts_only_the_right_password() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
        assert!(verify_password("secret1", "not-a-phc-string").is_err());
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        let hash = DUMMY_HASH.as_deref().unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!verify_password("secret1", hash).unwrap());
    }
}
