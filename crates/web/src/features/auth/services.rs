use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use raceday_storage::{
    Database,
    dto::auth::{LoginRequest, LoginResponse, UserInfo},
    repository::user::UserRepository,
};
use uuid::Uuid;

use crate::config::AdminAccount;
use crate::error::WebError;
use crate::middleware::auth::JwtKeys;

pub async fn login(
    db: &Database,
    keys: &JwtKeys,
    request: &LoginRequest,
) -> Result<LoginResponse, WebError> {
    let Some(user) = UserRepository::new(db.pool())
        .find_by_email(&request.email)
        .await?
    else {
        tracing::info!(email = %request.email, "Login for unknown account");
        return Err(WebError::Unauthorized);
    };

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::info!(user_id = %user.user_id, "Login with wrong password");
        return Err(WebError::Unauthorized);
    }

    let token = keys.issue(&user)?;
    tracing::info!(user_id = %user.user_id, "Operator logged in");

    Ok(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: keys.expiration_secs(),
        user: UserInfo::from(user),
    })
}

pub async fn current_user(db: &Database, user_id: Uuid) -> Result<UserInfo, WebError> {
    let user = UserRepository::new(db.pool()).find_by_id(user_id).await?;
    Ok(UserInfo::from(user))
}

/// Create the configured operator account unless the email already exists.
pub async fn ensure_admin(db: &Database, admin: &AdminAccount) -> anyhow::Result<()> {
    let repo = UserRepository::new(db.pool());

    if repo.find_by_email(&admin.email).await?.is_some() {
        tracing::debug!(email = %admin.email, "Admin account already present");
        return Ok(());
    }

    let hash = hash_password(&admin.password)?;
    let user = repo.create(&admin.name, &admin.email, &hash).await?;
    tracing::info!(user_id = %user.user_id, email = %user.email, "Admin account created");

    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, WebError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| WebError::InternalServerError(format!("Password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, WebError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| WebError::InternalServerError(format!("Invalid password hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
