use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{AuthStatusResponse, LoginRequest, RegisterRequest, SessionUser},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::{User, UserStore},
    },
    error::AppError,
};

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 30;
const PASSWORD_MIN: usize = 6;
/// Width of the `users.email` column.
const EMAIL_MAX: usize = 100;
const BAD_CREDENTIALS: &str = "Invalid email or password";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str) -> Result<(), AppError> {
    if email.chars().count() > EMAIL_MAX || !is_valid_email(email) {
        return Err(AppError::validation("Please provide a valid email address"));
    }
    Ok(())
}

/// Registration input that passed validation.
#[derive(Debug, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

pub fn validate_registration(req: RegisterRequest) -> Result<NewUser, AppError> {
    let (Some(name), Some(email), Some(password)) =
        (present(req.name), present(req.email), present(req.password))
    else {
        return Err(AppError::validation("All fields are required"));
    };

    let name = name.trim().to_string();
    let name_len = name.chars().count();
    if !(NAME_MIN..=NAME_MAX).contains(&name_len) {
        return Err(AppError::validation(
            "Name must be between 2 and 30 characters long",
        ));
    }

    let email = normalize_email(&email);
    check_email(&email)?;

    if password.chars().count() < PASSWORD_MIN {
        return Err(AppError::validation(
            "Password must be at least 6 characters long",
        ));
    }

    Ok(NewUser {
        name,
        email,
        password,
    })
}

/// Create an account and issue its first token.
pub async fn register(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> Result<(User, String), AppError> {
    let new_user = validate_registration(req)?;

    if users.find_by_email(&new_user.email).await?.is_some() {
        warn!(email = %new_user.email, "email already registered");
        return Err(AppError::Conflict(
            "User with this email already exists".into(),
        ));
    }

    let hash = hash_password(&new_user.password)?;
    let user = users
        .create(&new_user.name, &new_user.email, &hash)
        .await?
        .ok_or_else(|| {
            warn!(email = %new_user.email, "email registered concurrently");
            AppError::Conflict("User with this email already exists".into())
        })?;

    let token = keys.sign(user.id, &user.email)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((user, token))
}

/// Check credentials and issue a fresh token. Unknown email and wrong
/// password produce the same error.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<(User, String), AppError> {
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(AppError::validation("Email and password are required"));
    };

    let email = normalize_email(&email);
    check_email(&email)?;

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let token = keys.sign(user.id, &user.email)?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, token))
}

/// Best-effort session check; any verification failure reads as signed out.
pub fn auth_status(keys: &JwtKeys, token: Option<&str>) -> AuthStatusResponse {
    match token.map(|t| keys.verify(t)) {
        Some(Ok(claims)) => AuthStatusResponse {
            authenticated: true,
            user: Some(SessionUser {
                user_id: claims.user_id,
                email: claims.email,
            }),
        },
        _ => AuthStatusResponse {
            authenticated: false,
            user: None,
        },
    }
}
