use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, ROLE_ADMIN, ROLE_USER},
    error::{AppError, AppResult},
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Registration validation policy; the admin variant additionally gates on
/// the configured secret code. Selected by the caller, no trait objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationPolicy {
    User,
    Admin,
}

impl RegistrationPolicy {
    pub fn for_request(payload: &RegisterRequest) -> Self {
        if payload.secret_code.is_some() {
            RegistrationPolicy::Admin
        } else {
            RegistrationPolicy::User
        }
    }

    pub fn role(self) -> &'static str {
        match self {
            RegistrationPolicy::User => ROLE_USER,
            RegistrationPolicy::Admin => ROLE_ADMIN,
        }
    }

    pub fn validate(self, payload: &RegisterRequest, config: &AppConfig) -> AppResult<()> {
        if !payload.agreed_to_terms {
            return Err(AppError::BadRequest(
                "You must agree to the Privacy Policy to register.".into(),
            ));
        }
        if payload.username.trim().is_empty() {
            return Err(AppError::BadRequest("Username is required.".into()));
        }
        if payload.username.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::BadRequest(
                "Username should not contain only numbers.".into(),
            ));
        }
        if let RegistrationPolicy::Admin = self {
            let code = payload.secret_code.as_deref().unwrap_or_default();
            if code.trim().is_empty() {
                return Err(AppError::BadRequest(
                    "Admin secret code is required.".into(),
                ));
            }
            // A wrong code fails the registration outright; there is no
            // fallback to the USER role.
            if code != config.admin_secret_code {
                return Err(AppError::Unauthorized(
                    "Invalid admin secret code! Cannot register as admin.".into(),
                ));
            }
        }
        Ok(())
    }
}

pub async fn register(state: &AppState, payload: RegisterRequest) -> AppResult<ApiResponse<User>> {
    let policy = RegistrationPolicy::for_request(&payload);
    policy.validate(&payload, &state.config)?;

    let username_taken = Users::find()
        .filter(UserCol::Username.eq(payload.username.as_str()))
        .one(&state.orm)
        .await?
        .is_some();
    if username_taken {
        return Err(AppError::BadRequest("Username already taken.".into()));
    }

    let email_taken = Users::find()
        .filter(UserCol::Email.eq(payload.email.as_str()))
        .one(&state.orm)
        .await?
        .is_some();
    if email_taken {
        return Err(AppError::BadRequest("Email already registered.".into()));
    }

    let password_hash = hash_password(&payload.password)?;

    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(payload.username),
        email: Set(payload.email),
        password_hash: Set(password_hash),
        role: Set(policy.role().to_string()),
        agreed_to_terms: Set(payload.agreed_to_terms),
        created_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");

    Ok(ApiResponse::success("User created", user.into(), None))
}

pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<ApiResponse<LoginResponse>> {
    let user = Users::find()
        .filter(UserCol::Username.eq(payload.username.as_str()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => {
            return Err(AppError::Unauthorized(
                "Invalid username or password".into(),
            ));
        }
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized(
            "Invalid username or password".into(),
        ));
    }

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    let resp = LoginResponse {
        token: format!("Bearer {}", token),
    };

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}
