mod common;

use common::setup_state;
use freshmart_api::{
    dto::auth::{LoginRequest, RegisterRequest},
    entity::users::{Column as UserCol, Entity as Users},
    error::AppError,
    services::auth_service,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

fn request(username: &str, email: &str, secret_code: Option<&str>) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: "s3cret-pass".to_string(),
        agreed_to_terms: true,
        secret_code: secret_code.map(str::to_string),
    }
}

#[tokio::test]
async fn wrong_secret_code_creates_nothing() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;

    let err = auth_service::register(&state, request("eve", "eve@example.com", Some("GUESS")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    // No silent downgrade to a USER account.
    let count = Users::find()
        .filter(UserCol::Username.eq("eve"))
        .count(&state.orm)
        .await?;
    assert_eq!(count, 0);

    Ok(())
}

#[tokio::test]
async fn correct_secret_code_grants_admin() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;

    let user = auth_service::register(
        &state,
        request("boss", "boss@example.com", Some("ADMIN2025")),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(user.role, "ADMIN");

    let user = auth_service::register(&state, request("pat", "pat@example.com", None))
        .await?
        .data
        .unwrap();
    assert_eq!(user.role, "USER");

    Ok(())
}

#[tokio::test]
async fn username_and_terms_rules() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;

    let err = auth_service::register(&state, request("12345", "nums@example.com", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let mut no_terms = request("sam", "sam@example.com", None);
    no_terms.agreed_to_terms = false;
    let err = auth_service::register(&state, no_terms).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn duplicates_are_rejected() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;

    auth_service::register(&state, request("kit", "kit@example.com", None)).await?;

    let err = auth_service::register(&state, request("kit", "other@example.com", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("Username")));

    let err = auth_service::register(&state, request("kit2", "kit@example.com", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("Email")));

    Ok(())
}

#[tokio::test]
async fn login_verifies_password() -> anyhow::Result<()> {
    unsafe {
        std::env::set_var("JWT_SECRET", "test-secret");
    }
    let (state, _mailer) = setup_state().await?;

    auth_service::register(&state, request("kit", "kit@example.com", None)).await?;

    let resp = auth_service::login(
        &state,
        LoginRequest {
            username: "kit".to_string(),
            password: "s3cret-pass".to_string(),
        },
    )
    .await?;
    assert!(resp.data.unwrap().token.starts_with("Bearer "));

    let err = auth_service::login(
        &state,
        LoginRequest {
            username: "kit".to_string(),
            password: "wrong".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    Ok(())
}
