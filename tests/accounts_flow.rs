mod common;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
};
use common::{create_admin, create_product, create_user, setup_state};
use freshmart_api::{
    dto::{
        cart::AddToCartRequest,
        chatbot::ChatbotOrdersQuery,
        orders::CheckoutRequest,
        users::{ProcessRoleRequest, RoleRequestAction, UpdateProfileRequest},
    },
    error::AppError,
    routes::chatbot,
    services::{cart_service, order_service, user_service},
};
use rust_decimal_macros::dec;

#[tokio::test]
async fn role_request_lifecycle() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let admin = create_admin(&state, "ops").await?;
    let user = create_user(&state, "hopeful").await?;

    // Admins have nothing to request.
    let err = user_service::submit_role_request(&state, &admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let submitted = user_service::submit_role_request(&state, &user)
        .await?
        .data
        .unwrap();

    // Only one open request at a time.
    let err = user_service::submit_role_request(&state, &user)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let pending = user_service::pending_role_requests(&state, &admin)
        .await?
        .data
        .unwrap();
    assert_eq!(pending.items.len(), 1);
    assert_eq!(pending.items[0].username, "hopeful");

    user_service::process_role_request(
        &state,
        &admin,
        submitted.id,
        ProcessRoleRequest {
            action: RoleRequestAction::Approve,
        },
    )
    .await?;

    let profile = user_service::get_profile(&state, &user).await?.data.unwrap();
    assert_eq!(profile.role, "ADMIN");

    // Processing twice is rejected.
    let err = user_service::process_role_request(
        &state,
        &admin,
        submitted.id,
        ProcessRoleRequest {
            action: RoleRequestAction::Deny,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    Ok(())
}

#[tokio::test]
async fn denied_request_leaves_role_alone() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let admin = create_admin(&state, "ops").await?;
    let user = create_user(&state, "hopeful").await?;

    let submitted = user_service::submit_role_request(&state, &user)
        .await?
        .data
        .unwrap();
    user_service::process_role_request(
        &state,
        &admin,
        submitted.id,
        ProcessRoleRequest {
            action: RoleRequestAction::Deny,
        },
    )
    .await?;

    let profile = user_service::get_profile(&state, &user).await?.data.unwrap();
    assert_eq!(profile.role, "USER");

    // A denied request no longer blocks a fresh one.
    user_service::submit_role_request(&state, &user).await?;

    Ok(())
}

#[tokio::test]
async fn profile_updates_enforce_uniqueness() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let alice = create_user(&state, "alice").await?;
    let _bob = create_user(&state, "bob").await?;

    let err = user_service::update_profile(
        &state,
        &alice,
        UpdateProfileRequest {
            username: Some("bob".to_string()),
            email: None,
            password: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let updated = user_service::update_profile(
        &state,
        &alice,
        UpdateProfileRequest {
            username: Some("alice2".to_string()),
            email: Some("alice2@example.com".to_string()),
            password: Some("new-pass".to_string()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.username, "alice2");
    assert_eq!(updated.email, "alice2@example.com");

    Ok(())
}

#[tokio::test]
async fn user_listing_is_admin_only() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let admin = create_admin(&state, "ops").await?;
    let user = create_user(&state, "shopper").await?;

    let err = user_service::list_users(&state, &user).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let listed = user_service::list_users(&state, &admin).await?.data.unwrap();
    assert_eq!(listed.items.len(), 2);

    let count = user_service::user_count(&state, &admin).await?.data.unwrap();
    assert_eq!(count.registered_users, 2);

    Ok(())
}

#[tokio::test]
async fn chatbot_requires_key_and_summarizes_orders() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let user = create_user(&state, "shopper").await?;
    let rice = create_product(&state, "Red Rice 1kg", dec!(320.00), 10).await?;

    cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id: rice.id,
            quantity: 2,
        },
    )
    .await?;
    order_service::checkout(
        &state,
        &user,
        CheckoutRequest {
            delivery_method: "PICKUP".to_string(),
            payment_method: None,
            address: None,
        },
    )
    .await?;

    // Missing key.
    let err = chatbot::orders_for_customer(
        State(state.clone()),
        HeaderMap::new(),
        Query(ChatbotOrdersQuery {
            email: "shopper".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let mut headers = HeaderMap::new();
    headers.insert("x-api-key", "bot-key".parse().unwrap());

    // Lookup works by username and by email.
    for handle in ["shopper", "shopper@example.com"] {
        let resp = chatbot::orders_for_customer(
            State(state.clone()),
            headers.clone(),
            Query(ChatbotOrdersQuery {
                email: handle.to_string(),
            }),
        )
        .await?;
        let summaries = resp.0.data.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_amount, dec!(640.00));
        assert_eq!(summaries[0].items, "2x Red Rice 1kg");
        assert_eq!(summaries[0].address, "Pickup / No Address");
    }

    Ok(())
}
