mod common;

use common::{create_admin, create_product, create_user, setup_state};
use freshmart_api::{
    dto::{
        cart::AddToCartRequest,
        deliveries::UpdateDeliveryStatusRequest,
        orders::CheckoutRequest,
        reviews::{SubmitReviewRequest, UpdateReviewRequest},
    },
    entity::products::Entity as Products,
    error::AppError,
    middleware::auth::AuthUser,
    models::DeliveryStatus,
    services::{cart_service, delivery_service, order_service, review_service},
    state::AppState,
};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use uuid::Uuid;

async fn delivered_order(
    state: &AppState,
    user: &AuthUser,
    admin: &AuthUser,
    product_id: Uuid,
) -> anyhow::Result<Uuid> {
    cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            product_id,
            quantity: 1,
        },
    )
    .await?;
    let detail = order_service::checkout(
        state,
        user,
        CheckoutRequest {
            delivery_method: "PICKUP".to_string(),
            payment_method: None,
            address: None,
        },
    )
    .await?
    .data
    .unwrap();
    let delivery_id = detail.delivery.unwrap().id;

    for status in [
        DeliveryStatus::Shipped,
        DeliveryStatus::OutForDelivery,
        DeliveryStatus::Delivered,
    ] {
        delivery_service::update_status(
            state,
            admin,
            delivery_id,
            UpdateDeliveryStatusRequest { status },
        )
        .await?;
    }
    Ok(detail.order.id)
}

#[tokio::test]
async fn review_requires_delivered_order() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let user = create_user(&state, "shopper").await?;
    let carrots = create_product(&state, "Carrots", dec!(140.00), 10).await?;

    cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id: carrots.id,
            quantity: 1,
        },
    )
    .await?;
    let order = order_service::checkout(
        &state,
        &user,
        CheckoutRequest {
            delivery_method: "PICKUP".to_string(),
            payment_method: None,
            address: None,
        },
    )
    .await?
    .data
    .unwrap()
    .order;

    let err = review_service::submit_review(
        &state,
        &user,
        SubmitReviewRequest {
            order_id: order.id,
            comment: "Crunchy".to_string(),
            rating: 5,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    Ok(())
}

#[tokio::test]
async fn rating_mean_tracks_reviews() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let admin = create_admin(&state, "ops").await?;
    let alice = create_user(&state, "alice").await?;
    let bob = create_user(&state, "bob").await?;
    let tea = create_product(&state, "Ceylon Tea", dec!(850.00), 20).await?;

    let alice_order = delivered_order(&state, &alice, &admin, tea.id).await?;
    let bob_order = delivered_order(&state, &bob, &admin, tea.id).await?;

    review_service::submit_review(
        &state,
        &alice,
        SubmitReviewRequest {
            order_id: alice_order,
            comment: "Lovely aroma".to_string(),
            rating: 5,
        },
    )
    .await?;
    let bob_review = review_service::submit_review(
        &state,
        &bob,
        SubmitReviewRequest {
            order_id: bob_order,
            comment: "A bit stale".to_string(),
            rating: 2,
        },
    )
    .await?
    .data
    .unwrap();

    let tea_now = Products::find_by_id(tea.id).one(&state.orm).await?.unwrap();
    assert!((tea_now.rating - 3.5).abs() < f64::EPSILON);

    // Deleting one review re-averages over the remainder.
    review_service::delete_review(&state, &bob, bob_review.id).await?;
    let tea_now = Products::find_by_id(tea.id).one(&state.orm).await?.unwrap();
    assert!((tea_now.rating - 5.0).abs() < f64::EPSILON);

    Ok(())
}

#[tokio::test]
async fn one_review_per_order_and_ownership() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let admin = create_admin(&state, "ops").await?;
    let alice = create_user(&state, "alice").await?;
    let mallory = create_user(&state, "mallory").await?;
    let rice = create_product(&state, "Red Rice 1kg", dec!(320.00), 10).await?;

    let order_id = delivered_order(&state, &alice, &admin, rice.id).await?;

    // Wrong rating range.
    let err = review_service::submit_review(
        &state,
        &alice,
        SubmitReviewRequest {
            order_id,
            comment: "meh".to_string(),
            rating: 0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Someone else's order.
    let err = review_service::submit_review(
        &state,
        &mallory,
        SubmitReviewRequest {
            order_id,
            comment: "mine now".to_string(),
            rating: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let review = review_service::submit_review(
        &state,
        &alice,
        SubmitReviewRequest {
            order_id,
            comment: "Good rice".to_string(),
            rating: 4,
        },
    )
    .await?
    .data
    .unwrap();

    // Second review on the same order is rejected.
    let err = review_service::submit_review(
        &state,
        &alice,
        SubmitReviewRequest {
            order_id,
            comment: "Still good".to_string(),
            rating: 5,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // Only the author may edit.
    let err = review_service::update_review(
        &state,
        &mallory,
        review.id,
        UpdateReviewRequest {
            comment: "terrible".to_string(),
            rating: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // Moderators may remove any review, and the rating resets.
    review_service::delete_review_admin(&state, &admin, review.id).await?;
    let rice_now = Products::find_by_id(rice.id).one(&state.orm).await?.unwrap();
    assert_eq!(rice_now.rating, 0.0);

    Ok(())
}
