// Not every suite uses every helper.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use freshmart_api::{
    config::AppConfig,
    entity::{
        products,
        products::ActiveModel as ProductActive,
        users::{ActiveModel as UserActive, ROLE_ADMIN, ROLE_USER},
    },
    mailer::{EmailMessage, Mailer, MailerError},
    middleware::auth::AuthUser,
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, Schema, Set,
};
use uuid::Uuid;

/// Captures outbound mail so tests can assert on it.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailerError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

impl RecordingMailer {
    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.subject.clone())
            .collect()
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_secret_code: "ADMIN2025".to_string(),
        low_stock_threshold: 10,
        mover_threshold: 30,
        chatbot_api_key: Some("bot-key".to_string()),
        admin_email: "admin@freshmart.lk".to_string(),
    }
}

/// Fresh in-memory database with the full schema, plus a recording mailer.
/// A single connection keeps the in-memory database alive for the whole test.
pub async fn setup_state() -> anyhow::Result<(AppState, Arc<RecordingMailer>)> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1);
    let orm = Database::connect(options).await?;
    // Some tests drop tables mid-run to simulate lookup failures; SQLite's
    // enforced foreign keys would reject those drops.
    orm.execute_unprepared("PRAGMA foreign_keys = OFF").await?;

    let backend = orm.get_database_backend();
    let schema = Schema::new(backend);
    orm.execute(backend.build(&schema.create_table_from_entity(freshmart_api::entity::Users)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(freshmart_api::entity::Products)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(freshmart_api::entity::CartItems)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(freshmart_api::entity::Orders)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(freshmart_api::entity::OrderItems)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(freshmart_api::entity::Deliveries)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(freshmart_api::entity::Reviews)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(freshmart_api::entity::Sales)))
        .await?;
    orm.execute(backend.build(
        &schema.create_table_from_entity(freshmart_api::entity::RoleRequests),
    ))
    .await?;

    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState {
        orm,
        config: Arc::new(test_config()),
        mailer: mailer.clone(),
    };
    Ok((state, mailer))
}

pub async fn create_user(state: &AppState, username: &str) -> anyhow::Result<AuthUser> {
    create_account(state, username, ROLE_USER).await
}

pub async fn create_admin(state: &AppState, username: &str) -> anyhow::Result<AuthUser> {
    create_account(state, username, ROLE_ADMIN).await
}

async fn create_account(state: &AppState, username: &str, role: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set("dummy".to_string()),
        role: Set(role.to_string()),
        agreed_to_terms: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

pub async fn create_product(
    state: &AppState,
    name: &str,
    price: Decimal,
    stock: i32,
) -> anyhow::Result<products::Model> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(None),
        category: Set(Some("Groceries".to_string())),
        image_url: Set(None),
        price: Set(price),
        stock_quantity: Set(stock),
        rating: Set(0.0),
        units_sold: Set(0),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}
