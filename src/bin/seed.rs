use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use freshmart_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, ROLE_ADMIN, ROLE_USER},
    },
};
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_account(&orm, "admin", "admin@freshmart.lk", "admin123", ROLE_ADMIN).await?;
    let user_id = ensure_account(&orm, "customer", "customer@freshmart.lk", "user123", ROLE_USER).await?;
    seed_products(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_account(
    orm: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Username.eq(username))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        role: Set(role.to_string()),
        agreed_to_terms: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    Ok(user.id)
}

async fn seed_products(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let catalog = [
        ("Red Rice 1kg", "Grains", dec!(320.00), 80),
        ("Carrots 500g", "Vegetables", dec!(140.00), 120),
        ("Coconut Milk 400ml", "Pantry", dec!(210.00), 60),
        ("King Coconut", "Beverages", dec!(150.00), 45),
        ("Fresh Milk 1L", "Dairy", dec!(480.00), 30),
        ("Brown Bread", "Bakery", dec!(260.00), 25),
        ("Green Beans 250g", "Vegetables", dec!(95.00), 70),
        ("Ceylon Tea 200g", "Beverages", dec!(850.00), 40),
    ];

    for (name, category, price, stock) in catalog {
        let exists = Products::find()
            .filter(ProdCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }
        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(Some(format!("{name} from local suppliers."))),
            category: Set(Some(category.to_string())),
            image_url: Set(None),
            price: Set(price),
            stock_quantity: Set(stock),
            rating: Set(0.0),
            units_sold: Set(0),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    Ok(())
}
