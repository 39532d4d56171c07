use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Secret code required to register an ADMIN account.
    pub admin_secret_code: String,
    /// Stock level at or below which a product counts as low stock.
    pub low_stock_threshold: i32,
    /// Units-sold threshold separating fast movers from slow movers.
    pub mover_threshold: i64,
    /// Shared secret for the chatbot integration; unset disables the endpoint.
    pub chatbot_api_key: Option<String>,
    /// Recipient of low-stock alert emails.
    pub admin_email: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let admin_secret_code =
            env::var("ADMIN_SECRET_CODE").unwrap_or_else(|_| "ADMIN2025".to_string());
        let low_stock_threshold = env::var("LOW_STOCK_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(10);
        let mover_threshold = env::var("MOVER_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(30);
        let chatbot_api_key = env::var("CHATBOT_API_KEY").ok().filter(|k| !k.is_empty());
        let admin_email =
            env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@freshmart.lk".to_string());
        Ok(Self {
            database_url,
            host,
            port,
            admin_secret_code,
            low_stock_threshold,
            mover_threshold,
            chatbot_api_key,
            admin_email,
        })
    }
}
