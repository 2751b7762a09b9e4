use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub restaurant: RestaurantSettings,
    pub stripe: StripeSettings,
    pub reviews: ReviewsSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Base URL of the storefront, used to build checkout return links.
    pub public_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
    /// Multi-document transactions need a replica set. Turn off for a
    /// standalone mongod.
    pub transactions: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub secret: String,
    pub ttl_secs: u64,
    pub issuer: String,
    pub cookie_name: String,
    pub secure: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RestaurantSettings {
    /// Hex ObjectId of the restaurant this deployment serves.
    pub id: Option<String>,
    pub name: String,
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub publishable_key: String,
    pub webhook_secret: String,
    pub currency: String,
    pub api_base: String,
    pub webhook_tolerance_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReviewsSettings {
    pub api_key: Option<String>,
    pub place_id: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("BISTRO")
                    .list_separator(",")
                    .with_list_parse_key("app.cors_origins")
                    .with_list_parse_key("restaurant.admin_emails")
                    .try_parsing(true),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("app.public_url", "http://localhost:5173")?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "bistro")?
            .set_default("database.transactions", true)?
            .set_default("session.secret", "change-me-in-production")?
            .set_default("session.ttl_secs", 5 * 24 * 3600)?
            .set_default("session.issuer", "bistro")?
            .set_default("session.cookie_name", "session")?
            .set_default("session.secure", false)?
            .set_default("restaurant.id", None::<String>)?
            .set_default("restaurant.name", "Bistro")?
            .set_default("restaurant.admin_emails", Vec::<String>::new())?
            .set_default("stripe.secret_key", "")?
            .set_default("stripe.publishable_key", "")?
            .set_default("stripe.webhook_secret", "")?
            .set_default("stripe.currency", "eur")?
            .set_default("stripe.api_base", "https://api.stripe.com")?
            .set_default("stripe.webhook_tolerance_secs", 300)?
            .set_default("reviews.api_key", None::<String>)?
            .set_default("reviews.place_id", None::<String>)?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load().expect("Failed to load default settings")
    }
}
