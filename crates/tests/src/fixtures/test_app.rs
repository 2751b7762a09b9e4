use bistro_api::{build_router, state::AppState};
use bistro_config::Settings;
use bistro_db::indexes::ensure_indexes;
use bson::oid::ObjectId;
use mongodb::{Client, Database, options::ClientOptions};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub const ADMIN_EMAIL: &str = "owner@bistro.test";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const SESSION_SECRET: &str = "test-secret-key-for-session-signing-32-chars";

/// A running test application with its own MongoDB database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub db: Database,
    pub settings: Settings,
    pub restaurant_id: ObjectId,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn a new test server connected to the test MongoDB.
    ///
    /// Requires a running MongoDB at localhost:27017.
    /// Set BISTRO__DATABASE__URL to override the connection string and
    /// BISTRO__DATABASE__TRANSACTIONS=true when it points at a replica set.
    /// Each test gets a unique database name for isolation.
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(|_| {}).await
    }

    /// Spawn a test server with customized settings.
    ///
    /// The `mutator` closure receives a `&mut Settings` after test defaults
    /// are applied.
    pub async fn spawn_with_settings(mutator: impl FnOnce(&mut Settings)) -> Self {
        let db_name = format!("bistro_test_{}", uuid::Uuid::new_v4().simple());
        let restaurant_id = ObjectId::new();

        let mut settings = test_settings();
        if let Ok(url) = std::env::var("BISTRO__DATABASE__URL") {
            settings.database.url = url;
        }
        if let Ok(flag) = std::env::var("BISTRO__DATABASE__TRANSACTIONS") {
            settings.database.transactions = flag == "true";
        }
        settings.database.name = db_name.clone();
        settings.restaurant.id = Some(restaurant_id.to_hex());

        // Apply caller's customizations
        mutator(&mut settings);

        let client_options = ClientOptions::parse(&settings.database.url)
            .await
            .expect("Failed to parse MongoDB URL");
        let mongo_client =
            Client::with_options(client_options).expect("Failed to create MongoDB client");
        let db = mongo_client.database(&db_name);

        ensure_indexes(&db).await.expect("Failed to create indexes");

        let app_state = AppState::new(db.clone(), settings.clone())
            .await
            .expect("Failed to create AppState");
        let app = build_router(app_state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            addr,
            base_url,
            db,
            settings,
            restaurant_id,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A client with an empty cookie jar, for acting as a second browser.
    pub fn fresh_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build HTTP client")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let db = self.db.clone();
        // Best effort cleanup: drop the test database
        tokio::spawn(async move {
            let _ = db.drop().await;
        });
    }
}

fn test_settings() -> Settings {
    Settings {
        app: bistro_config::AppSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
            public_url: "http://localhost:5173".to_string(),
        },
        database: bistro_config::DatabaseSettings {
            url: "mongodb://localhost:27017".to_string(),
            name: "bistro_test".to_string(),
            max_pool_size: Some(5),
            min_pool_size: Some(1),
            transactions: false,
        },
        session: bistro_config::SessionSettings {
            secret: SESSION_SECRET.to_string(),
            ttl_secs: 3600,
            issuer: "bistro".to_string(),
            cookie_name: "session".to_string(),
            secure: false,
        },
        restaurant: bistro_config::RestaurantSettings {
            id: None,
            name: "Test Bistro".to_string(),
            admin_emails: vec![ADMIN_EMAIL.to_string()],
        },
        stripe: bistro_config::StripeSettings {
            secret_key: "sk_test_dummy".to_string(),
            publishable_key: "pk_test_dummy".to_string(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
            currency: "eur".to_string(),
            // Unroutable unless a test points it at a fake gateway
            api_base: "http://127.0.0.1:9".to_string(),
            webhook_tolerance_secs: 300,
        },
        reviews: bistro_config::ReviewsSettings {
            api_key: None,
            place_id: None,
        },
    }
}
