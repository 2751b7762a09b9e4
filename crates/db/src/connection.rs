use bistro_config::DatabaseSettings;
use mongodb::{Client, Database, options::ClientOptions};
use tracing::{info, warn};

pub async fn connect(settings: &DatabaseSettings) -> Result<Database, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse(&settings.url).await?;
    client_options.app_name = Some("bistro".to_string());

    if let Some(max_pool) = settings.max_pool_size {
        client_options.max_pool_size = Some(max_pool);
    }
    if let Some(min_pool) = settings.min_pool_size {
        client_options.min_pool_size = Some(min_pool);
    }

    let client = Client::with_options(client_options)?;

    // `hello` doubles as the connectivity check and tells us whether the
    // deployment can run multi-document transactions.
    let hello = client
        .database("admin")
        .run_command(bson::doc! { "hello": 1 })
        .await?;

    let replicated = hello.contains_key("setName") || hello.get_str("msg").ok() == Some("isdbgrid");
    if settings.transactions && !replicated {
        warn!(
            db = %settings.name,
            "database.transactions is enabled but the server is standalone; catalog writes will fail"
        );
    }

    info!(db = %settings.name, replicated, "Connected to MongoDB");

    Ok(client.database(&settings.name))
}
