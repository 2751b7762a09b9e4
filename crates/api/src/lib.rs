pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me).put(routes::auth::update_me));

    // Public menu plus staff item management
    let menu_routes = Router::new()
        .route("/", get(routes::menu::public_menu))
        .route(
            "/items",
            get(routes::menu::list_items).post(routes::menu::create_item),
        )
        .route(
            "/items/{item_id}",
            get(routes::menu::get_item)
                .put(routes::menu::update_item)
                .delete(routes::menu::delete_item),
        )
        .route(
            "/items/{item_id}/availability",
            put(routes::menu::set_availability),
        );

    let category_routes = Router::new()
        .route(
            "/",
            get(routes::category::list).post(routes::category::create),
        )
        .route(
            "/{name}",
            put(routes::category::rename).delete(routes::category::delete),
        );

    let faq_routes = Router::new()
        .route("/", get(routes::faq::list).post(routes::faq::create))
        .route(
            "/{faq_id}",
            put(routes::faq::update).delete(routes::faq::delete),
        );

    let order_routes = Router::new()
        .route("/", get(routes::order::list))
        .route("/mine", get(routes::order::mine))
        .route("/{order_id}", get(routes::order::get))
        .route("/{order_id}/status", put(routes::order::update_status))
        .route("/{order_id}/cancel", post(routes::order::cancel));

    let user_routes = Router::new()
        .route("/likes", get(routes::user::list_likes))
        .route(
            "/likes/{item_id}",
            put(routes::user::like).delete(routes::user::unlike),
        )
        .route(
            "/addresses",
            get(routes::user::list_addresses).post(routes::user::add_address),
        )
        .route(
            "/addresses/{address_id}",
            axum::routing::delete(routes::user::delete_address),
        );

    let checkout_routes = Router::new()
        .route("/", post(routes::checkout::create))
        .route("/config", get(routes::checkout::config));

    let admin_routes = Router::new()
        .route("/users", get(routes::admin::list_users))
        .route("/users/{user_id}/role", put(routes::admin::set_role));

    // Compose API
    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/menu", menu_routes)
        .nest("/categories", category_routes)
        .nest("/faqs", faq_routes)
        .route("/site", get(routes::site::get).put(routes::site::update))
        .nest("/orders", order_routes)
        .nest("/user", user_routes)
        .nest("/checkout", checkout_routes)
        .route("/stripe/webhook", post(routes::stripe::webhook))
        .nest("/admin", admin_routes)
        .route("/reviews", get(routes::reviews::list));

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Credentialed CORS needs explicit origins; with none configured the API
/// is open to any origin without cookies.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
