use bistro_config::Settings;
use bistro_services::{
    AuthService, ReviewsService, StripeService,
    dao::{
        menu::MenuDao, order::OrderDao, restaurant::RestaurantDao,
        restaurant_user::RestaurantUserDao, session::SessionDao, user::UserDao,
    },
};
use bson::oid::ObjectId;
use mongodb::Database;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub sessions: Arc<SessionDao>,
    pub restaurants: Arc<RestaurantDao>,
    pub restaurant_users: Arc<RestaurantUserDao>,
    pub menu: Arc<MenuDao>,
    pub orders: Arc<OrderDao>,
    pub stripe: Arc<StripeService>,
    pub reviews: Option<Arc<ReviewsService>>,
    restaurant_id: Option<ObjectId>,
}

impl AppState {
    pub async fn new(db: Database, settings: Settings) -> anyhow::Result<Self> {
        let auth = Arc::new(AuthService::new(settings.session.clone()));
        let users = Arc::new(UserDao::new(&db));
        let sessions = Arc::new(SessionDao::new(&db));
        let restaurants = Arc::new(RestaurantDao::new(&db));
        let restaurant_users = Arc::new(RestaurantUserDao::new(&db));
        let menu = Arc::new(MenuDao::new(&db, settings.database.transactions));
        let orders = Arc::new(OrderDao::new(&db));
        let stripe = Arc::new(StripeService::new(&settings.stripe));

        let reviews = match (&settings.reviews.api_key, &settings.reviews.place_id) {
            (Some(key), Some(place)) if !key.is_empty() && !place.is_empty() => {
                Some(Arc::new(ReviewsService::new(key.clone(), place.clone())))
            }
            _ => None,
        };

        let restaurant_id = match settings.restaurant.id.as_deref() {
            Some(hex) => match ObjectId::parse_str(hex) {
                Ok(id) => {
                    restaurants.ensure(id, &settings.restaurant.name).await?;
                    info!(restaurant_id = %id, "Serving restaurant");
                    Some(id)
                }
                Err(_) => {
                    warn!(value = hex, "restaurant.id is not a valid ObjectId");
                    None
                }
            },
            None => {
                warn!("restaurant.id is not configured; restaurant endpoints will fail");
                None
            }
        };

        Ok(Self {
            db,
            settings,
            auth,
            users,
            sessions,
            restaurants,
            restaurant_users,
            menu,
            orders,
            stripe,
            reviews,
            restaurant_id,
        })
    }

    /// The restaurant this deployment serves.
    pub fn restaurant_id(&self) -> Result<ObjectId, ApiError> {
        self.restaurant_id
            .ok_or_else(|| ApiError::Internal("Restaurant context is not configured".to_string()))
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.settings
            .restaurant
            .admin_emails
            .iter()
            .any(|e| e.trim().eq_ignore_ascii_case(email.trim()))
    }
}
