use std::collections::HashMap;

use bistro_db::models::{OrderLine, OrderType};
use bistro_services::checkout::CheckoutMetadata;
use bson::oid::ObjectId;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use super::test_app::{ADMIN_EMAIL, TestApp, WEBHOOK_SECRET};

pub struct SeededUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl SeededUser {
    pub fn object_id(&self) -> ObjectId {
        ObjectId::parse_str(&self.id).unwrap()
    }
}

impl TestApp {
    /// Register a user and return their auth info.
    pub async fn register_user(&self, email: &str, display_name: &str, password: &str) -> SeededUser {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "email": email,
                "display_name": display_name,
                "password": password,
            }))
            .send()
            .await
            .expect("Register request failed");

        let status = resp.status().as_u16();
        let json: Value = resp.json().await.expect("Failed to parse register response");
        assert_eq!(status, 201, "Register failed: {json}");

        SeededUser {
            id: json["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            token: json["token"].as_str().unwrap().to_string(),
        }
    }

    /// Login a user and return their auth info.
    pub async fn login_user(&self, email: &str, password: &str) -> SeededUser {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Login request failed");

        assert!(resp.status().is_success(), "Login failed: {}", resp.status());
        let json: Value = resp.json().await.expect("Failed to parse login response");

        SeededUser {
            id: json["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            token: json["token"].as_str().unwrap().to_string(),
        }
    }

    /// The bootstrap admin listed in `restaurant.admin_emails`.
    pub async fn seed_admin(&self) -> SeededUser {
        self.register_user(ADMIN_EMAIL, "Owner", "Owner123!").await
    }

    pub async fn seed_customer(&self, name: &str) -> SeededUser {
        self.register_user(&format!("{name}@guest.test"), name, "Guest123!")
            .await
    }

    /// Registers a user and promotes them to staff through the admin API.
    pub async fn seed_staff(&self, admin: &SeededUser) -> SeededUser {
        let staff = self
            .register_user("cook@bistro.test", "Cook", "Cook1234!")
            .await;
        let resp = self
            .auth_put(&format!("/api/admin/users/{}/role", staff.id), &admin.token)
            .json(&serde_json::json!({ "role": "staff" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200, "Promote to staff failed");
        staff
    }

    /// Create a menu item and return the response body.
    pub async fn create_item(
        &self,
        token: &str,
        name: &str,
        price_cents: i64,
        category: &str,
    ) -> Value {
        let resp = self
            .auth_post("/api/menu/items", token)
            .json(&serde_json::json!({
                "name": name,
                "price_cents": price_cents,
                "category_id": category,
            }))
            .send()
            .await
            .expect("Create item request failed");

        let status = resp.status().as_u16();
        let json: Value = resp.json().await.unwrap();
        assert_eq!(status, 201, "Create item failed: {json}");
        json
    }

    /// Category document as stored on the restaurant.
    pub async fn category_item_ids(&self, name: &str) -> Option<Vec<ObjectId>> {
        let restaurant = self
            .db
            .collection::<bistro_db::models::Restaurant>("restaurants")
            .find_one(bson::doc! { "_id": self.restaurant_id })
            .await
            .unwrap()
            .expect("restaurant document missing");
        restaurant.category(name).map(|c| c.item_ids.clone())
    }

    /// Create an authenticated request with the given token.
    pub fn auth_get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_put(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_delete(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    // ---- Payment webhook ------------------------------------------------

    /// Checkout metadata for one line of `item` (a menu item response body).
    pub fn cart_metadata(&self, user: Option<&SeededUser>, item: &Value, quantity: u32) -> HashMap<String, String> {
        let unit_price_cents = item["price_cents"].as_i64().unwrap();
        let cart = CheckoutMetadata {
            restaurant_id: self.restaurant_id,
            user_id: user.map(SeededUser::object_id),
            order_type: OrderType::Pickup,
            notes: None,
            delivery_address: None,
            lines: vec![OrderLine {
                menu_item_id: ObjectId::parse_str(item["id"].as_str().unwrap()).unwrap(),
                name: item["name"].as_str().unwrap().to_string(),
                quantity,
                unit_price_cents,
                options: vec![],
                line_total_cents: unit_price_cents * i64::from(quantity),
            }],
        };
        cart.encode().unwrap().into_iter().collect()
    }

    pub fn checkout_event(
        event_type: &str,
        session_id: &str,
        metadata: &HashMap<String, String>,
        amount_total: i64,
    ) -> Value {
        serde_json::json!({
            "id": format!("evt_{}", uuid::Uuid::new_v4().simple()),
            "type": event_type,
            "data": {
                "object": {
                    "id": session_id,
                    "object": "checkout.session",
                    "payment_status": "paid",
                    "amount_subtotal": amount_total,
                    "amount_total": amount_total,
                    "total_details": { "amount_discount": 0 },
                    "customer_details": { "email": "guest@example.com", "name": "Guest" },
                    "metadata": metadata,
                }
            }
        })
    }

    /// POST a webhook event signed with the test webhook secret.
    pub async fn send_webhook(&self, event: &Value) -> reqwest::Response {
        let payload = serde_json::to_vec(event).unwrap();
        let header = sign_webhook(&payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
        self.client
            .post(self.url("/api/stripe/webhook"))
            .header("Stripe-Signature", header)
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await
            .expect("Webhook request failed")
    }

    /// Runs a completed checkout for `customer` through the webhook and
    /// returns the resulting order as the customer sees it.
    pub async fn seed_order(&self, customer: &SeededUser, item: &Value) -> Value {
        let metadata = self.cart_metadata(Some(customer), item, 1);
        let session_id = format!("cs_test_{}", uuid::Uuid::new_v4().simple());
        let total = item["price_cents"].as_i64().unwrap();
        let event = Self::checkout_event("checkout.session.completed", &session_id, &metadata, total);

        let resp = self.send_webhook(&event).await;
        assert_eq!(resp.status().as_u16(), 200, "Webhook rejected");

        let stored = self
            .db
            .collection::<bson::Document>("orders")
            .find_one(bson::doc! { "payment.transaction_id": session_id.as_str() })
            .await
            .unwrap()
            .expect("webhook did not record the order");
        let order_id = stored.get_object_id("_id").unwrap().to_hex();

        self.auth_get(&format!("/api/orders/{order_id}"), &customer.token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

pub fn sign_webhook(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
