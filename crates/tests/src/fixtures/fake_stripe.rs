use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{Form, Json, Router, extract::State, routing::post};
use serde_json::Value;
use tokio::net::TcpListener;

type Captured = Arc<Mutex<Vec<HashMap<String, String>>>>;

/// Stand-in for the Stripe API that records every Checkout Session request.
pub struct FakeStripe {
    pub base_url: String,
    captured: Captured,
}

impl FakeStripe {
    pub async fn spawn() -> Self {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route("/v1/checkout/sessions", post(create_session))
            .with_state(captured.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Stripe");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            captured,
        }
    }

    /// Form fields of every session created so far.
    pub fn sessions(&self) -> Vec<HashMap<String, String>> {
        self.captured.lock().unwrap().clone()
    }

    /// `metadata[...]` fields of a captured session, keyed without the prefix.
    pub fn metadata(params: &HashMap<String, String>) -> HashMap<String, String> {
        params
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix("metadata[")
                    .and_then(|k| k.strip_suffix(']'))
                    .map(|k| (k.to_string(), value.clone()))
            })
            .collect()
    }
}

async fn create_session(
    State(captured): State<Captured>,
    Form(params): Form<Vec<(String, String)>>,
) -> Json<Value> {
    let mut sessions = captured.lock().unwrap();
    sessions.push(params.into_iter().collect());
    let id = format!("cs_test_fake_{}", sessions.len());
    Json(serde_json::json!({
        "id": id,
        "object": "checkout.session",
        "url": format!("https://checkout.stripe.test/pay/{id}"),
    }))
}
