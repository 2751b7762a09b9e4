use crate::fixtures::seed::sign_webhook;
use crate::fixtures::test_app::{TestApp, WEBHOOK_SECRET};
use serde_json::Value;

async fn order_count(app: &TestApp, session_id: &str) -> u64 {
    app.db
        .collection::<bson::Document>("orders")
        .count_documents(bson::doc! { "payment.transaction_id": session_id })
        .await
        .unwrap()
}

#[tokio::test]
async fn replayed_event_creates_exactly_one_order() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let customer = app.seed_customer("rita").await;
    let item = app.create_item(&admin.token, "Lasagna", 1300, "Mains").await;

    let metadata = app.cart_metadata(Some(&customer), &item, 2);
    let event = TestApp::checkout_event("checkout.session.completed", "cs_test_replay", &metadata, 2600);

    for _ in 0..3 {
        let resp = app.send_webhook(&event).await;
        assert_eq!(resp.status().as_u16(), 200);
    }
    assert_eq!(order_count(&app, "cs_test_replay").await, 1);

    let mine: Value = app
        .auth_get("/api/orders/mine", &customer.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine["total"], 1);
    let order = &mine["items"][0];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "paid");
    assert_eq!(order["items"][0]["quantity"], 2);
    assert_eq!(order["items"][0]["line_total_cents"], 2600);
    assert_eq!(order["total_cents"], 2600);
    assert_eq!(order["code"].as_str().unwrap().len(), 6);
}

#[tokio::test]
async fn concurrent_deliveries_create_one_order() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let item = app.create_item(&admin.token, "Gnocchi", 1000, "Mains").await;

    let metadata = app.cart_metadata(None, &item, 1);
    let event = TestApp::checkout_event("checkout.session.completed", "cs_test_race", &metadata, 1000);

    let responses = futures::future::join_all((0..5).map(|_| app.send_webhook(&event))).await;
    for resp in responses {
        assert_eq!(resp.status().as_u16(), 200);
    }
    assert_eq!(order_count(&app, "cs_test_race").await, 1);
}

#[tokio::test]
async fn guest_checkout_uses_gateway_customer_details() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let item = app.create_item(&admin.token, "Wrap", 750, "Mains").await;

    let metadata = app.cart_metadata(None, &item, 1);
    let event = TestApp::checkout_event("checkout.session.completed", "cs_test_guest", &metadata, 750);
    assert_eq!(app.send_webhook(&event).await.status().as_u16(), 200);

    let page: Value = app
        .auth_get("/api/orders", &admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order = &page["items"][0];
    assert_eq!(order["customer"]["email"], "guest@example.com");
    assert_eq!(order["customer"]["name"], "Guest");
    assert!(order["user_id"].is_null());
}

#[tokio::test]
async fn discount_comes_from_session_totals() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let item = app.create_item(&admin.token, "Steak", 2500, "Mains").await;

    let metadata = app.cart_metadata(None, &item, 1);
    let mut event = TestApp::checkout_event("checkout.session.completed", "cs_test_promo", &metadata, 2000);
    event["data"]["object"]["amount_subtotal"] = 2500.into();
    event["data"]["object"]["total_details"]["amount_discount"] = 500.into();
    assert_eq!(app.send_webhook(&event).await.status().as_u16(), 200);

    let page: Value = app
        .auth_get("/api/orders", &admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order = &page["items"][0];
    assert_eq!(order["subtotal_cents"], 2500);
    assert_eq!(order["discount_cents"], 500);
    assert_eq!(order["total_cents"], 2000);
}

#[tokio::test]
async fn bad_signature_is_rejected() {
    let app = TestApp::spawn().await;
    let event = serde_json::json!({ "id": "evt_1", "type": "checkout.session.completed", "data": { "object": {} } });
    let payload = serde_json::to_vec(&event).unwrap();
    let now = chrono::Utc::now().timestamp();

    let cases = [
        Some(sign_webhook(&payload, "whsec_wrong", now)),
        Some(sign_webhook(&payload, WEBHOOK_SECRET, now - 3600)),
        Some("t=1,v1=deadbeef".to_string()),
        None,
    ];
    for header in cases {
        let mut req = app
            .client
            .post(app.url("/api/stripe/webhook"))
            .body(payload.clone());
        if let Some(header) = &header {
            req = req.header("Stripe-Signature", header);
        }
        let resp = req.send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 400, "{header:?}");
    }
}

#[tokio::test]
async fn malformed_metadata_is_rejected() {
    let app = TestApp::spawn().await;
    let mut metadata = std::collections::HashMap::new();
    metadata.insert("restaurant_id".to_string(), app.restaurant_id.to_hex());
    metadata.insert("order_type".to_string(), "pickup".to_string());
    metadata.insert("cart_chunks".to_string(), "2".to_string());
    metadata.insert("cart_0".to_string(), "[{\"i\":".to_string());

    let event = TestApp::checkout_event("checkout.session.completed", "cs_test_bad", &metadata, 100);
    let resp = app.send_webhook(&event).await;
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(order_count(&app, "cs_test_bad").await, 0);
}

#[tokio::test]
async fn sessions_without_restaurant_metadata_are_acknowledged() {
    let app = TestApp::spawn().await;
    let mut metadata = std::collections::HashMap::new();
    metadata.insert("product".to_string(), "gift-card".to_string());

    let event = TestApp::checkout_event("checkout.session.completed", "cs_test_other_product", &metadata, 5000);
    let resp = app.send_webhook(&event).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(order_count(&app, "cs_test_other_product").await, 0);
}

#[tokio::test]
async fn async_payment_events_update_payment_status() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let item = app.create_item(&admin.token, "Curry", 1150, "Mains").await;
    let metadata = app.cart_metadata(None, &item, 1);

    let mut completed = TestApp::checkout_event("checkout.session.completed", "cs_test_sepa", &metadata, 1150);
    completed["data"]["object"]["payment_status"] = "unpaid".into();
    assert_eq!(app.send_webhook(&completed).await.status().as_u16(), 200);

    let payment_status = |app: &TestApp| {
        let db = app.db.clone();
        async move {
            let order = db
                .collection::<bson::Document>("orders")
                .find_one(bson::doc! { "payment.transaction_id": "cs_test_sepa" })
                .await
                .unwrap()
                .unwrap();
            order
                .get_document("payment")
                .unwrap()
                .get_str("status")
                .unwrap()
                .to_string()
        }
    };
    assert_eq!(payment_status(&app).await, "pending");

    let failed = TestApp::checkout_event("checkout.session.async_payment_failed", "cs_test_sepa", &metadata, 1150);
    assert_eq!(app.send_webhook(&failed).await.status().as_u16(), 200);
    assert_eq!(payment_status(&app).await, "failed");

    let succeeded = TestApp::checkout_event("checkout.session.async_payment_succeeded", "cs_test_sepa", &metadata, 1150);
    assert_eq!(app.send_webhook(&succeeded).await.status().as_u16(), 200);
    assert_eq!(payment_status(&app).await, "paid");
    assert_eq!(order_count(&app, "cs_test_sepa").await, 1);
}

#[tokio::test]
async fn unrelated_events_are_acknowledged() {
    let app = TestApp::spawn().await;
    let event = serde_json::json!({
        "id": "evt_other",
        "type": "payment_intent.created",
        "data": { "object": { "id": "pi_123" } },
    });
    let resp = app.send_webhook(&event).await;
    assert_eq!(resp.status().as_u16(), 200);
}
