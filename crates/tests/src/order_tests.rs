use crate::fixtures::test_app::TestApp;
use serde_json::Value;

const STATUSES: [&str; 9] = [
    "pending",
    "confirmed",
    "preparing",
    "ready_for_pickup",
    "out_for_delivery",
    "delivered",
    "completed_pickup",
    "cancelled_by_user",
    "rejected_by_restaurant",
];

#[tokio::test]
async fn order_list_requires_staff_role() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let customer = app.seed_customer("kim").await;
    let item = app.create_item(&admin.token, "Burger", 1200, "Mains").await;
    let order = app.seed_order(&customer, &item).await;
    let order_id = order["id"].as_str().unwrap();

    let resp = app.auth_get("/api/orders", &customer.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_put(&format!("/api/orders/{order_id}/status"), &customer.token)
        .json(&serde_json::json!({ "status": "confirmed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.auth_get("/api/orders", &admin.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], order_id);
}

#[tokio::test]
async fn status_update_accepts_exactly_the_nine_values() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let staff = app.seed_staff(&admin).await;
    let customer = app.seed_customer("lena").await;
    let item = app.create_item(&admin.token, "Pasta", 1100, "Mains").await;
    let order = app.seed_order(&customer, &item).await;
    let path = format!("/api/orders/{}/status", order["id"].as_str().unwrap());

    for status in STATUSES {
        let resp = app
            .auth_put(&path, &staff.token)
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200, "{status}");
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["status"], status);
        assert_eq!(json["handled_by"], staff.id.as_str());
    }

    for status in ["shipped", "Pending", "", "PREPARING", "cancelled"] {
        let resp = app
            .auth_put(&path, &staff.token)
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "{status:?}");
    }

    for body in [
        serde_json::json!({ "status": 5 }),
        serde_json::json!({ "status": null }),
        serde_json::json!({}),
    ] {
        let resp = app
            .auth_put(&path, &staff.token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "{body}");
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["error"], "bad_request");
    }

    let resp = app
        .auth_put(&path, &staff.token)
        .header("Content-Type", "application/json")
        .body("{\"status\":")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn status_filter_and_pagination() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let customer = app.seed_customer("mia").await;
    let item = app.create_item(&admin.token, "Soup", 500, "Starters").await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let order = app.seed_order(&customer, &item).await;
        ids.push(order["id"].as_str().unwrap().to_string());
    }
    let resp = app
        .auth_put(&format!("/api/orders/{}/status", ids[0]), &admin.token)
        .json(&serde_json::json!({ "status": "confirmed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let pending: Value = app
        .auth_get("/api/orders?status=pending", &admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pending["total"], 2);

    let page: Value = app
        .auth_get("/api/orders?page=2&per_page=2", &admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let resp = app
        .auth_get("/api/orders?status=lost", &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn customer_sees_only_own_orders() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let owner = app.seed_customer("nora").await;
    let other = app.seed_customer("omar").await;
    let item = app.create_item(&admin.token, "Salad", 800, "Starters").await;
    let order = app.seed_order(&owner, &item).await;
    let path = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let resp = app.auth_get(&path, &owner.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["customer"]["email"], owner.email.as_str());
    assert_eq!(json["items"][0]["name"], "Salad");
    assert_eq!(json["total_cents"], 800);

    let resp = app.auth_get(&path, &other.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.auth_get(&path, &admin.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let mine: Value = app
        .auth_get("/api/orders/mine", &other.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine["total"], 0);
}

#[tokio::test]
async fn customer_can_cancel_only_pending_orders() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let customer = app.seed_customer("pia").await;
    let stranger = app.seed_customer("quinn").await;
    let item = app.create_item(&admin.token, "Pizza", 900, "Mains").await;

    let first = app.seed_order(&customer, &item).await;
    let first_id = first["id"].as_str().unwrap();

    let resp = app
        .auth_post(&format!("/api/orders/{first_id}/cancel"), &stranger.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_post(&format!("/api/orders/{first_id}/cancel"), &customer.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "cancelled_by_user");

    let second = app.seed_order(&customer, &item).await;
    let second_id = second["id"].as_str().unwrap();
    let resp = app
        .auth_put(&format!("/api/orders/{second_id}/status"), &admin.token)
        .json(&serde_json::json!({ "status": "preparing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_post(&format!("/api/orders/{second_id}/cancel"), &customer.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;

    let resp = app
        .auth_put(
            &format!("/api/orders/{}/status", bson::oid::ObjectId::new().to_hex()),
            &admin.token,
        )
        .json(&serde_json::json!({ "status": "confirmed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_get("/api/orders/not-an-id", &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
