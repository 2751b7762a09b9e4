use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn health_check() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn faqs_are_listed_by_position() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let staff = app.seed_staff(&admin).await;

    let create = |question: &'static str, position: Option<i32>| {
        app.auth_post("/api/faqs", &staff.token)
            .json(&serde_json::json!({
                "question": question,
                "answer": "Yes.",
                "position": position,
            }))
            .send()
    };
    assert_eq!(create("Do you deliver?", Some(5)).await.unwrap().status().as_u16(), 201);
    assert_eq!(create("Is there parking?", Some(1)).await.unwrap().status().as_u16(), 201);
    let resp = create("Vegan options?", None).await.unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let appended: Value = resp.json().await.unwrap();
    assert_eq!(appended["position"], 6);

    let faqs: Vec<Value> = app
        .client
        .get(app.url("/api/faqs"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let questions: Vec<&str> = faqs.iter().map(|f| f["question"].as_str().unwrap()).collect();
    assert_eq!(questions, vec!["Is there parking?", "Do you deliver?", "Vegan options?"]);
}

#[tokio::test]
async fn faq_update_and_delete() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;

    let faq: Value = app
        .auth_post("/api/faqs", &admin.token)
        .json(&serde_json::json!({ "question": "Open on Sundays?", "answer": "No." }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let path = format!("/api/faqs/{}", faq["id"].as_str().unwrap());

    let resp = app
        .auth_put(&path, &admin.token)
        .json(&serde_json::json!({ "answer": "From noon." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["question"], "Open on Sundays?");
    assert_eq!(json["answer"], "From noon.");

    let resp = app
        .auth_put(&path, &admin.token)
        .json(&serde_json::json!({ "answer": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app.auth_delete(&path, &admin.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 204);
    let resp = app.auth_delete(&path, &admin.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn customers_cannot_edit_faqs() {
    let app = TestApp::spawn().await;
    app.seed_admin().await;
    let customer = app.seed_customer("bea").await;

    let resp = app
        .auth_post("/api/faqs", &customer.token)
        .json(&serde_json::json!({ "question": "Free food?", "answer": "Yes!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn site_content_is_public_and_admin_editable() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;
    let staff = app.seed_staff(&admin).await;

    let site: Value = app
        .client
        .get(app.url("/api/site"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(site["name"], "Test Bistro");

    let update = serde_json::json!({
        "name": "Bistro Nova",
        "site": { "tagline": "Fresh every day", "gallery": ["/img/1.jpg"] },
        "contact": { "phone": "+43 1 234", "email": "hello@bistro.test" },
        "opening_hours": [
            { "day": "monday", "open": "11:00", "close": "22:00" },
            { "day": "sunday", "open": "", "close": "", "closed": true },
        ],
    });

    let resp = app
        .auth_put("/api/site", &staff.token)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_put("/api/site", &admin.token)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let site: Value = app
        .client
        .get(app.url("/api/site"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(site["name"], "Bistro Nova");
    assert_eq!(site["site"]["tagline"], "Fresh every day");
    assert_eq!(site["contact"]["email"], "hello@bistro.test");
    assert_eq!(site["opening_hours"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_opening_hours_are_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin().await;

    for hours in [
        serde_json::json!([{ "day": "monday", "open": "25:00", "close": "22:00" }]),
        serde_json::json!([{ "day": "monday", "open": "9am", "close": "5pm" }]),
    ] {
        let resp = app
            .auth_put("/api/site", &admin.token)
            .json(&serde_json::json!({ "opening_hours": hours }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "{hours}");
    }

    let resp = app
        .auth_put("/api/site", &admin.token)
        .json(&serde_json::json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn reviews_require_configuration() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/api/reviews")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
