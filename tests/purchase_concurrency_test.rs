//! Concurrent purchase and confirmation requests against the full router.
//!
//! The harness runs SQLite with a single pooled connection, so these
//! requests are serialised by the pool and the `FOR UPDATE` clauses are
//! never contended here. They check that each request decides under the
//! state its predecessor committed; row-lock blocking itself is only
//! exercised on Postgres.

mod common;

use axum::http::StatusCode;
use common::{purchase_body, TestApp};
use serde_json::json;

#[tokio::test]
async fn only_one_buyer_gets_the_last_unit() {
    let app = TestApp::new().await;
    let seller = app.seed_seller("Sari", "1234567890").await;
    let category = app.seed_category("Books").await;
    let product = app
        .seed_product(seller.id, category.id, "LAST-1", "25000", 1)
        .await;

    let body = purchase_body(&[(product.id, 1)]);
    let (first, second, third) = tokio::join!(
        app.post_json("/purchase", body.clone()),
        app.post_json("/purchase", body.clone()),
        app.post_json("/purchase", body.clone()),
    );

    let statuses = [first.0, second.0, third.0];
    let created = statuses
        .iter()
        .filter(|status| **status == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1, "{statuses:?}");
    assert_eq!(
        statuses
            .iter()
            .filter(|status| **status == StatusCode::BAD_REQUEST)
            .count(),
        2
    );
    for (status, response) in [first, second, third] {
        if status == StatusCode::BAD_REQUEST {
            assert_eq!(response["code"], "insufficient_stock");
        }
    }

    // Nothing is consumed until payment is confirmed.
    assert_eq!(app.product(product.id).await.qty, 1);
}

#[tokio::test]
async fn concurrent_confirmations_settle_exactly_once() {
    let app = TestApp::new().await;
    let seller = app.seed_seller("Sari", "1234567890").await;
    let category = app.seed_category("Books").await;
    let product = app
        .seed_product(seller.id, category.id, "RACE-1", "10000", 4)
        .await;
    let proof = app.seed_file(seller.id).await;

    let (status, body) = app
        .post_json("/purchase", purchase_body(&[(product.id, 2)]))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let purchase_id = body["purchaseId"].as_str().expect("purchaseId").to_string();

    let uri = format!("/purchase/{}", purchase_id);
    let confirm = json!({ "fileIds": [proof.id.to_string()] });
    let (first, second) = tokio::join!(
        app.post_json(&uri, confirm.clone()),
        app.post_json(&uri, confirm.clone()),
    );

    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let purchase_id: i32 = purchase_id.parse().expect("numeric purchase id");
    assert_eq!(app.product(product.id).await.qty, 2);
    assert_eq!(app.payment_details(purchase_id).await.len(), 1);
}
