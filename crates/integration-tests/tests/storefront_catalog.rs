//! Integration tests for the catalog API.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (bh-cli migrate)
//! - The storefront running against it (cargo run -p brickhaus-storefront)
//!
//! Run with: cargo test -p brickhaus-integration-tests -- --ignored

use brickhaus_integration_tests::TestContext;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::Value;

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_health_endpoints() {
    let ctx = TestContext::new().await;

    let resp = ctx.client.get(ctx.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx.client.get(ctx.url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_product_listing_filters_by_theme() {
    let ctx = TestContext::new().await;
    let id = ctx
        .seed_minifig("Clone Trooper, Phase 2", "sw0187", Decimal::new(650, 2), 3)
        .await;

    let resp = ctx
        .client
        .get(ctx.url("/api/products?theme=Star%20Wars&q=Clone%20Trooper&per_page=100"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["page"], 1);
    assert_eq!(page["per_page"], 100);
    let items = page["items"].as_array().unwrap();
    assert!(items.iter().all(|p| p["theme"] == "Star Wars"));
    assert!(items.iter().any(|p| p["inventory_id"] == id.as_i64()));

    ctx.cleanup(id).await;
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_product_detail_and_minifig_view() {
    let ctx = TestContext::new().await;
    let id = ctx
        .seed_minifig("Series 25 Goatherd", "col25-1", Decimal::new(499, 2), 1)
        .await;

    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/products/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let product: Value = resp.json().await.unwrap();
    assert_eq!(product["item_no"], "col25-1");
    assert_eq!(product["series"], 25);

    let resp = ctx
        .client
        .get(ctx.url("/api/minifigs/col25-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let view: Value = resp.json().await.unwrap();
    assert!(!view["listings"].as_array().unwrap().is_empty());

    ctx.cleanup(id).await;
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_unknown_product_is_not_found() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .get(ctx.url("/api/products/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_facets() {
    let ctx = TestContext::new().await;

    let resp = ctx.client.get(ctx.url("/api/themes")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let themes: Value = resp.json().await.unwrap();
    assert!(themes.is_array());

    let resp = ctx.client.get(ctx.url("/api/series")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
