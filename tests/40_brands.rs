mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn brand_crud() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.token().await?;

    let brand = app.create_brand(&token, "Brand1").await?;
    assert_eq!(brand["name"], "Brand1");
    let path = format!("/brands/{}/", brand["id"].as_str().unwrap_or_default());

    let res = app
        .client
        .patch(app.url(&path))
        .bearer_auth(&token)
        .json(&json!({ "name": "Brand2" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["name"], "Brand2");

    let res = app.client.delete(app.url(&path)).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app.client.get(app.url(&path)).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn duplicate_and_missing_names_fail() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.token().await?;
    app.create_brand(&token, "Brand1").await?;

    let res = app
        .client
        .post(app.url("/brands/"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Brand1" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .client
        .post(app.url("/brands/"))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .client
        .post(app.url("/brands/"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn referenced_brand_cannot_be_deleted() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.token().await?;
    let brand = app.create_brand(&token, "Brand1").await?;
    app.create_product(
        &token,
        json!({ "sku": "Sku1", "name": "Product1", "price": 1.0, "brand_id": brand["id"] }),
    )
    .await?;

    let res = app
        .client
        .delete(app.url(&format!("/brands/{}/", brand["id"].as_str().unwrap_or_default())))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn list_orders_and_rejects_unknown_columns() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.token().await?;
    for name in ["Beta", "Alpha", "Gamma"] {
        app.create_brand(&token, name).await?;
    }

    let body: Value = app
        .client
        .get(app.url("/brands/?order_by=-name&offset=1"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    let names: Vec<&str> = body["data"]
        .as_array()
        .map(|brands| brands.iter().filter_map(|b| b["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, ["Beta", "Alpha"]);

    let res = app
        .client
        .get(app.url("/brands/?order_by=hashed_password"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
