mod common;

use std::time::Duration as StdDuration;

use axum::http::{Method, StatusCode};
use common::spawn_app;
use serde_json::json;
use vidly_db::ObjectId;

fn body(customer_id: ObjectId, movie_id: ObjectId) -> serde_json::Value {
    json!({ "customerId": customer_id.to_string(), "movieId": movie_id.to_string() })
}

async fn rental_count(app: &common::TestApp) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rentals")
        .fetch_one(app.db.pool())
        .await
        .unwrap();
    count
}

#[tokio::test]
async fn unauthenticated_create_has_no_side_effects() {
    let app = spawn_app().await;
    let customer = app.seed_customer("customer1").await;
    let movie = app.seed_movie("movie1", 10, 2.0).await;

    let reply = app
        .send(
            Method::POST,
            "/api/rentals",
            None,
            Some(body(customer.id, movie.id)),
        )
        .await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.error_message(), "Access denied. No token provided.");
    assert_eq!(rental_count(&app).await, 0);
    assert_eq!(app.stock_of(&movie).await, 10);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = spawn_app().await;
    let token = app.token(false);

    for payload in [
        json!({}),
        json!({ "customerId": ObjectId::new().to_string() }),
        json!({ "customerId": "1", "movieId": "2" }),
    ] {
        let reply = app
            .send(Method::POST, "/api/rentals", Some(&token), Some(payload))
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.error_code(), "validation_error");
    }
}

#[tokio::test]
async fn malformed_id_is_reported_against_its_field() {
    let app = spawn_app().await;
    let token = app.token(false);

    let reply = app
        .send(
            Method::POST,
            "/api/rentals",
            Some(&token),
            Some(json!({ "customerId": "not-an-id", "movieId": ObjectId::new().to_string() })),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_code(), "validation_error");
    assert_eq!(reply.body["error"]["details"][0]["field"], "customerId");
    assert_eq!(reply.error_message(), "\"customerId\" must be a valid id");
    assert_eq!(rental_count(&app).await, 0);
}

#[tokio::test]
async fn unknown_references_are_bad_requests() {
    let app = spawn_app().await;
    let token = app.token(false);
    let customer = app.seed_customer("customer1").await;
    let movie = app.seed_movie("movie1", 10, 2.0).await;

    let reply = app
        .send(
            Method::POST,
            "/api/rentals",
            Some(&token),
            Some(body(customer.id, ObjectId::new())),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_code(), "invalid_reference");
    assert_eq!(reply.error_message(), "Invalid movie.");

    let reply = app
        .send(
            Method::POST,
            "/api/rentals",
            Some(&token),
            Some(body(ObjectId::new(), movie.id)),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_message(), "Invalid customer.");

    assert_eq!(rental_count(&app).await, 0);
}

#[tokio::test]
async fn out_of_stock_is_a_bad_request() {
    let app = spawn_app().await;
    let token = app.token(false);
    let customer = app.seed_customer("customer1").await;
    let movie = app.seed_movie("movie1", 0, 2.0).await;

    let reply = app
        .send(
            Method::POST,
            "/api/rentals",
            Some(&token),
            Some(body(customer.id, movie.id)),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_code(), "out_of_stock");
    assert_eq!(reply.error_message(), "Movie not in stock.");
    assert_eq!(app.stock_of(&movie).await, 0);
    assert_eq!(rental_count(&app).await, 0);
}

#[tokio::test]
async fn create_returns_the_rental_and_decrements_stock() {
    let app = spawn_app().await;
    let token = app.token(false);
    let customer = app.seed_customer("customer1").await;
    let movie = app.seed_movie("movie1", 10, 2.0).await;

    let reply = app
        .send(
            Method::POST,
            "/api/rentals",
            Some(&token),
            Some(body(customer.id, movie.id)),
        )
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["customer"]["_id"], customer.id.to_string());
    assert_eq!(reply.body["customer"]["name"], "customer1");
    assert_eq!(reply.body["movie"]["title"], "movie1");
    assert_eq!(reply.body["movie"]["dailyRentalRate"], 2.0);
    assert_eq!(reply.body["dateOut"], "2024-03-01T10:00:00Z");
    assert!(reply.body["dateReturned"].is_null());
    assert!(reply.body["rentalFee"].is_null());
    assert_eq!(app.stock_of(&movie).await, 9);

    let id = reply.body["_id"].as_str().unwrap().to_string();
    let fetched = app.get(&format!("/api/rentals/{id}")).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["_id"], id);
}

#[tokio::test]
async fn concurrent_creates_sell_exactly_the_stock() {
    let app = spawn_app().await;
    let token = app.token(false);
    let customer = app.seed_customer("customer1").await;
    let movie = app.seed_movie("movie1", 2, 2.0).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let app = app.clone();
        let token = token.clone();
        let payload = body(customer.id, movie.id);
        handles.push(tokio::spawn(async move {
            app.send(Method::POST, "/api/rentals", Some(&token), Some(payload))
                .await
        }));
    }

    let mut replies = Vec::new();
    for handle in handles {
        replies.push(handle.await.unwrap());
    }

    let created = replies
        .iter()
        .filter(|reply| reply.status == StatusCode::OK)
        .count();
    let refused = replies
        .iter()
        .filter(|reply| reply.error_code() == "out_of_stock")
        .count();

    assert_eq!(created, 2);
    assert_eq!(refused, 4);
    assert_eq!(app.stock_of(&movie).await, 0);
    assert_eq!(rental_count(&app).await, 2);
}

#[tokio::test]
async fn failed_commit_is_transient_and_persists_nothing() {
    let app = spawn_app().await;
    let token = app.token(false);
    let customer = app.seed_customer("customer1").await;
    let movie = app.seed_movie("movie1", 10, 2.0).await;

    app.db.fail_writes_to("movies").await.unwrap();
    let reply = app
        .send(
            Method::POST,
            "/api/rentals",
            Some(&token),
            Some(body(customer.id, movie.id)),
        )
        .await;
    app.db.restore_writes().await.unwrap();

    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply.error_code(), "store_unavailable");
    assert_eq!(rental_count(&app).await, 0);
    assert_eq!(app.stock_of(&movie).await, 10);
}

#[tokio::test]
async fn store_timeout_is_transient() {
    let app = spawn_app().await;
    let token = app.token(false);
    let customer = app.seed_customer("customer1").await;
    let movie = app.seed_movie("movie1", 10, 2.0).await;

    app.db.stall(StdDuration::from_secs(2)).await;
    let reply = app
        .send(
            Method::POST,
            "/api/rentals",
            Some(&token),
            Some(body(customer.id, movie.id)),
        )
        .await;

    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn list_is_most_recent_first() {
    let app = spawn_app().await;
    let token = app.token(false);
    let customer = app.seed_customer("customer1").await;
    let first = app.seed_movie("movie1", 10, 2.0).await;
    let second = app.seed_movie("movie2", 10, 2.0).await;

    app.send(
        Method::POST,
        "/api/rentals",
        Some(&token),
        Some(body(customer.id, first.id)),
    )
    .await;
    app.clock.advance(time::Duration::hours(2));
    app.send(
        Method::POST,
        "/api/rentals",
        Some(&token),
        Some(body(customer.id, second.id)),
    )
    .await;

    let reply = app.get("/api/rentals").await;
    assert_eq!(reply.status, StatusCode::OK);
    let titles: Vec<&str> = reply
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|rental| rental["movie"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["movie2", "movie1"]);
}

#[tokio::test]
async fn get_with_bad_or_unknown_id_is_not_found() {
    let app = spawn_app().await;

    let reply = app.get("/api/rentals/1").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.error_message(), "Invalid ID.");

    let reply = app.get(&format!("/api/rentals/{}", ObjectId::new())).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
