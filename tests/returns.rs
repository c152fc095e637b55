mod common;

use axum::http::{Method, StatusCode};
use common::{spawn_app, TestApp};
use serde_json::{json, Value};
use vidly_app::modules::movies::models::Movie;
use vidly_db::ObjectId;

fn body(customer_id: ObjectId, movie_id: ObjectId) -> Value {
    json!({ "customerId": customer_id.to_string(), "movieId": movie_id.to_string() })
}

/// Seed a customer and a movie (stock 10, rate 2) and check one copy out.
async fn checked_out(app: &TestApp, token: &str) -> (ObjectId, Movie) {
    let customer = app.seed_customer("customer1").await;
    let movie = app.seed_movie("movie1", 10, 2.0).await;

    let reply = app
        .send(
            Method::POST,
            "/api/rentals",
            Some(token),
            Some(body(customer.id, movie.id)),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(app.stock_of(&movie).await, 9);

    (customer.id, movie)
}

#[tokio::test]
async fn unauthenticated_return_is_rejected() {
    let app = spawn_app().await;
    let token = app.token(false);
    let (customer_id, movie) = checked_out(&app, &token).await;

    let reply = app
        .send(
            Method::POST,
            "/api/returns",
            None,
            Some(body(customer_id, movie.id)),
        )
        .await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.stock_of(&movie).await, 9);
}

#[tokio::test]
async fn missing_ids_are_bad_requests() {
    let app = spawn_app().await;
    let token = app.token(false);

    let reply = app
        .send(
            Method::POST,
            "/api/returns",
            Some(&token),
            Some(json!({ "movieId": ObjectId::new().to_string() })),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn no_matching_rental_is_not_found() {
    let app = spawn_app().await;
    let token = app.token(false);

    let reply = app
        .send(
            Method::POST,
            "/api/returns",
            Some(&token),
            Some(body(ObjectId::new(), ObjectId::new())),
        )
        .await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.error_message(), "Rental not found.");
}

#[tokio::test]
async fn same_day_return_charges_one_day_and_restores_stock() {
    let app = spawn_app().await;
    let token = app.token(false);
    let (customer_id, movie) = checked_out(&app, &token).await;
    app.clock.advance(time::Duration::minutes(30));

    let reply = app
        .send(
            Method::POST,
            "/api/returns",
            Some(&token),
            Some(body(customer_id, movie.id)),
        )
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["rentalFee"], 2.0);
    assert_eq!(reply.body["dateReturned"], "2024-03-01T10:30:00Z");
    assert_eq!(app.stock_of(&movie).await, 10);
}

#[tokio::test]
async fn partial_days_are_charged_as_whole_days() {
    let app = spawn_app().await;
    let token = app.token(false);
    let (customer_id, movie) = checked_out(&app, &token).await;
    app.clock.advance(time::Duration::hours(84));

    let reply = app
        .send(
            Method::POST,
            "/api/returns",
            Some(&token),
            Some(body(customer_id, movie.id)),
        )
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["rentalFee"], 8.0);
}

#[tokio::test]
async fn second_return_is_already_processed() {
    let app = spawn_app().await;
    let token = app.token(false);
    let (customer_id, movie) = checked_out(&app, &token).await;

    let first = app
        .send(
            Method::POST,
            "/api/returns",
            Some(&token),
            Some(body(customer_id, movie.id)),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);

    app.clock.advance(time::Duration::days(3));
    let second = app
        .send(
            Method::POST,
            "/api/returns",
            Some(&token),
            Some(body(customer_id, movie.id)),
        )
        .await;

    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.error_code(), "already_processed");
    assert_eq!(second.error_message(), "Return already processed.");
    assert_eq!(app.stock_of(&movie).await, 10);

    let id = first.body["_id"].as_str().unwrap();
    let stored = app.get(&format!("/api/rentals/{id}")).await;
    assert_eq!(stored.body["rentalFee"], 2.0);
    assert_eq!(stored.body["dateReturned"], first.body["dateReturned"]);
}

#[tokio::test]
async fn unrestored_stock_is_a_server_error_but_the_rental_stays_returned() {
    let app = spawn_app().await;
    let token = app.token(false);
    let (customer_id, movie) = checked_out(&app, &token).await;

    app.db.fail_writes_to("movies").await.unwrap();
    let reply = app
        .send(
            Method::POST,
            "/api/returns",
            Some(&token),
            Some(body(customer_id, movie.id)),
        )
        .await;
    app.db.restore_writes().await.unwrap();

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.stock_of(&movie).await, 9);

    let rentals = app.get("/api/rentals").await;
    assert!(rentals.body[0]["dateReturned"].is_string());
}
