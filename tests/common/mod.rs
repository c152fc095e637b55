#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, Method, StatusCode},
    Router,
};
use serde_json::Value;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use vidly_app::modules::customers::models::Customer;
use vidly_app::modules::customers::store::CustomerStore;
use vidly_app::modules::genres::models::{Genre, GenreSnapshot};
use vidly_app::modules::genres::store::GenreStore;
use vidly_app::modules::movies::models::Movie;
use vidly_app::modules::movies::store::MovieStore;
use vidly_app::modules::rentals::ledger::Clock;
use vidly_app::{AppContext, Application};
use vidly_authz::{Principal, TokenService};
use vidly_db::{Database, ObjectId};
use vidly_http::guard::AUTH_TOKEN_HEADER;
use vidly_kernel::settings::Settings;

pub struct ManualClock(Mutex<OffsetDateTime>);

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.lock().unwrap()
    }
}

#[derive(Clone)]
pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub tokens: Arc<TokenService>,
    pub clock: Arc<ManualClock>,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }

    pub fn error_message(&self) -> &str {
        self.body["error"]["message"].as_str().unwrap_or_default()
    }
}

pub async fn spawn_app() -> TestApp {
    let db = Database::temporary(StdDuration::from_millis(500))
        .await
        .unwrap();
    let tokens = Arc::new(TokenService::new("integration-secret", Duration::hours(1)).unwrap());
    let clock = Arc::new(ManualClock(Mutex::new(datetime!(2024-03-01 10:00 UTC))));

    let ctx = AppContext::new(db.clone(), tokens.clone(), clock.clone());
    let app = Application::with_context(Settings::default(), ctx)
        .await
        .unwrap();

    TestApp {
        router: app.router(),
        db,
        tokens,
        clock,
    }
}

impl TestApp {
    pub fn token(&self, is_admin: bool) -> String {
        self.tokens
            .issue(&Principal {
                user_id: ObjectId::new(),
                is_admin,
            })
            .unwrap()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTH_TOKEN_HEADER, token);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> Reply {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn seed_customer(&self, name: &str) -> Customer {
        let customer = Customer {
            id: ObjectId::new(),
            name: name.to_string(),
            phone: "12345".to_string(),
            is_gold: false,
        };
        CustomerStore::new(&self.db)
            .insert(&customer)
            .await
            .unwrap();
        customer
    }

    pub async fn seed_genre(&self, name: &str) -> Genre {
        let genre = Genre {
            id: ObjectId::new(),
            name: name.to_string(),
        };
        GenreStore::new(&self.db).insert(&genre).await.unwrap();
        genre
    }

    pub async fn seed_movie(&self, title: &str, stock: i64, rate: f64) -> Movie {
        let movie = Movie {
            id: ObjectId::new(),
            title: title.to_string(),
            genre: GenreSnapshot {
                id: ObjectId::new(),
                name: "genre1".to_string(),
            },
            number_in_stock: stock,
            daily_rental_rate: rate,
        };
        MovieStore::new(&self.db).insert(&movie).await.unwrap();
        movie
    }

    pub async fn stock_of(&self, movie: &Movie) -> i64 {
        MovieStore::new(&self.db)
            .find_by_id(&movie.id)
            .await
            .unwrap()
            .unwrap()
            .number_in_stock
    }
}
