//! Rental lifecycle and the stock bookkeeping that goes with it.
//!
//! Checkout inserts the rental and takes one copy out of stock in a single
//! [`UnitOfWork`](vidly_db::UnitOfWork). The decrement is conditional on a copy being left,
//! so concurrent checkouts can never drive stock below zero; when it matches no row the
//! whole unit rolls back. A return closes the rental with a conditional update and then
//! puts the copy back.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use vidly_db::{Database, ObjectId, StoreError};
use vidly_http::AppError;

use super::models::{AlreadyReturned, CustomerSnapshot, MovieSnapshot, Rental};
use super::store::RentalStore;
use crate::modules::customers::store::CustomerStore;
use crate::modules::movies::store::MovieStore;

/// Source of the current time for checkout and return stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid {kind}.")]
    InvalidReference { kind: &'static str, id: ObjectId },

    #[error("Movie not in stock.")]
    OutOfStock(ObjectId),

    #[error("Rental not found.")]
    NotFound,

    #[error("Return already processed.")]
    AlreadyProcessed(ObjectId),

    /// The rental was closed but its copy could not be put back in stock.
    #[error("rental {rental_id} was returned but stock for movie {movie_id} was not restored")]
    StockNotRestored {
        rental_id: ObjectId,
        movie_id: ObjectId,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    fn invalid_customer(id: ObjectId) -> Self {
        Self::InvalidReference {
            kind: "customer",
            id,
        }
    }

    fn invalid_movie(id: ObjectId) -> Self {
        Self::InvalidReference { kind: "movie", id }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidReference { .. } => {
                AppError::bad_request_with_code("invalid_reference", err.to_string())
            }
            LedgerError::OutOfStock(_) => {
                AppError::bad_request_with_code("out_of_stock", err.to_string())
            }
            LedgerError::NotFound => AppError::not_found(err.to_string()),
            LedgerError::AlreadyProcessed(_) => {
                AppError::bad_request_with_code("already_processed", err.to_string())
            }
            LedgerError::StockNotRestored { .. } => AppError::Internal(err.into()),
            LedgerError::Store(source) => source.into(),
        }
    }
}

/// Owns rentals and the stock adjustments tied to them.
pub struct RentalLedger {
    customers: CustomerStore,
    movies: MovieStore,
    rentals: RentalStore,
    db: Database,
    clock: Arc<dyn Clock>,
}

impl RentalLedger {
    pub fn new(db: &Database) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: &Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            customers: CustomerStore::new(db),
            movies: MovieStore::new(db),
            rentals: RentalStore::new(db),
            db: db.clone(),
            clock,
        }
    }

    /// Check out `movie_id` to `customer_id`.
    pub async fn create(
        &self,
        customer_id: ObjectId,
        movie_id: ObjectId,
    ) -> Result<Rental, LedgerError> {
        let customer = self
            .customers
            .find_by_id(&customer_id)
            .await?
            .ok_or_else(|| LedgerError::invalid_customer(customer_id))?;

        let movie = self
            .movies
            .find_by_id(&movie_id)
            .await?
            .ok_or_else(|| LedgerError::invalid_movie(movie_id))?;

        if !movie.in_stock() {
            return Err(LedgerError::OutOfStock(movie_id));
        }

        let rental = Rental::open(
            CustomerSnapshot::from(&customer),
            MovieSnapshot::from(&movie),
            self.clock.now(),
        );

        let mut unit = self.db.unit_of_work().await?;
        RentalStore::insert(unit.connection(), &rental).await?;

        if !MovieStore::take_copy(unit.connection(), &movie_id).await? {
            unit.rollback().await?;
            // Lost a race for the last copy, or the movie was deleted meanwhile.
            return Err(match self.movies.find_by_id(&movie_id).await? {
                Some(_) => LedgerError::OutOfStock(movie_id),
                None => LedgerError::invalid_movie(movie_id),
            });
        }
        unit.commit().await?;

        tracing::info!(
            rental_id = %rental.id(),
            customer_id = %customer_id,
            movie_id = %movie_id,
            "rental created"
        );
        Ok(rental)
    }

    /// The rental a return for this pair applies to: the latest open one, or failing
    /// that the latest returned one.
    pub async fn lookup(
        &self,
        customer_id: ObjectId,
        movie_id: ObjectId,
    ) -> Result<Option<Rental>, LedgerError> {
        Ok(self.rentals.latest_for(&customer_id, &movie_id).await?)
    }

    /// Close `rental` and put its copy back in stock.
    pub async fn process_return(&self, rental: &Rental) -> Result<Rental, LedgerError> {
        let rental_id = rental.id();
        let now = self.clock.now();

        let mut returned = rental.clone();
        returned
            .mark_returned(now)
            .map_err(|AlreadyReturned| LedgerError::AlreadyProcessed(rental_id))?;

        if !self.rentals.mark_returned(&returned).await? {
            return Err(match self.rentals.find_by_id(&rental_id).await? {
                Some(_) => LedgerError::AlreadyProcessed(rental_id),
                None => LedgerError::NotFound,
            });
        }

        let movie_id = returned.movie().id();
        match self.movies.return_copy(&movie_id).await {
            Ok(Some(stock)) => {
                tracing::info!(
                    rental_id = %rental_id,
                    movie_id = %movie_id,
                    stock,
                    fee = ?returned.rental_fee(),
                    "rental returned"
                );
            }
            Ok(None) => {
                tracing::warn!(
                    rental_id = %rental_id,
                    movie_id = %movie_id,
                    "rental returned for a movie that no longer exists"
                );
            }
            Err(source) => {
                tracing::error!(
                    rental_id = %rental_id,
                    movie_id = %movie_id,
                    error = %source,
                    "rental returned but stock was not restored"
                );
                return Err(LedgerError::StockNotRestored {
                    rental_id,
                    movie_id,
                    source,
                });
            }
        }

        Ok(returned)
    }

    /// Look up the rental for the pair and return it.
    pub async fn return_rental(
        &self,
        customer_id: ObjectId,
        movie_id: ObjectId,
    ) -> Result<Rental, LedgerError> {
        let rental = self
            .lookup(customer_id, movie_id)
            .await?
            .ok_or(LedgerError::NotFound)?;
        self.process_return(&rental).await
    }

    /// Every rental, most recent checkout first.
    pub async fn list(&self) -> Result<Vec<Rental>, LedgerError> {
        Ok(self.rentals.list().await?)
    }

    pub async fn get(&self, id: &ObjectId) -> Result<Option<Rental>, LedgerError> {
        Ok(self.rentals.find_by_id(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::customers::models::Customer;
    use crate::modules::genres::models::GenreSnapshot;
    use crate::modules::movies::models::Movie;
    use std::sync::Mutex;
    use std::time::Duration as StdDuration;
    use time::macros::datetime;
    use time::Duration;

    struct ManualClock(Mutex<OffsetDateTime>);

    impl ManualClock {
        fn at(now: OffsetDateTime) -> Arc<Self> {
            Arc::new(Self(Mutex::new(now)))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> OffsetDateTime {
            *self.0.lock().unwrap()
        }
    }

    struct Fixture {
        db: Database,
        clock: Arc<ManualClock>,
        ledger: Arc<RentalLedger>,
        customer: Customer,
        movie: Movie,
    }

    async fn fixture(stock: i64, rate: f64) -> Fixture {
        let db = Database::temporary(StdDuration::from_secs(2)).await.unwrap();
        let clock = ManualClock::at(datetime!(2024-03-01 10:00 UTC));
        let ledger = Arc::new(RentalLedger::with_clock(&db, clock.clone()));

        let customer = Customer {
            id: ObjectId::new(),
            name: "customer1".to_string(),
            phone: "12345".to_string(),
            is_gold: false,
        };
        CustomerStore::new(&db).insert(&customer).await.unwrap();

        let movie = Movie {
            id: ObjectId::new(),
            title: "movie1".to_string(),
            genre: GenreSnapshot {
                id: ObjectId::new(),
                name: "genre1".to_string(),
            },
            number_in_stock: stock,
            daily_rental_rate: rate,
        };
        MovieStore::new(&db).insert(&movie).await.unwrap();

        Fixture {
            db,
            clock,
            ledger,
            customer,
            movie,
        }
    }

    async fn stock_of(db: &Database, movie_id: &ObjectId) -> i64 {
        MovieStore::new(db)
            .find_by_id(movie_id)
            .await
            .unwrap()
            .unwrap()
            .number_in_stock
    }

    #[tokio::test]
    async fn create_takes_one_copy_out_of_stock() {
        let f = fixture(10, 2.0).await;

        let rental = f.ledger.create(f.customer.id, f.movie.id).await.unwrap();

        assert_eq!(stock_of(&f.db, &f.movie.id).await, 9);
        assert_eq!(rental.customer().name(), "customer1");
        assert_eq!(rental.movie().daily_rental_rate(), 2.0);
        assert!(!rental.is_returned());
        assert_eq!(f.ledger.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_unknown_references() {
        let f = fixture(10, 2.0).await;

        let err = f
            .ledger
            .create(ObjectId::new(), f.movie.id)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid customer.");

        let err = f
            .ledger
            .create(f.customer.id, ObjectId::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid movie.");

        assert!(f.ledger.list().await.unwrap().is_empty());
        assert_eq!(stock_of(&f.db, &f.movie.id).await, 10);
    }

    #[tokio::test]
    async fn create_with_no_stock_changes_nothing() {
        let f = fixture(0, 2.0).await;

        let err = f
            .ledger
            .create(f.customer.id, f.movie.id)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::OutOfStock(id) if id == f.movie.id));
        assert!(f.ledger.list().await.unwrap().is_empty());
        assert_eq!(stock_of(&f.db, &f.movie.id).await, 0);
    }

    #[tokio::test]
    async fn concurrent_creates_never_oversell() {
        let f = fixture(3, 2.0).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = f.ledger.clone();
            let (customer_id, movie_id) = (f.customer.id, f.movie.id);
            handles.push(tokio::spawn(async move {
                ledger.create(customer_id, movie_id).await
            }));
        }

        let mut created = 0;
        let mut out_of_stock = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(LedgerError::OutOfStock(_)) => out_of_stock += 1,
                Err(other) => panic!("unexpected error {other}"),
            }
        }

        assert_eq!(created, 3);
        assert_eq!(out_of_stock, 7);
        assert_eq!(stock_of(&f.db, &f.movie.id).await, 0);
        assert_eq!(f.ledger.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_commit_leaves_no_trace() {
        let f = fixture(10, 2.0).await;
        f.db.fail_writes_to("movies").await.unwrap();

        let err = f
            .ledger
            .create(f.customer.id, f.movie.id)
            .await
            .unwrap_err();

        assert!(matches!(&err, LedgerError::Store(source) if source.is_transient()));
        f.db.restore_writes().await.unwrap();
        assert!(f.ledger.list().await.unwrap().is_empty());
        assert_eq!(stock_of(&f.db, &f.movie.id).await, 10);
    }

    #[tokio::test]
    async fn return_prices_partial_days_up() {
        let f = fixture(10, 2.0).await;
        let rental = f.ledger.create(f.customer.id, f.movie.id).await.unwrap();

        f.clock.advance(Duration::hours(84));
        let returned = f.ledger.process_return(&rental).await.unwrap();

        assert_eq!(returned.rental_fee(), Some(8.0));
        assert_eq!(
            returned.date_returned(),
            Some(datetime!(2024-03-04 22:00 UTC))
        );
        assert_eq!(stock_of(&f.db, &f.movie.id).await, 10);
    }

    #[tokio::test]
    async fn stored_fee_is_rounded_to_cents() {
        let f = fixture(10, 1.1).await;
        let rental = f.ledger.create(f.customer.id, f.movie.id).await.unwrap();

        f.clock.advance(Duration::days(3));
        f.ledger.process_return(&rental).await.unwrap();

        let stored = f.ledger.get(&rental.id()).await.unwrap().unwrap();
        assert_eq!(stored.rental_fee(), Some(3.3));
    }

    #[tokio::test]
    async fn returning_an_unknown_rental_is_not_found() {
        let f = fixture(10, 2.0).await;
        let rental = Rental::open(
            CustomerSnapshot::from(&f.customer),
            MovieSnapshot::from(&f.movie),
            f.clock.now(),
        );

        let err = f.ledger.process_return(&rental).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound));
        assert_eq!(stock_of(&f.db, &f.movie.id).await, 10);
    }

    #[tokio::test]
    async fn second_return_is_rejected_and_keeps_first_values() {
        let f = fixture(10, 2.0).await;
        let rental = f.ledger.create(f.customer.id, f.movie.id).await.unwrap();

        let first = f.ledger.process_return(&rental).await.unwrap();
        f.clock.advance(Duration::days(5));
        let err = f.ledger.process_return(&rental).await.unwrap_err();

        assert!(matches!(err, LedgerError::AlreadyProcessed(id) if id == rental.id()));
        let stored = f.ledger.get(&rental.id()).await.unwrap().unwrap();
        assert_eq!(stored.date_returned(), first.date_returned());
        assert_eq!(stored.rental_fee(), Some(2.0));
        assert_eq!(stock_of(&f.db, &f.movie.id).await, 10);
    }

    #[tokio::test]
    async fn concurrent_returns_have_one_winner() {
        let f = fixture(10, 2.0).await;
        let rental = f.ledger.create(f.customer.id, f.movie.id).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let ledger = f.ledger.clone();
            let rental = rental.clone();
            handles.push(tokio::spawn(
                async move { ledger.process_return(&rental).await },
            ));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(stock_of(&f.db, &f.movie.id).await, 10);
    }

    #[tokio::test]
    async fn lookup_prefers_the_open_rental() {
        let f = fixture(10, 2.0).await;

        let first = f.ledger.create(f.customer.id, f.movie.id).await.unwrap();
        f.ledger.process_return(&first).await.unwrap();
        f.clock.advance(Duration::days(1));
        let second = f.ledger.create(f.customer.id, f.movie.id).await.unwrap();

        let found = f
            .ledger
            .lookup(f.customer.id, f.movie.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), second.id());

        f.ledger.process_return(&second).await.unwrap();
        let found = f
            .ledger
            .lookup(f.customer.id, f.movie.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), second.id());
        assert!(found.is_returned());

        assert!(f
            .ledger
            .lookup(ObjectId::new(), f.movie.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unrestored_stock_is_reported_but_rental_stays_returned() {
        let f = fixture(10, 2.0).await;
        let rental = f.ledger.create(f.customer.id, f.movie.id).await.unwrap();

        f.db.fail_writes_to("movies").await.unwrap();
        let err = f.ledger.process_return(&rental).await.unwrap_err();
        f.db.restore_writes().await.unwrap();

        assert!(matches!(err, LedgerError::StockNotRestored { .. }));
        let stored = f.ledger.get(&rental.id()).await.unwrap().unwrap();
        assert!(stored.is_returned());
        assert_eq!(stock_of(&f.db, &f.movie.id).await, 9);
    }

    #[tokio::test]
    async fn return_for_deleted_movie_still_succeeds() {
        let f = fixture(10, 2.0).await;
        let rental = f.ledger.create(f.customer.id, f.movie.id).await.unwrap();
        MovieStore::new(&f.db).delete(&f.movie.id).await.unwrap();

        let returned = f.ledger.process_return(&rental).await.unwrap();

        assert!(returned.is_returned());
    }

    #[test]
    fn errors_map_to_http_statuses() {
        use axum::http::StatusCode;

        let status = |err: LedgerError| AppError::from(err).status();
        assert_eq!(
            status(LedgerError::invalid_movie(ObjectId::new())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(LedgerError::OutOfStock(ObjectId::new())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(LedgerError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status(LedgerError::AlreadyProcessed(ObjectId::new())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(LedgerError::Store(StoreError::Timeout)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(LedgerError::StockNotRestored {
                rental_id: ObjectId::new(),
                movie_id: ObjectId::new(),
                source: StoreError::Unavailable {
                    table: "movies".to_string(),
                },
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
