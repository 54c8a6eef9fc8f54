//! Test utilities and router harness for subwriter tests.
//!
//! Provides:
//! - Temporary database fixtures
//! - A store wrapper that counts store interactions and can slow inserts
//! - Helpers for driving the router in-process

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use subwriter::model::SubscriptionRow;
use subwriter::observability::tracing::init_test_tracing;
use subwriter::server::{create_router, AppState, RouterOptions, SUBSCRIBE_PATH};
use subwriter::storage::sqlite::SqliteUnitOfWork;
use subwriter::storage::{SqliteStore, StoreError, SubscriptionStore, UnitOfWork};
use tempfile::TempDir;
use tower::ServiceExt;

/// Test fixture that manages a temporary database directory.
///
/// The directory is automatically cleaned up when the fixture is dropped.
pub struct TestFixture {
    /// Temporary directory for test database
    pub temp_dir: TempDir,
    /// Path to the database file
    pub db_path: PathBuf,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        Self { temp_dir, db_path }
    }

    pub fn open_store(&self) -> SqliteStore {
        SqliteStore::open(&self.db_path, 4, Duration::from_secs(5)).expect("failed to open store")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// SQLite store that records how often it was used.
pub struct CountingStore {
    pub inner: SqliteStore,
    pub begins: AtomicUsize,
    /// Units of work that have been committed, rolled back or dropped.
    pub finished: Arc<AtomicUsize>,
    pub insert_delay: Option<Duration>,
}

impl CountingStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            begins: AtomicUsize::new(0),
            finished: Arc::new(AtomicUsize::new(0)),
            insert_delay: None,
        }
    }

    pub fn with_insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = Some(delay);
        self
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

struct FinishGuard(Arc<AtomicUsize>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct CountingUnitOfWork {
    inner: SqliteUnitOfWork,
    insert_delay: Option<Duration>,
    _finish: FinishGuard,
}

impl SubscriptionStore for CountingStore {
    type UnitOfWork = CountingUnitOfWork;

    fn begin(&self) -> Result<CountingUnitOfWork, StoreError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(CountingUnitOfWork {
            inner: self.inner.begin()?,
            insert_delay: self.insert_delay,
            _finish: FinishGuard(Arc::clone(&self.finished)),
        })
    }

    fn check(&self) -> Result<(), StoreError> {
        self.inner.check()
    }
}

impl UnitOfWork for CountingUnitOfWork {
    fn insert(&mut self, row: &SubscriptionRow) -> Result<(), StoreError> {
        if let Some(delay) = self.insert_delay {
            std::thread::sleep(delay);
        }
        self.inner.insert(row)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.inner.commit()
    }

    fn rollback(self) -> Result<(), StoreError> {
        self.inner.rollback()
    }
}

/// Router plus a handle on the store behind it.
pub struct TestApp {
    pub fixture: TestFixture,
    pub store: Arc<CountingStore>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(|store| store, RouterOptions::default())
    }

    pub fn build<F>(customize: F, options: RouterOptions) -> Self
    where
        F: FnOnce(CountingStore) -> CountingStore,
    {
        init_test_tracing();
        let fixture = TestFixture::new();
        let store = customize(CountingStore::new(fixture.open_store()));
        let state = AppState::new(store);
        let store = Arc::clone(&state.store);
        let router = create_router(state, options);
        Self {
            fixture,
            store,
            router,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: &str) -> (StatusCode, Bytes) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        send(&self.router, request).await
    }

    pub async fn post_subscriptions(&self, body: &str) -> (StatusCode, Bytes) {
        self.request(Method::POST, SUBSCRIBE_PATH, body).await
    }

    pub fn rows_for_user(&self, user_id: &str) -> Vec<SubscriptionRow> {
        self.store.inner.rows_for_user(user_id).expect("query rows")
    }

    pub fn count_rows(&self) -> i64 {
        self.store.inner.count_rows().expect("count rows")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, body)
}

/// Wait for a condition to become true with timeout.
///
/// # Returns
///
/// `true` if condition was met, `false` if timeout expired
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
