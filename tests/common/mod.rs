use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode as AxumStatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use applyflow::breaker::BreakerConfig;
use applyflow::config::{AiConfig, Config, CoreConfig, WorkerConfig};
use applyflow::models::QueueItem;
use applyflow::rate_limit::RateLimitConfig;
use applyflow::retry::RetryPolicy;
use applyflow::state::SharedState;

pub const TEST_API_KEY: &str = "test-api-key";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub state: SharedState,
}

#[allow(dead_code)]
impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Enqueue a workflow, return (body, status).
    pub async fn enqueue(&self, user_id: Uuid, cv_id: Uuid, jobs: Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/applications/queue"))
            .bearer_auth(TEST_API_KEY)
            .json(&json!({ "user_id": user_id, "cv_id": cv_id, "jobs": jobs }))
            .send()
            .await
            .expect("enqueue request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get_auth(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(TEST_API_KEY)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_auth(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(TEST_API_KEY)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn delete_auth(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(TEST_API_KEY)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// A single job snapshot for enqueue bodies.
#[allow(dead_code)]
pub fn job(external_id: &str) -> Value {
    json!({
        "job_external_id": external_id,
        "title": "Backend Engineer",
        "company": "Acme",
        "description": "Build reliable services in a small team.",
    })
}

fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to a random port
        api_key: TEST_API_KEY.to_string(),
        core: CoreConfig {
            // Connection-refused unless a test points this at a stub.
            base_url: "http://127.0.0.1:9".to_string(),
            shared_secret: "core-secret".to_string(),
        },
        ai: AiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "ai-key".to_string(),
        },
        worker: WorkerConfig {
            count: 1,
            poll_interval_secs: 1,
            batch_size: 20,
            max_attempts: 5,
            stale_after_minutes: 15,
        },
        limits: RateLimitConfig::default(),
        breaker: BreakerConfig::default(),
        retry: RetryPolicy {
            max_retries: 1,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            exponential_backoff: true,
            retryable_statuses: vec![408, 429, 500, 502, 503, 504],
        },
        log_level: "warn".to_string(),
    }
}

/// Spawn a test app with a fresh temporary database. Returns None (and
/// skips the test) when DATABASE_URL is not set.
#[allow(dead_code)]
pub async fn spawn_app() -> Option<TestApp> {
    spawn_app_with(|_| {}).await
}

/// Same as `spawn_app` but lets the test tweak the config first.
pub async fn spawn_app_with<F: FnOnce(&mut Config)>(tweak: F) -> Option<TestApp> {
    let _ = dotenvy::dotenv();

    let Ok(base_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping integration test");
        return None;
    };

    // Create a unique test database
    let db_name = format!(
        "applyflow_test_{}",
        Uuid::now_v7().to_string().replace('-', "")
    );

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let mut config = test_config(&test_url);
    tweak(&mut config);

    let (app, state) = applyflow::build_app(pool.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    Some(TestApp {
        addr,
        pool,
        client,
        db_name,
        state,
    })
}

/// Drop the test database after tests complete.
#[allow(dead_code)]
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}

// ----- stub downstream services -----

type StubCoreState = (Arc<AtomicUsize>, usize, u16);

/// A stub Core service: the first `fail_times` requests answer with
/// `fail_status`, everything after succeeds. `hits` counts every request.
#[allow(dead_code)]
pub struct StubCore {
    pub url: String,
    pub hits: Arc<AtomicUsize>,
}

#[allow(dead_code)]
pub async fn spawn_stub_core(fail_times: usize, fail_status: u16) -> StubCore {
    let hits = Arc::new(AtomicUsize::new(0));
    let state: StubCoreState = (hits.clone(), fail_times, fail_status);

    let app = Router::new()
        .route("/applications/submit", post(stub_submit))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub core");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub core failed");
    });

    StubCore {
        url: format!("http://{addr}"),
        hits,
    }
}

async fn stub_submit(State((hits, fail_times, fail_status)): State<StubCoreState>) -> impl IntoResponse {
    let n = hits.fetch_add(1, Ordering::SeqCst);
    if n < fail_times {
        (
            AxumStatusCode::from_u16(fail_status).unwrap(),
            Json(json!({ "error": "stub failure" })),
        )
    } else {
        (
            AxumStatusCode::OK,
            Json(json!({ "resumeId": "resume-1", "negotiationId": "negotiation-1" })),
        )
    }
}

/// A stub AI customizer that always succeeds.
#[allow(dead_code)]
pub async fn spawn_stub_ai() -> String {
    let app = Router::new()
        .route(
            "/v1/customize",
            post(|| async { Json(json!({ "customized_cv": { "summary": "tailored" } })) }),
        )
        .route(
            "/v1/cover-letter",
            post(|| async { Json(json!({ "cover_letter": "Dear hiring team," })) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub ai");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub ai failed");
    });

    format!("http://{addr}")
}

// ----- direct table helpers -----

#[allow(dead_code)]
pub async fn insert_cv(pool: &PgPool, user_id: Uuid, parsed: Option<Value>) -> Uuid {
    sqlx::query_scalar("INSERT INTO cvs (user_id, parsed_data) VALUES ($1, $2) RETURNING id")
        .bind(user_id)
        .bind(parsed)
        .fetch_one(pool)
        .await
        .expect("insert cv")
}

/// Seed application rows for rate-limiter windows.
#[allow(dead_code)]
pub async fn insert_applications(pool: &PgPool, user_id: Uuid, count: i64) {
    for i in 0..count {
        sqlx::query(
            "INSERT INTO applications (user_id, job_external_id, status, submitted_at)
             VALUES ($1, $2, 'submitted', now())",
        )
        .bind(user_id)
        .bind(format!("seed-{i}"))
        .execute(pool)
        .await
        .expect("insert application");
    }
}

#[allow(dead_code)]
pub async fn fetch_items(pool: &PgPool, workflow_id: Uuid) -> Vec<QueueItem> {
    sqlx::query_as("SELECT * FROM application_queue WHERE workflow_id = $1 ORDER BY created_at")
        .bind(workflow_id)
        .fetch_all(pool)
        .await
        .expect("fetch items")
}

/// Make every item of a workflow due now, regardless of backoff.
#[allow(dead_code)]
pub async fn make_due(pool: &PgPool, workflow_id: Uuid) {
    sqlx::query(
        "UPDATE application_queue SET next_run_at = now()
         WHERE workflow_id = $1 AND status IN ('pending', 'rate_limited')",
    )
    .bind(workflow_id)
    .execute(pool)
    .await
    .expect("make due");
}
