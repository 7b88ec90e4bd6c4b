//! services/client/tests/workflow_tests.rs
//!
//! End-to-end exercises of the tasks + stores against a scripted mock
//! gateway, checking the behavior the UI relies on: one network call per
//! command, cache hits produce no traffic, stale data survives failures.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use client_lib::config::Config;
use client_lib::state::AppState;
use client_lib::tasks::{detection, session, stats};
use nutripet_core::domain::{
    AuthTokens, CharacterStats, Confirmation, EncodedImage, HealthStatus, ImageSource, LoginData,
    Nutrition, NutritionAverages, NutritionTotals, Prediction, Registration, StatsPeriod,
    StatsSnapshot, UserProfile,
};
use nutripet_core::ports::{
    BackendApi, GatewayError, GatewayResult, ImageNormalizer, PortResult, TokenStore,
};
use nutripet_core::stores::{DetectionPhase, SessionStatus, WorkflowError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

//=========================================================================================
// Test Doubles
//=========================================================================================

/// A scripted `BackendApi`: every method pops (or clones) a canned response
/// and counts how often it was hit.
#[derive(Default)]
struct MockApi {
    login_result: Mutex<Option<GatewayResult<LoginData>>>,
    profile_result: Mutex<Option<GatewayResult<UserProfile>>>,
    detect_results: Mutex<VecDeque<GatewayResult<Prediction>>>,
    confirm_results: Mutex<VecDeque<GatewayResult<Confirmation>>>,
    stats_results: Mutex<VecDeque<GatewayResult<StatsSnapshot>>>,
    detect_calls: AtomicUsize,
    stats_calls: AtomicUsize,
}

fn unscripted<T>() -> GatewayResult<T> {
    Err(GatewayError::Network("unscripted call".to_string()))
}

#[async_trait]
impl BackendApi for MockApi {
    async fn login(&self, _username: &str, _password: &str) -> GatewayResult<LoginData> {
        self.login_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(unscripted)
    }

    async fn register(&self, _registration: &Registration) -> GatewayResult<UserProfile> {
        unscripted()
    }

    async fn fetch_profile(&self) -> GatewayResult<UserProfile> {
        self.profile_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(unscripted)
    }

    async fn detect_food(&self, _image: &EncodedImage) -> GatewayResult<Prediction> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        self.detect_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(unscripted)
    }

    async fn confirm_food(&self, _food_history_id: i64) -> GatewayResult<Confirmation> {
        self.confirm_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(unscripted)
    }

    async fn fetch_stats(&self) -> GatewayResult<StatsSnapshot> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        self.stats_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(unscripted)
    }
}

/// An in-memory `TokenStore`.
#[derive(Default)]
struct MemoryTokenStore {
    tokens: Mutex<Option<AuthTokens>>,
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn save(&self, tokens: &AuthTokens) -> PortResult<()> {
        *self.tokens.lock().unwrap() = Some(tokens.clone());
        Ok(())
    }

    async fn load(&self) -> PortResult<Option<AuthTokens>> {
        Ok(self.tokens.lock().unwrap().clone())
    }

    async fn clear(&self) -> PortResult<()> {
        *self.tokens.lock().unwrap() = None;
        Ok(())
    }
}

/// A normalizer that hands back a fixed two-byte "JPEG".
struct FixedNormalizer;

#[async_trait]
impl ImageNormalizer for FixedNormalizer {
    async fn normalize(&self, _source: &ImageSource) -> PortResult<EncodedImage> {
        Ok(EncodedImage {
            bytes: vec![0xFF, 0xD8],
            mime_type: "image/jpeg".to_string(),
            file_name: "food.jpg".to_string(),
        })
    }
}

//=========================================================================================
// Fixtures
//=========================================================================================

fn make_app(api: Arc<MockApi>, tokens: Arc<MemoryTokenStore>) -> AppState {
    let config = Arc::new(Config {
        api_base_url: "http://localhost:8000".to_string(),
        token_path: std::path::PathBuf::from("/tmp/nutripet-test-tokens.json"),
        log_level: tracing::Level::INFO,
        request_timeout_secs: 30,
    });
    AppState::new(config, api, tokens, Arc::new(FixedNormalizer))
}

fn login_data(access: &str) -> LoginData {
    LoginData {
        profile: UserProfile {
            id: 1,
            username: "alice".to_string(),
            full_name: Some("Alice A".to_string()),
            email: Some("alice@example.com".to_string()),
        },
        tokens: AuthTokens {
            access_token: access.to_string(),
            refresh_token: "R1".to_string(),
        },
    }
}

fn character(level: u32) -> CharacterStats {
    CharacterStats {
        level,
        status_name: "healthy".to_string(),
        health_point: 90.0,
        xp_point: 50.0,
        xp_to_next_level: 200.0,
    }
}

fn prediction(id: i64) -> Prediction {
    Prediction {
        food_history_id: id,
        predicted_food: "soto ayam".to_string(),
        nutrition: Nutrition {
            calories: 312.0,
            protein: 24.0,
            carbohydrate: 19.0,
            fat: 14.0,
        },
        received_at: Utc::now(),
    }
}

fn snapshot(score: f64) -> StatsSnapshot {
    StatsSnapshot {
        period: StatsPeriod {
            days: 7,
            start_date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 11, 7).unwrap(),
        },
        summary: NutritionTotals {
            total_entries: 10,
            total_calories: 14000.0,
            total_carbohydrate: 1700.0,
            total_fat: 500.0,
            total_fiber: 150.0,
            total_protein: 600.0,
            total_sodium: 8800.0,
            total_sugar: 390.0,
        },
        averages: NutritionAverages {
            calories: 2000.0,
            carbohydrate: 243.0,
            fat: 71.0,
            fiber: 21.4,
            protein: 85.7,
            sodium: 1257.0,
            sugar: 55.7,
        },
        health: HealthStatus {
            weekly_score: score,
            status: "healthy".to_string(),
        },
        nutrition_recommendations: vec![],
        health_recommendations: vec![],
        character: character(2),
        most_consumed_foods: vec![],
        daily_breakdown: vec![],
    }
}

//=========================================================================================
// Session
//=========================================================================================

#[tokio::test]
async fn login_authenticates_and_persists_tokens() {
    let api = Arc::new(MockApi::default());
    *api.login_result.lock().unwrap() = Some(Ok(login_data("T1")));
    let tokens = Arc::new(MemoryTokenStore::default());
    let app = make_app(api, tokens.clone());

    let profile = session::login(&app, "alice", "secret").await.unwrap();
    assert_eq!(profile.username, "alice");

    let store = app.session.lock().await;
    assert_eq!(store.status(), SessionStatus::Authenticated);
    assert_eq!(store.tokens().unwrap().access_token, "T1");

    let persisted = tokens.load().await.unwrap().unwrap();
    assert_eq!(persisted.access_token, "T1");
}

#[tokio::test]
async fn failed_login_reports_the_server_message() {
    let api = Arc::new(MockApi::default());
    *api.login_result.lock().unwrap() = Some(Err(GatewayError::Server {
        status: 401,
        message: "Login gagal".to_string(),
    }));
    let app = make_app(api, Arc::new(MemoryTokenStore::default()));

    assert!(session::login(&app, "alice", "wrong").await.is_err());

    let store = app.session.lock().await;
    assert_eq!(store.status(), SessionStatus::Error);
    assert!(store.last_error().unwrap().contains("Login gagal"));
    assert!(store.tokens().is_none());
}

#[tokio::test]
async fn restore_reestablishes_the_session_and_refreshes_the_profile() {
    let api = Arc::new(MockApi::default());
    *api.profile_result.lock().unwrap() = Some(Ok(UserProfile {
        id: 1,
        username: "alice".to_string(),
        full_name: None,
        email: None,
    }));
    let tokens = Arc::new(MemoryTokenStore::default());
    tokens
        .save(&AuthTokens {
            access_token: "T1".to_string(),
            refresh_token: "R1".to_string(),
        })
        .await
        .unwrap();
    let app = make_app(api, tokens);

    assert!(session::restore(&app).await.unwrap());

    let store = app.session.lock().await;
    assert!(store.is_authenticated());
    assert_eq!(store.user().unwrap().username, "alice");
}

#[tokio::test]
async fn restore_with_rejected_tokens_clears_them() {
    let api = Arc::new(MockApi::default());
    *api.profile_result.lock().unwrap() = Some(Err(GatewayError::Unauthorized));
    let tokens = Arc::new(MemoryTokenStore::default());
    tokens
        .save(&AuthTokens {
            access_token: "stale".to_string(),
            refresh_token: "stale".to_string(),
        })
        .await
        .unwrap();
    let app = make_app(api, tokens.clone());

    assert!(!session::restore(&app).await.unwrap());

    assert_eq!(app.session.lock().await.status(), SessionStatus::Idle);
    assert!(tokens.load().await.unwrap().is_none());
}

//=========================================================================================
// Detection Workflow
//=========================================================================================

#[tokio::test]
async fn detect_then_confirm_feeds_the_character() {
    let api = Arc::new(MockApi::default());
    api.detect_results
        .lock()
        .unwrap()
        .push_back(Ok(prediction(42)));
    api.confirm_results
        .lock()
        .unwrap()
        .push_back(Ok(Confirmation {
            food_history_id: 42,
            character: character(3),
        }));
    let app = make_app(api.clone(), Arc::new(MemoryTokenStore::default()));

    detection::select_image(&app, "file://meal.jpg", "image/jpeg").await;
    let predicted = detection::upload(&app).await.unwrap().unwrap();
    assert_eq!(predicted.predicted_food, "soto ayam");
    assert_eq!(api.detect_calls.load(Ordering::SeqCst), 1);

    let confirmed = detection::confirm(&app).await.unwrap().unwrap();
    assert_eq!(confirmed.character.level, 3);

    let workflow = app.detection.lock().await;
    assert_eq!(workflow.phase(), DetectionPhase::Confirmed);
}

#[tokio::test]
async fn rejected_upload_fails_the_workflow_with_the_server_message() {
    let api = Arc::new(MockApi::default());
    api.detect_results
        .lock()
        .unwrap()
        .push_back(Err(GatewayError::Server {
            status: 422,
            message: "too blurry".to_string(),
        }));
    let app = make_app(api, Arc::new(MemoryTokenStore::default()));

    detection::select_image(&app, "file://meal.jpg", "image/jpeg").await;
    assert!(detection::upload(&app).await.is_err());

    let workflow = app.detection.lock().await;
    assert_eq!(workflow.phase(), DetectionPhase::Failed);
    assert_eq!(
        workflow.error(),
        Some(&WorkflowError::ServerRejected("too blurry".to_string()))
    );
}

#[tokio::test]
async fn upload_without_a_selection_never_reaches_the_network() {
    let api = Arc::new(MockApi::default());
    let app = make_app(api.clone(), Arc::new(MemoryTokenStore::default()));

    let err = detection::upload(&app).await.unwrap_err();
    assert!(err.to_string().contains("no image selected"));
    assert_eq!(api.detect_calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.detection.lock().await.phase(), DetectionPhase::Empty);
}

#[tokio::test]
async fn reset_abandons_the_workflow() {
    let api = Arc::new(MockApi::default());
    let app = make_app(api, Arc::new(MemoryTokenStore::default()));

    detection::select_image(&app, "file://meal.jpg", "image/jpeg").await;
    detection::reset(&app).await;

    assert_eq!(app.detection.lock().await.phase(), DetectionPhase::Empty);
    assert!(app.detection.lock().await.selected_image().is_none());
}

#[tokio::test]
async fn confirm_out_of_order_never_reaches_the_network() {
    let api = Arc::new(MockApi::default());
    let app = make_app(api, Arc::new(MemoryTokenStore::default()));

    detection::select_image(&app, "file://meal.jpg", "image/jpeg").await;
    let err = detection::confirm(&app).await.unwrap_err();
    assert!(err.to_string().contains("no prediction"));
    assert_eq!(
        app.detection.lock().await.phase(),
        DetectionPhase::ImageSelected
    );
}

//=========================================================================================
// Stats
//=========================================================================================

#[tokio::test]
async fn cached_stats_produce_no_second_network_call() {
    let api = Arc::new(MockApi::default());
    api.stats_results.lock().unwrap().push_back(Ok(snapshot(78.0)));
    let app = make_app(api.clone(), Arc::new(MemoryTokenStore::default()));

    let first = stats::fetch(&app).await.unwrap().unwrap();
    let second = stats::fetch(&app).await.unwrap().unwrap();

    assert_eq!(api.stats_calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.health.weekly_score, second.health.weekly_score);
}

#[tokio::test]
async fn failed_refresh_keeps_the_stale_snapshot() {
    let api = Arc::new(MockApi::default());
    {
        let mut scripted = api.stats_results.lock().unwrap();
        scripted.push_back(Ok(snapshot(78.0)));
        scripted.push_back(Err(GatewayError::Network("offline".to_string())));
    }
    let app = make_app(api, Arc::new(MemoryTokenStore::default()));

    stats::fetch(&app).await.unwrap();
    stats::invalidate(&app).await;
    assert!(stats::fetch(&app).await.is_err());

    let store = app.stats.lock().await;
    assert_eq!(store.snapshot().unwrap().health.weekly_score, 78.0);
    assert!(store.error().unwrap().contains("offline"));
}
