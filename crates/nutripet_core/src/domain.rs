//! crates/nutripet_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs mirror the backend's JSON payloads (camelCase fields) but are
//! otherwise independent of any transport or UI framework.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The access/refresh token pair issued by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// A user's profile summary as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// The fields a new account registration is made of.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// Everything a successful login yields: who logged in, plus their tokens.
#[derive(Debug, Clone)]
pub struct LoginData {
    pub profile: UserProfile,
    pub tokens: AuthTokens,
}

/// Macro-nutrient breakdown for a single recognized food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbohydrate: f64,
    pub fat: f64,
}

/// The backend's food-recognition result for one uploaded image, not yet
/// applied to the user's character.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub food_history_id: i64,
    pub predicted_food: String,
    pub nutrition: Nutrition,
    /// When the client received this prediction.
    pub received_at: DateTime<Utc>,
}

/// The gamified representation of the user's recent eating habits.
///
/// The server is the authority here; `xp_point < xp_to_next_level` holds
/// except transiently right after a server-side level-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterStats {
    pub level: u32,
    pub status_name: String,
    pub health_point: f64,
    pub xp_point: f64,
    pub xp_to_next_level: f64,
}

/// Coarse character condition parsed out of `status_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterCondition {
    Healthy,
    Unhealthy,
    Other,
}

impl CharacterStats {
    /// Parse the condition from the server-supplied status string.
    pub fn condition(&self) -> CharacterCondition {
        match self.status_name.to_lowercase().as_str() {
            "healthy" => CharacterCondition::Healthy,
            "unhealthy" => CharacterCondition::Unhealthy,
            _ => CharacterCondition::Other,
        }
    }
}

/// The user's acceptance of a prediction, as acknowledged by the backend.
/// Carries the character stats updated by the meal.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub food_history_id: i64,
    pub character: CharacterStats,
}

/// The reporting window a stats snapshot covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPeriod {
    pub days: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Summed intake over the reporting window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionTotals {
    pub total_entries: u32,
    pub total_calories: f64,
    pub total_carbohydrate: f64,
    pub total_fat: f64,
    pub total_fiber: f64,
    pub total_protein: f64,
    pub total_sodium: f64,
    pub total_sugar: f64,
}

/// Per-day averages over the reporting window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionAverages {
    pub calories: f64,
    pub carbohydrate: f64,
    pub fat: f64,
    pub fiber: f64,
    pub protein: f64,
    pub sodium: f64,
    pub sugar: f64,
}

/// The backend's weekly health assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub weekly_score: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MostConsumedFood {
    pub food_name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub count: u32,
    pub calories: f64,
    pub foods: Vec<String>,
}

/// Aggregate nutrition and character statistics for the current user.
///
/// Cached client-side as the last successful fetch; invalidated explicitly,
/// never auto-expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub period: StatsPeriod,
    pub summary: NutritionTotals,
    pub averages: NutritionAverages,
    pub health: HealthStatus,
    #[serde(default)]
    pub nutrition_recommendations: Vec<String>,
    #[serde(default)]
    pub health_recommendations: Vec<String>,
    pub character: CharacterStats,
    #[serde(default)]
    pub most_consumed_foods: Vec<MostConsumedFood>,
    #[serde(default)]
    pub daily_breakdown: Vec<DailyBreakdown>,
}

/// A locally-addressable image the user picked for detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub uri: String,
    pub mime_type: String,
}

/// The single canonical encoded form an image is normalized to before upload.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}
