//! crates/nutripet_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! stores to be independent of specific external implementations like the HTTP
//! transport, durable token storage, or the image codec.

use async_trait::async_trait;
use crate::domain::{
    AuthTokens, Confirmation, EncodedImage, ImageSource, LoginData, Prediction, Registration,
    StatsSnapshot, UserProfile,
};

//=========================================================================================
// Gateway Error and Result Types
//=========================================================================================

/// The normalized failure shape every gateway call resolves to.
///
/// The gateway never panics or throws past its boundary; any transport failure
/// or non-success response becomes one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Transport failure, no usable response was received.
    #[error("network error: {0}")]
    Network(String),
    /// The backend rejected our credentials (401-class response).
    #[error("unauthorized")]
    Unauthorized,
    /// The backend answered with an error status or an `"error"` envelope.
    #[error("server rejected request ({status}): {message}")]
    Server { status: u16, message: String },
    /// The response did not match the expected envelope shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A convenience type alias for `Result<T, GatewayError>`.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// A generic error type for the non-gateway ports (token storage, image
/// normalization).
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    /// A local device capability was denied (camera roll, file access).
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("an unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The single chokepoint through which all backend calls are issued.
///
/// Implementations attach the bearer token (snapshotted at call time) and
/// normalize every outcome into a [`GatewayError`]. They never retry; callers
/// decide retry policy.
#[async_trait]
pub trait BackendApi: Send + Sync {
    // --- Auth ---
    async fn login(&self, username: &str, password: &str) -> GatewayResult<LoginData>;

    /// Registration is distinct from login server-side: it yields a profile
    /// record but no tokens.
    async fn register(&self, registration: &Registration) -> GatewayResult<UserProfile>;

    async fn fetch_profile(&self) -> GatewayResult<UserProfile>;

    // --- Food detection ---
    async fn detect_food(&self, image: &EncodedImage) -> GatewayResult<Prediction>;

    async fn confirm_food(&self, food_history_id: i64) -> GatewayResult<Confirmation>;

    // --- Stats ---
    async fn fetch_stats(&self) -> GatewayResult<StatsSnapshot>;
}

/// Durable storage for the access/refresh token pair.
///
/// The session store writes through this narrow save/load/clear contract; the
/// gateway reads through it when attaching the bearer token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn save(&self, tokens: &AuthTokens) -> PortResult<()>;

    /// Returns `None` when no tokens are persisted.
    async fn load(&self) -> PortResult<Option<AuthTokens>>;

    /// Removes both tokens together; a no-op when nothing is stored.
    async fn clear(&self) -> PortResult<()>;
}

/// Normalizes a picked image into the single canonical encoded form that gets
/// transmitted (bounded maximum width, fixed compressed quality, fixed output
/// encoding).
#[async_trait]
pub trait ImageNormalizer: Send + Sync {
    async fn normalize(&self, source: &ImageSource) -> PortResult<EncodedImage>;
}
