pub mod domain;
pub mod ports;
pub mod stores;

pub use domain::{
    AuthTokens, CharacterStats, Confirmation, EncodedImage, ImageSource, LoginData, Nutrition,
    Prediction, Registration, StatsSnapshot, UserProfile,
};
pub use ports::{BackendApi, GatewayError, GatewayResult, ImageNormalizer, PortError, PortResult,
    TokenStore};
pub use stores::{DetectionPhase, DetectionWorkflow, SessionStatus, SessionStore, StatsStore,
    WorkflowError};
