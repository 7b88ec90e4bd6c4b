//! services/client/src/tasks/session.rs
//!
//! Drives the session store: login, logout, register, and restoring a
//! persisted session at startup.

use crate::error::ClientError;
use crate::state::AppState;
use nutripet_core::domain::{Registration, UserProfile};
use nutripet_core::ports::GatewayError;
use tracing::{error, info, warn};

/// Logs in with the given credentials.
///
/// Field validation (non-empty username/password) is the caller's
/// responsibility; this task issues exactly one gateway request. Tokens are
/// persisted through the token store on success.
pub async fn login(
    app: &AppState,
    username: &str,
    password: &str,
) -> Result<UserProfile, ClientError> {
    info!("Logging in as '{}'.", username);
    let ticket = app.session.lock().await.begin_login();

    let result = app.api.login(username, password).await;

    if let Ok(data) = &result {
        // Persist first so a crash right after still leaves a restorable session.
        if let Err(err) = app.tokens.save(&data.tokens).await {
            error!("Failed to persist tokens: {}", err);
        }
    }

    let mut session = app.session.lock().await;
    match result {
        Ok(data) => {
            let profile = data.profile.clone();
            session.apply_login(ticket, Ok(data));
            info!("Login succeeded for '{}'.", username);
            Ok(profile)
        }
        Err(err) => {
            error!("Login failed: {}", err);
            session.apply_login(ticket, Err(err.clone()));
            Err(ClientError::Gateway(err))
        }
    }
}

/// Logs out: clears the in-memory session, the durable tokens, and the
/// user-scoped stats cache. Idempotent.
pub async fn logout(app: &AppState) {
    app.session.lock().await.logout();
    // The cached snapshot belongs to the user who just left.
    app.stats.lock().await.clear();

    if let Err(err) = app.tokens.clear().await {
        error!("Failed to clear persisted tokens: {}", err);
    }
    info!("Logged out.");
}

/// Registers a new account. Success yields the created profile but, unlike
/// login, establishes no session and stores no tokens.
pub async fn register(
    app: &AppState,
    registration: Registration,
) -> Result<UserProfile, ClientError> {
    info!("Registering account '{}'.", registration.username);
    let ticket = app.session.lock().await.begin_register();

    let result = app.api.register(&registration).await;

    let mut session = app.session.lock().await;
    match result {
        Ok(profile) => {
            session.apply_register(ticket, Ok(profile.clone()));
            info!("Registration succeeded for '{}'.", profile.username);
            Ok(profile)
        }
        Err(err) => {
            error!("Registration failed: {}", err);
            session.apply_register(ticket, Err(err.clone()));
            Err(ClientError::Gateway(err))
        }
    }
}

/// Restores a session from tokens persisted by a previous run. Returns
/// whether a session is now established.
pub async fn restore(app: &AppState) -> Result<bool, ClientError> {
    let Some(tokens) = app.tokens.load().await? else {
        return Ok(false);
    };
    app.session.lock().await.restore(tokens);

    match app.api.fetch_profile().await {
        Ok(profile) => {
            info!("Restored session for '{}'.", profile.username);
            app.session.lock().await.set_user(profile);
            Ok(true)
        }
        Err(GatewayError::Unauthorized) => {
            // The saved tokens are no longer accepted; drop them.
            info!("Persisted tokens were rejected; clearing the session.");
            logout(app).await;
            Ok(false)
        }
        Err(err) => {
            // Offline is not a reason to log the user out.
            warn!("Could not refresh the profile: {}", err);
            Ok(true)
        }
    }
}

/// Re-fetches `/users/me` and updates the session's profile summary.
pub async fn refresh_profile(app: &AppState) -> Result<UserProfile, ClientError> {
    let profile = app.api.fetch_profile().await?;
    app.session.lock().await.set_user(profile.clone());
    Ok(profile)
}
