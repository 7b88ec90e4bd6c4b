//! crates/nutripet_core/src/stores/session.rs
//!
//! Holds the authentication state: tokens, the logged-in profile, and the
//! login/logout/register transitions.

use crate::domain::{AuthTokens, LoginData, UserProfile};
use crate::ports::GatewayError;

/// Where the session currently stands.
///
/// `Idle → Authenticating → {Authenticated | Error}`; `Authenticated → Idle`
/// on logout. From `Error` the only ways out are another authentication
/// attempt or a logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Authenticating,
    Authenticated,
    Error,
}

/// A handle tying an in-flight auth request to the store generation that
/// issued it. A response whose ticket no longer matches is dropped.
#[derive(Debug, Clone, Copy)]
pub struct AuthTicket {
    seq: u64,
}

/// The session store. Tokens are present if and only if the status is
/// `Authenticated`.
#[derive(Debug)]
pub struct SessionStore {
    status: SessionStatus,
    tokens: Option<AuthTokens>,
    user: Option<UserProfile>,
    last_error: Option<String>,
    seq: u64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            tokens: None,
            user: None,
            last_error: None,
            seq: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn tokens(&self) -> Option<&AuthTokens> {
        self.tokens.as_ref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Starts a login attempt. Credential validation (non-empty fields) is the
    /// caller's job; the store only tracks the transition.
    pub fn begin_login(&mut self) -> AuthTicket {
        self.seq += 1;
        self.status = SessionStatus::Authenticating;
        self.last_error = None;
        AuthTicket { seq: self.seq }
    }

    /// Applies the outcome of a login request.
    ///
    /// A failed re-login does not log the user out: when a prior token is
    /// still held, the status settles back to `Authenticated` with
    /// `last_error` set, keeping the token-iff-authenticated invariant.
    pub fn apply_login(&mut self, ticket: AuthTicket, result: Result<LoginData, GatewayError>) {
        if ticket.seq != self.seq {
            return;
        }
        match result {
            Ok(data) => {
                self.tokens = Some(data.tokens);
                self.user = Some(data.profile);
                self.last_error = None;
                self.status = SessionStatus::Authenticated;
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                self.settle_after_failure();
            }
        }
    }

    /// Starts a registration attempt. Same shape as login, but success does
    /// not establish a session.
    pub fn begin_register(&mut self) -> AuthTicket {
        self.seq += 1;
        self.status = SessionStatus::Authenticating;
        self.last_error = None;
        AuthTicket { seq: self.seq }
    }

    /// Applies the outcome of a registration request. Tokens are untouched
    /// either way; the status settles back to wherever the token state says
    /// it should be.
    pub fn apply_register(&mut self, ticket: AuthTicket, result: Result<UserProfile, GatewayError>) {
        if ticket.seq != self.seq {
            return;
        }
        match result {
            Ok(_profile) => {
                self.last_error = None;
                self.status = if self.tokens.is_some() {
                    SessionStatus::Authenticated
                } else {
                    SessionStatus::Idle
                };
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                self.settle_after_failure();
            }
        }
    }

    /// Re-establishes a session from tokens persisted by a previous run.
    /// The profile is filled in separately once `/users/me` answers.
    pub fn restore(&mut self, tokens: AuthTokens) {
        self.seq += 1;
        self.tokens = Some(tokens);
        self.last_error = None;
        self.status = SessionStatus::Authenticated;
    }

    /// Updates the profile summary (e.g. after a `/users/me` refresh).
    pub fn set_user(&mut self, user: UserProfile) {
        self.user = Some(user);
    }

    /// Clears tokens and user unconditionally and returns to `Idle`.
    /// Idempotent: calling it when already logged out is a no-op success.
    pub fn logout(&mut self) {
        self.seq += 1;
        self.tokens = None;
        self.user = None;
        self.last_error = None;
        self.status = SessionStatus::Idle;
    }

    fn settle_after_failure(&mut self) {
        self.status = if self.tokens.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Error
        };
    }
}
