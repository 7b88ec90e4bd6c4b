//! services/client/src/adapters/tokens.rs
//!
//! This module contains the durable token storage adapter.
//! It implements the `TokenStore` port from the `core` crate, keeping the
//! access/refresh pair together in one JSON file.

use async_trait::async_trait;
use nutripet_core::domain::AuthTokens;
use nutripet_core::ports::{PortError, PortResult, TokenStore};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::warn;

/// An adapter that implements the `TokenStore` port on top of a JSON file.
#[derive(Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a new `FileTokenStore` persisting to the given path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn map_io(err: std::io::Error) -> PortError {
        if err.kind() == ErrorKind::PermissionDenied {
            PortError::PermissionDenied(err.to_string())
        } else {
            PortError::Unexpected(err.to_string())
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn save(&self, tokens: &AuthTokens) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(Self::map_io)?;
        }
        let body = serde_json::to_vec_pretty(tokens)
            .map_err(|err| PortError::Unexpected(err.to_string()))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(Self::map_io)
    }

    async fn load(&self) -> PortResult<Option<AuthTokens>> {
        let body = match tokio::fs::read(&self.path).await {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Self::map_io(err)),
        };
        match serde_json::from_slice(&body) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(err) => {
                // A corrupt token file behaves like being logged out.
                warn!("Ignoring unreadable token file {:?}: {}", self.path, err);
                Ok(None)
            }
        }
    }

    async fn clear(&self) -> PortResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::map_io(err)),
        }
    }
}
