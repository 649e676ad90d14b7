//! Bearer-token authorization for the update trigger.
//!
//! A request is authorized when its `Authorization: Bearer <token>` header
//! names a registered key. Keys are managed with `mirror key add|revoke`.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;
use crate::store::Store;

/// Why a trigger request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No header, or not a bearer credential. Maps to 401.
    Missing,
    /// Well-formed token that is not registered. Maps to 403.
    Invalid,
    /// The key store could not be queried. Maps to 500.
    Unavailable,
}

/// Extract the token from an `Authorization` header value.
pub fn parse_bearer(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Check an `Authorization` header against the registered keys.
pub async fn authorize(
    store: &dyn Store,
    header: Option<&str>,
) -> std::result::Result<(), AuthFailure> {
    let token = parse_bearer(header).ok_or(AuthFailure::Missing)?;
    match store.has_auth_key(token).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthFailure::Invalid),
        Err(e) => {
            tracing::error!(error = %e, "auth key lookup failed");
            Err(AuthFailure::Unavailable)
        }
    }
}

/// `mirror key add <token>`
pub async fn run_key_add(config: &Config, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("key must not be empty");
    }
    let store = SqliteStore::new(db::connect(config).await?);
    store.add_auth_key(token).await?;
    store.pool().close().await;
    println!("Key added.");
    Ok(())
}

/// `mirror key revoke <token>`
pub async fn run_key_revoke(config: &Config, token: &str) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    let removed = store.revoke_auth_key(token.trim()).await?;
    store.pool().close().await;
    if !removed {
        bail!("key not found");
    }
    println!("Key revoked.");
    Ok(())
}
