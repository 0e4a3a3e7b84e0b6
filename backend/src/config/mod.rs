//! Central module for application-wide configuration settings.
//!
//! This module handles loading configuration parameters such as the database
//! URL, session token settings and the credential tunables (password reset
//! window and password hash cost).

use crate::auth::credentials::CredentialConfig;
use anyhow::{Context, Result, bail};
use std::env;
use std::str::FromStr;

/// Upper bound for `JWT_EXPIRES_IN_SECONDS` (30 days).
pub const MAX_JWT_EXPIRES_IN_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Upper bound for `PASSWORD_RESET_EXPIRES_IN_SECONDS` (7 days).
pub const MAX_PASSWORD_RESET_EXPIRES_IN_SECONDS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expires_in_seconds: u64,
    pub password_reset_expires_in_seconds: u64,
    pub password_hash_cost: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5u32)?;
        let acquire_timeout_seconds = parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECONDS", 3u64)?;

        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET not set")?;
        let jwt_expires_in_seconds = parse_seconds(
            &lookup,
            "JWT_EXPIRES_IN_SECONDS",
            86400,
            MAX_JWT_EXPIRES_IN_SECONDS,
        )?;

        let password_reset_expires_in_seconds = parse_seconds(
            &lookup,
            "PASSWORD_RESET_EXPIRES_IN_SECONDS",
            600,
            MAX_PASSWORD_RESET_EXPIRES_IN_SECONDS,
        )?;

        let password_hash_cost = parse_or(&lookup, "PASSWORD_HASH_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&password_hash_cost) {
            bail!("PASSWORD_HASH_COST must be between 4 and 31");
        }

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            jwt_secret,
            jwt_expires_in_seconds,
            password_reset_expires_in_seconds,
            password_hash_cost,
        })
    }

    /// Credential settings handed to the credential manager.
    pub fn credentials(&self) -> CredentialConfig {
        CredentialConfig {
            reset_window: chrono::Duration::seconds(self.password_reset_expires_in_seconds as i64),
            hash_cost: self.password_hash_cost,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

/// Parses a duration in seconds that must lie in `1..=max`.
fn parse_seconds<F>(lookup: &F, key: &str, default: u64, max: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let seconds = parse_or(lookup, key, default)?;
    if seconds == 0 {
        bail!("{} must be greater than zero", key);
    }
    if seconds > max {
        bail!("{} must be at most {} seconds", key, max);
    }
    Ok(seconds)
}
