//! Real-estate listing backend: user accounts and credential management.
//!
//! The [`auth::credentials::CredentialManager`] owns the password and reset
//! token lifecycle of a user; [`auth::service::AuthService`] calls it at the
//! defined hook points and persists the results through
//! [`repositories::user_repository::UserRepository`].

pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod repositories;
pub mod services;
pub mod telemetry;
pub mod utils;
