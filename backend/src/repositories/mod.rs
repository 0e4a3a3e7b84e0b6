//! Database repositories, one per persisted entity.

pub mod user_repository;
