//! Collection of general utility functions.
//!
//! Session token handling and request validation helpers shared by the
//! services.

pub mod jwt;
pub mod validation;
