//! Request middleware.
//!
//! - [`auth::require_api_key`] -- API-key check applied to `/api/v1`.

pub mod auth;
