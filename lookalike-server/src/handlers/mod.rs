//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod compare;
pub mod health;
pub mod upload;

pub use crate::state::AppState;
pub use compare::{compare_handler, CompareResponse, MatchHit};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use upload::{upload_handler, UploadResponse};
