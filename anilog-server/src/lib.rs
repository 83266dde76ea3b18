//! AniLog REST API: accounts, social graph, lists, watched tracking and
//! AniList-backed search over a libSQL store.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod infra;
pub mod observability;
pub mod server;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use server::{create_server, start_server, AppState};
