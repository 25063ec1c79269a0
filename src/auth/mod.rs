//! Registration, login and token refresh. Every other module only sees [`AuthUser`].

mod dto;
pub mod extractor;
mod handlers;
mod password;
mod repo;
pub mod tokens;

use axum::Router;

use crate::state::AppState;

pub use extractor::AuthUser;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
