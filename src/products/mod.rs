mod handlers;
mod repo;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use services::resolve;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
