use axum::Router;

pub mod purchases;
pub mod system;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new().nest("/purchases", purchases::router())
}
