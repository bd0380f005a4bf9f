pub mod auth;
pub mod cors;

pub use auth::{AuthContext, AuthMiddleware};
pub use cors::create_cors;
