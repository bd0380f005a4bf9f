pub mod admin;
pub mod raffle;
pub mod ticket;

pub use admin::admin_config;
pub use raffle::raffle_config;
pub use ticket::ticket_config;

use crate::error::AppError;
use crate::middlewares::AuthContext;
use actix_web::{HttpMessage, HttpRequest};

/// 读取鉴权中间件注入的调用方身份。
pub fn get_auth_context(req: &HttpRequest) -> Result<AuthContext, AppError> {
    req.extensions()
        .get::<AuthContext>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Missing authentication context".to_string()))
}
