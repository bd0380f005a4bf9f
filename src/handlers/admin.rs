use crate::error::AppError;
use crate::handlers::get_auth_context;
use crate::middlewares::AuthContext;
use crate::models::*;
use crate::services::RaffleService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn require_admin(req: &HttpRequest) -> Result<AuthContext, AppError> {
    let auth = get_auth_context(req)?;
    if !auth.privileged {
        return Err(AppError::PermissionDenied);
    }
    Ok(auth)
}

#[utoipa::path(
    post,
    path = "/admin/raffles",
    tag = "admin",
    request_body = CreateRaffleRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建成功", body = RaffleResponse),
        (status = 400, description = "参数非法"),
        (status = 403, description = "需要管理员权限")
    )
)]
/// 创建抽奖（draft 或直接 published）
pub async fn create_raffle(
    service: web::Data<RaffleService>,
    req: HttpRequest,
    body: web::Json<CreateRaffleRequest>,
) -> Result<HttpResponse> {
    let auth = match require_admin(&req) {
        Ok(a) => a,
        Err(e) => return Ok(e.error_response()),
    };
    match service.create_raffle(auth.user_id, &body).await {
        Ok(raffle) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": raffle }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/raffles/{id}/publish",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "抽奖ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "发布成功（重复发布幂等）", body = RaffleResponse),
        (status = 403, description = "需要管理员权限"),
        (status = 409, description = "状态不允许发布")
    )
)]
/// draft -> published
pub async fn publish_raffle(
    service: web::Data<RaffleService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.publish_raffle(path.into_inner()).await {
        Ok(raffle) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": raffle }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/raffles/{id}/cancel",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "抽奖ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "取消成功（重复取消幂等）", body = RaffleResponse),
        (status = 403, description = "需要管理员权限"),
        (status = 409, description = "已结束的抽奖不可取消")
    )
)]
/// 取消抽奖：终态，之后不再接受任何参与
pub async fn cancel_raffle(
    service: web::Data<RaffleService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.cancel_raffle(path.into_inner()).await {
        Ok(raffle) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": raffle }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/raffles", web::post().to(create_raffle))
            .route("/raffles/{id}/publish", web::post().to(publish_raffle))
            .route("/raffles/{id}/cancel", web::post().to(cancel_raffle)),
    );
}
