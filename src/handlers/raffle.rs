use crate::handlers::get_auth_context;
use crate::models::*;
use crate::services::{DrawService, ParticipationService, RaffleService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/raffles/{id}/progress",
    tag = "raffles",
    params(
        ("id" = i64, Path, description = "抽奖ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "抽奖进度", body = RaffleProgressResponse),
        (status = 404, description = "抽奖不存在")
    )
)]
/// 抽奖进度：状态 / 参与数 / 容量 / 开奖时间
pub async fn get_progress(
    service: web::Data<RaffleService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get_progress(path.into_inner()).await {
        Ok(progress) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": progress }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/raffles/{id}/participations",
    tag = "raffles",
    params(
        ("id" = i64, Path, description = "抽奖ID")
    ),
    request_body = AdmitParticipationRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "参与结果（幂等重复提交计入 already_admitted）", body = AdmissionResponse),
        (status = 404, description = "抽奖或票据不存在"),
        (status = 409, description = "容量/配额/票据状态冲突")
    )
)]
/// 将调用者的票整批投入抽奖：
/// 1. 校验抽奖可参与、票据归属与签名
/// 2. 容量与公平性配额整批原子检查
/// 3. 恰好满员时同事务内转 ready_to_draw 并排期开奖
pub async fn admit_participation(
    service: web::Data<ParticipationService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<AdmitParticipationRequest>,
) -> Result<HttpResponse> {
    let auth = match get_auth_context(&req) {
        Ok(a) => a,
        Err(e) => return Ok(e.error_response()),
    };
    match service
        .admit(
            path.into_inner(),
            &body.ticket_uuids,
            auth.user_id,
            auth.privileged,
        )
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/raffles/{id}/draw",
    tag = "raffles",
    params(
        ("id" = i64, Path, description = "抽奖ID")
    ),
    request_body = ExecuteDrawRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "中奖结果（重复调用返回已记录的中奖者）", body = DrawResponse),
        (status = 403, description = "force 需要管理员权限"),
        (status = 404, description = "抽奖不存在"),
        (status = 409, description = "状态不符 / 未到开奖时间 / 参与不足")
    )
)]
/// 执行开奖；force 由管理员用于跳过 draw_at 等待或单人开奖
pub async fn execute_draw(
    service: web::Data<DrawService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: Option<web::Json<ExecuteDrawRequest>>,
) -> Result<HttpResponse> {
    let auth = match get_auth_context(&req) {
        Ok(a) => a,
        Err(e) => return Ok(e.error_response()),
    };
    let force = body.map(|b| b.force).unwrap_or(false);
    match service
        .execute_draw(path.into_inner(), force, auth.privileged)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn raffle_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/raffles")
            .route("/{id}/progress", web::get().to(get_progress))
            .route("/{id}/participations", web::post().to(admit_participation))
            .route("/{id}/draw", web::post().to(execute_draw)),
    );
}
