use crate::handlers::get_auth_context;
use crate::models::*;
use crate::services::TicketService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/tickets/issue",
    tag = "tickets",
    request_body = IssueTicketsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "发放结果（允许部分成功，逐票上报）", body = IssueTicketsResponse),
        (status = 400, description = "数量越界"),
        (status = 401, description = "未授权")
    )
)]
/// 为调用者批量发放票据（1..=max_batch），标识符碰撞自动重试
pub async fn issue_tickets(
    service: web::Data<TicketService>,
    req: HttpRequest,
    body: web::Json<IssueTicketsRequest>,
) -> Result<HttpResponse> {
    let auth = match get_auth_context(&req) {
        Ok(a) => a,
        Err(e) => return Ok(e.error_response()),
    };
    match service.issue_many(auth.user_id, body.count).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tickets",
    tag = "tickets",
    params(
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "我的票据列表", body = PaginatedResponse<TicketResponse>),
        (status = 401, description = "未授权")
    )
)]
/// 分页获取调用者的票据（不含已删除）
pub async fn list_tickets(
    service: web::Data<TicketService>,
    req: HttpRequest,
    query: web::Query<TicketListQuery>,
) -> Result<HttpResponse> {
    let auth = match get_auth_context(&req) {
        Ok(a) => a,
        Err(e) => return Ok(e.error_response()),
    };
    match service.list_tickets(auth.user_id, &query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/tickets/{uuid}",
    tag = "tickets",
    params(
        ("uuid" = Uuid, Path, description = "票据UUID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除成功"),
        (status = 404, description = "票据不存在或不属于调用者"),
        (status = 409, description = "票据已使用或已投入抽奖")
    )
)]
/// 删除一张尚未投入抽奖且未使用的票
pub async fn delete_ticket(
    service: web::Data<TicketService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let auth = match get_auth_context(&req) {
        Ok(a) => a,
        Err(e) => return Ok(e.error_response()),
    };
    match service.delete_ticket(auth.user_id, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn ticket_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tickets")
            .route("/issue", web::post().to(issue_tickets))
            .route("/{uuid}", web::delete().to(delete_ticket))
            .route("", web::get().to(list_tickets)),
    );
}
