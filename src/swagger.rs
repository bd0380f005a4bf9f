use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{RaffleStatus, TicketStatus};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::ticket::issue_tickets,
        handlers::ticket::list_tickets,
        handlers::ticket::delete_ticket,
        handlers::raffle::get_progress,
        handlers::raffle::admit_participation,
        handlers::raffle::execute_draw,
        handlers::admin::create_raffle,
        handlers::admin::publish_raffle,
        handlers::admin::cancel_raffle,
    ),
    components(
        schemas(
            TicketStatus,
            RaffleStatus,
            IssueTicketsRequest,
            IssueTicketsResponse,
            TicketResponse,
            TicketIssueFailure,
            TicketListQuery,
            AdmitParticipationRequest,
            AdmissionResponse,
            CreateRaffleRequest,
            RaffleResponse,
            RaffleProgressResponse,
            ExecuteDrawRequest,
            DrawResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "tickets", description = "票据发放与管理"),
        (name = "raffles", description = "抽奖参与 / 进度 / 开奖"),
        (name = "admin", description = "抽奖管理端操作")
    )
)]
struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
