use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{TicketStatus, ticket_entity as tickets};

use super::PaginatedResponse;

/// 发放票据请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct IssueTicketsRequest {
    /// 本批次发放数量 (1..=max_batch)
    pub count: u32,
}

/// 票据对外表示（hash 不下发，仅在存储与校验时使用）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TicketResponse {
    pub uuid: Uuid,
    pub code: String,
    pub status: TicketStatus,
    pub generated_at: DateTime<Utc>,
    pub raffle_id: Option<i64>,
    pub is_used: bool,
    pub is_winner: bool,
}

impl From<tickets::Model> for TicketResponse {
    fn from(m: tickets::Model) -> Self {
        TicketResponse {
            uuid: m.uuid,
            code: m.code,
            status: m.status,
            generated_at: m.generated_at,
            raffle_id: m.raffle_id,
            is_used: m.is_used,
            is_winner: m.is_winner,
        }
    }
}

/// 单张票发放失败的原因（批量发放允许部分成功）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TicketIssueFailure {
    pub reason: String,
}

/// 批量发放结果，逐票上报
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssueTicketsResponse {
    pub issued: Vec<TicketResponse>,
    pub failed: Vec<TicketIssueFailure>,
}

/// 票据列表查询参数
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TicketListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub type TicketPageResponse = PaginatedResponse<TicketResponse>;
