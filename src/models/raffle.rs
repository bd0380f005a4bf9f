use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{RaffleStatus, raffle_entity as raffles};

/// 创建抽奖请求（管理端）
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateRaffleRequest {
    pub title: String,
    /// 容量，必须为正整数
    pub max_participants: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    /// 可手动预设开奖时间；不设则满员时自动排期
    pub draw_at: Option<DateTime<Utc>>,
    /// true 则直接以 published 创建，否则为 draft
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RaffleResponse {
    pub id: i64,
    pub title: String,
    pub status: RaffleStatus,
    pub max_participants: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub draw_at: Option<DateTime<Utc>>,
    pub drawn_at: Option<DateTime<Utc>>,
}

impl From<raffles::Model> for RaffleResponse {
    fn from(m: raffles::Model) -> Self {
        RaffleResponse {
            id: m.id,
            title: m.title,
            status: m.status,
            max_participants: m.max_participants,
            starts_at: m.starts_at,
            ends_at: m.ends_at,
            draw_at: m.draw_at,
            drawn_at: m.drawn_at,
        }
    }
}

/// 抽奖进度
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RaffleProgressResponse {
    pub status: RaffleStatus,
    pub participant_count: i64,
    pub capacity: i32,
    pub draw_at: Option<DateTime<Utc>>,
}

/// 执行开奖请求
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ExecuteDrawRequest {
    /// 管理员强制开奖：跳过 draw_at 等待，允许单人参与时开奖
    #[serde(default)]
    pub force: bool,
}

/// 开奖结果（重复调用返回已记录的中奖者）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawResponse {
    pub winner_participation_id: i64,
    pub winner_ticket_uuid: Uuid,
    pub winner_user_id: i64,
    pub executed_at: DateTime<Utc>,
}
