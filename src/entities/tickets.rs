use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ticket_status")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "in_raffle")]
    InRaffle,
    #[sea_orm(string_value = "winner")]
    Winner,
    #[sea_orm(string_value = "lost")]
    Lost,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Available => write!(f, "available"),
            TicketStatus::Pending => write!(f, "pending"),
            TicketStatus::Active => write!(f, "active"),
            TicketStatus::InRaffle => write!(f, "in_raffle"),
            TicketStatus::Winner => write!(f, "winner"),
            TicketStatus::Lost => write!(f, "lost"),
            TicketStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// 票据实体
/// - uuid/code 各自唯一；hash 为绑定 uuid|owner|generated_at 的 HMAC 签名
/// - raffle_id 为空表示尚未投入任何抽奖（通用票）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub code: String,
    pub hash: String,
    pub generated_at: DateTime<Utc>,
    pub owner_id: i64,
    pub raffle_id: Option<i64>,
    pub status: TicketStatus,
    pub is_used: bool,
    pub is_winner: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// A ticket may enter a raffle only from one of the pre-admission states.
    pub fn can_enter_raffle(&self) -> bool {
        matches!(
            self.status,
            TicketStatus::Available | TicketStatus::Pending | TicketStatus::Active
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
