use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "raffle_status")]
#[serde(rename_all = "snake_case")]
pub enum RaffleStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "ready_to_draw")]
    ReadyToDraw,
    #[sea_orm(string_value = "finished")]
    Finished,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl std::fmt::Display for RaffleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RaffleStatus::Draft => write!(f, "draft"),
            RaffleStatus::Published => write!(f, "published"),
            RaffleStatus::Active => write!(f, "active"),
            RaffleStatus::ReadyToDraw => write!(f, "ready_to_draw"),
            RaffleStatus::Finished => write!(f, "finished"),
            RaffleStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// 抽奖活动实体
/// 不变式: drawn_at 与 winner_participation_id 要么都为空要么都已设置，
/// 且一旦设置状态必须是 finished，不再允许任何参与写入。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "raffles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub owner_id: i64,
    pub status: RaffleStatus,
    pub max_participants: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub draw_at: Option<DateTime<Utc>>,
    pub drawn_at: Option<DateTime<Utc>>,
    pub winner_participation_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_drawn(&self) -> bool {
        self.drawn_at.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RaffleStatus::Finished | RaffleStatus::Cancelled)
    }

    /// Expired means ends_at has passed while no winner was recorded.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_drawn() && self.ends_at.is_some_and(|e| e <= now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
